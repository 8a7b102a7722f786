//! API client for communicating with the Pleasant Password Server REST API.
//!
//! This module provides the `ApiClient` struct, the reqwest-backed
//! implementation of `VaultApi`. Each client owns its HTTP connection pool and
//! its TLS trust policy, so clients with different `allow_insecure` settings
//! can live in the same process.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::wire::{
    CredentialInput, CredentialRecord, FolderInput, FolderRecord, PasswordGrant, SearchInput,
    SearchOutput, TokenResponse,
};
use super::{ApiError, ApiResult, Reply, VaultApi};

// ============================================================================
// Constants
// ============================================================================

/// Token endpoint, relative to the server URL.
const TOKEN_PATH: &[&str] = &["OAuth2", "Token"];

/// Prefix of every v6 REST endpoint.
const REST_PREFIX: &[&str] = &["api", "v6", "rest"];

/// Header carrying the one-time password of a multi-factor login.
const OTP_HEADER: &str = "X-Pleasant-OTP";

/// Header naming the one-time password provider.
const OTP_PROVIDER_HEADER: &str = "X-Pleasant-OTP-Provider";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Transport settings for an `ApiClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Skip TLS certificate validation for this client only.
    pub allow_insecure: bool,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            allow_insecure: false,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// API client for Pleasant Password Server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    allow_insecure: bool,
    token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("allow_insecure", &self.allow_insecure)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Create an unauthenticated client for `base_url`.
    pub fn new(base_url: Url, options: &ClientOptions) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.allow_insecure)
            .build()?;

        Ok(Self {
            client,
            base_url,
            allow_insecure: options.allow_insecure,
            token: None,
        })
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            allow_insecure: self.allow_insecure,
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn allow_insecure(&self) -> bool {
        self.allow_insecure
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn endpoint(&self, prefix: &[&str], segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(prefix).extend(segments);
        }
        url
    }

    fn rest(&self, segments: &[&str]) -> Url {
        self.endpoint(REST_PREFIX, segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(method = %method, path = url.path(), "Sending vault request");
        let builder = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send the request and turn non-2xx responses into `ApiError::Status`.
    async fn execute(operation: &'static str, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|source| ApiError::Network { operation, source })?;
        Self::check_response(operation, response).await
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(operation: &'static str, response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(operation, status = %status, "Vault rejected request");
            Err(ApiError::from_status(operation, status, &body))
        }
    }

    async fn read_text(operation: &'static str, response: Response) -> ApiResult<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Network { operation, source })?;
        Ok(Reply::new(status, body))
    }

    async fn read_json<T: DeserializeOwned>(operation: &'static str, response: Response) -> ApiResult<T> {
        let Reply { status, body } = Self::read_text(operation, response).await?;
        let parsed = serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse {
            operation,
            message: e.to_string(),
        })?;
        Ok(Reply::new(status, parsed))
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &'static str, url: Url) -> ApiResult<T> {
        let response = Self::execute(operation, self.request(Method::GET, url)).await?;
        Self::read_json(operation, response).await
    }

    async fn get_text(&self, operation: &'static str, url: Url) -> ApiResult<String> {
        let response = Self::execute(operation, self.request(Method::GET, url)).await?;
        Self::read_text(operation, response).await
    }

    async fn post_text<B: Serialize + Sync>(&self, operation: &'static str, url: Url, body: &B) -> ApiResult<String> {
        let request = self.request(Method::POST, url).json(body);
        let response = Self::execute(operation, request).await?;
        Self::read_text(operation, response).await
    }

    async fn send_without_body(&self, operation: &'static str, request: RequestBuilder) -> ApiResult<()> {
        let response = Self::execute(operation, request).await?;
        Ok(Reply::new(response.status(), ()))
    }
}

#[async_trait]
impl VaultApi for ApiClient {
    async fn request_token(&self, grant: &PasswordGrant) -> ApiResult<TokenResponse> {
        let operation = "Authenticate";
        let url = self.endpoint(TOKEN_PATH, &[]);

        let mut request = self.request(Method::POST, url).form(&[
            ("grant_type", "password"),
            ("username", grant.username.as_str()),
            ("password", grant.password.as_str()),
        ]);
        if let Some(ref otp) = grant.otp {
            request = request.header(OTP_HEADER, otp.code.as_str());
            if let Some(ref provider) = otp.provider {
                request = request.header(OTP_PROVIDER_HEADER, provider.as_str());
            }
        }

        let response = Self::execute(operation, request).await?;
        Self::read_json(operation, response).await
    }

    async fn folder_root(&self) -> ApiResult<String> {
        self.get_text("GetFolderRoot", self.rest(&["folders", "root"])).await
    }

    async fn get_folder(&self, id: &str) -> ApiResult<FolderRecord> {
        self.get_json("GetFolder", self.rest(&["folders", id])).await
    }

    async fn create_folder(&self, input: &FolderInput) -> ApiResult<String> {
        self.post_text("CreateFolder", self.rest(&["folders"]), input).await
    }

    async fn update_folder(&self, id: &str, input: &FolderInput) -> ApiResult<()> {
        let request = self.request(Method::PATCH, self.rest(&["folders", id])).json(input);
        self.send_without_body("UpdateFolder", request).await
    }

    async fn delete_folder(&self, id: &str) -> ApiResult<()> {
        let request = self.request(Method::DELETE, self.rest(&["folders", id]));
        self.send_without_body("DeleteFolder", request).await
    }

    async fn get_credential(&self, id: &str) -> ApiResult<CredentialRecord> {
        self.get_json("GetCredential", self.rest(&["credentials", id])).await
    }

    async fn get_credential_password(&self, id: &str) -> ApiResult<String> {
        self.get_text("GetCredentialSecret", self.rest(&["credentials", id, "password"]))
            .await
    }

    async fn create_credential(&self, input: &CredentialInput) -> ApiResult<String> {
        self.post_text("CreateCredential", self.rest(&["credentials"]), input)
            .await
    }

    async fn update_credential(&self, id: &str, input: &CredentialInput) -> ApiResult<()> {
        let request = self
            .request(Method::PATCH, self.rest(&["credentials", id]))
            .json(input);
        self.send_without_body("UpdateCredential", request).await
    }

    async fn delete_credential(&self, id: &str) -> ApiResult<()> {
        let request = self.request(Method::DELETE, self.rest(&["credentials", id]));
        self.send_without_body("DeleteCredential", request).await
    }

    async fn search(&self, input: &SearchInput) -> ApiResult<SearchOutput> {
        let operation = "Search";
        let request = self.request(Method::POST, self.rest(&["search"])).json(input);
        let response = Self::execute(operation, request).await?;
        Self::read_json(operation, response).await
    }
}
