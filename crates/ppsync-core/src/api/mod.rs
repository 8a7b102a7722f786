//! REST API access for Pleasant Password Server.
//!
//! `VaultApi` is the typed seam every other component talks to. Two
//! implementations exist:
//!
//! - `ApiClient`: reqwest-backed client for a real server
//! - `MemoryVault`: in-process vault used by tests and dry runs
//!
//! A call either yields a `Reply` carrying the 2xx status and the parsed body,
//! or an `ApiError`. Status expectations beyond "was 2xx" are enforced by the
//! callers, not here.

pub mod client;
pub mod error;
pub mod memory;
pub mod wire;

#[cfg(test)]
pub(crate) mod test_server;

use async_trait::async_trait;
use reqwest::StatusCode;

pub use client::{ApiClient, ClientOptions};
pub use error::ApiError;
pub use memory::MemoryVault;
pub use wire::{
    CredentialInput, CredentialRecord, CredentialSearchRecord, FolderInput, FolderRecord,
    FolderSearchRecord, OtpChallenge, PasswordGrant, SearchInput, SearchOutput, TagRecord,
    TokenResponse,
};

/// Successful (2xx) response with its parsed body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub status: StatusCode,
    pub body: T,
}

impl<T> Reply<T> {
    pub fn new(status: StatusCode, body: T) -> Self {
        Self { status, body }
    }

    /// Fail with `UnexpectedStatus` unless the reply carries `expected`.
    pub fn expect_status(self, operation: &'static str, expected: StatusCode) -> Result<T, ApiError> {
        if self.status == expected {
            Ok(self.body)
        } else {
            Err(ApiError::UnexpectedStatus {
                operation,
                status: self.status,
                expected,
            })
        }
    }
}

pub type ApiResult<T> = Result<Reply<T>, ApiError>;

/// Endpoints of the vault consumed by this crate.
///
/// Endpoints documented as returning an id or a secret hand back the raw
/// response text. The server sometimes wraps it in JSON quotes; unquoting is
/// left to the caller.
#[async_trait]
pub trait VaultApi: Send + Sync {
    /// Password grant against the OAuth2 token endpoint.
    async fn request_token(&self, grant: &PasswordGrant) -> ApiResult<TokenResponse>;

    async fn folder_root(&self) -> ApiResult<String>;

    async fn get_folder(&self, id: &str) -> ApiResult<FolderRecord>;

    async fn create_folder(&self, input: &FolderInput) -> ApiResult<String>;

    async fn update_folder(&self, id: &str, input: &FolderInput) -> ApiResult<()>;

    /// Removes the folder and, server side, every descendant folder and credential.
    async fn delete_folder(&self, id: &str) -> ApiResult<()>;

    async fn get_credential(&self, id: &str) -> ApiResult<CredentialRecord>;

    async fn get_credential_password(&self, id: &str) -> ApiResult<String>;

    async fn create_credential(&self, input: &CredentialInput) -> ApiResult<String>;

    async fn update_credential(&self, id: &str, input: &CredentialInput) -> ApiResult<()>;

    async fn delete_credential(&self, id: &str) -> ApiResult<()>;

    async fn search(&self, input: &SearchInput) -> ApiResult<SearchOutput>;
}
