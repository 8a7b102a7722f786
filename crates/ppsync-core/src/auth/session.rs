use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError, PasswordGrant, TokenResponse, VaultApi};
use crate::config::{ResolvedConfig, SessionConfig};
use crate::error::{AuthError, ConfigError};
use crate::Vault;

/// Request a bearer token with the password grant.
///
/// Exactly one call is made. A non-success answer is returned as
/// `AuthError::Rejected` with the body the vault sent.
pub async fn authenticate<A>(api: &A, grant: &PasswordGrant) -> Result<TokenResponse, AuthError>
where
    A: VaultApi + ?Sized,
{
    let reply = match api.request_token(grant).await {
        Ok(reply) => reply,
        Err(ApiError::Status { status, body, .. }) => {
            return Err(AuthError::Rejected { status, body });
        }
        Err(err @ ApiError::InvalidResponse { .. }) => return Err(AuthError::InvalidResponse(err)),
        Err(err) => return Err(AuthError::Network(err)),
    };

    let token = reply.body;
    if token.access_token.trim().is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// An authenticated connection to one vault.
///
/// The certificate policy belongs to the session's own HTTP client, so
/// sessions with different trust settings can coexist in one process.
#[derive(Debug, Clone)]
pub struct Session {
    client: ApiClient,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Resolve `config` against the environment and log in.
    pub async fn establish(config: &SessionConfig) -> crate::Result<Self> {
        let resolved = config.resolve()?;
        Self::establish_resolved(resolved).await
    }

    /// Log in with an already resolved configuration.
    pub async fn establish_resolved(config: ResolvedConfig) -> crate::Result<Self> {
        let ResolvedConfig {
            base_url,
            grant,
            client: options,
        } = config;

        if options.allow_insecure {
            debug!(server = %base_url, "Certificate validation disabled for this session");
        }
        let client = ApiClient::new(base_url, &options).map_err(ConfigError::HttpClient)?;

        let token = authenticate(&client, &grant).await?;
        let session = Self::from_token(client, token);

        info!(
            server = %session.base_url(),
            username = %grant.username,
            "Vault session established"
        );
        Ok(session)
    }

    pub(crate) fn from_token(client: ApiClient, token: TokenResponse) -> Self {
        // A lifetime too large to represent is treated as unreported.
        let expires_at = token
            .expires_in
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));

        Self {
            client: client.with_token(token.access_token),
            expires_at,
        }
    }

    /// The authenticated API client.
    pub fn api(&self) -> &ApiClient {
        &self.client
    }

    /// Reconcilers and read-only views bound to this session.
    ///
    /// Fails once the token has expired; establish a new session instead.
    pub fn vault(&self) -> Result<Vault<'_, ApiClient>, AuthError> {
        match self.expires_at {
            Some(expired_at) if Utc::now() > expired_at => Err(AuthError::Expired { expired_at }),
            _ => Ok(Vault::new(&self.client)),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.client.token()
    }

    pub fn base_url(&self) -> &reqwest::Url {
        self.client.base_url()
    }

    pub fn allow_insecure(&self) -> bool {
        self.client.allow_insecure()
    }

    /// When the vault reported a token lifetime, the moment it runs out.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// A token without a reported lifetime never counts as expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expiry| Utc::now() > expiry)
    }

    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.map(|expiry| expiry - Utc::now())
    }
}
