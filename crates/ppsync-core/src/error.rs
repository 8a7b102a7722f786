//! Error taxonomy of the reconciliation core.
//!
//! - `ConfigError`: missing or unparseable input, raised before any network call
//! - `AuthError`: the vault refused the credentials, or the token call failed
//! - `ApiError`: any other failed API call (see `crate::api::error`)
//!
//! A resource that disappeared remotely is not an error; see
//! `crate::reconcile::ReadOutcome`.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use thiserror::Error;

use crate::api::error::truncate_body;
pub use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing {field}: set it in the configuration or with the {env} environment variable")]
    Missing {
        field: &'static str,
        env: &'static str,
    },

    #[error("{env} must be a boolean, got {value:?}")]
    InvalidBool { env: &'static str, value: String },

    #[error("Invalid server URL {value:?}: {reason}")]
    InvalidUrl { value: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum AuthError {
    /// The vault answered the token request with a non-success status.
    #[error("Authentication rejected ({status}): {}", truncate_body(.body))]
    Rejected { status: StatusCode, body: String },

    /// The token request did not produce a usable response.
    #[error("Authentication request failed: {0}")]
    Network(#[source] ApiError),

    /// The vault accepted the request but the token response was unreadable.
    #[error("Authentication response could not be read: {0}")]
    InvalidResponse(#[source] ApiError),

    #[error("Authentication response did not contain an access token")]
    MissingToken,

    #[error("Session token expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type alias using the crate Error.
pub type Result<T> = std::result::Result<T, Error>;
