use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single vault API call.
///
/// Every variant is fatal to the operation that issued the call; nothing in
/// this crate retries. `Status` keeps the response body verbatim, only the
/// `Display` output is truncated.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{operation} returned {status}: {}", truncate_body(.body))]
    Status {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{operation} returned {status}, expected {expected}")]
    UnexpectedStatus {
        operation: &'static str,
        status: StatusCode,
        expected: StatusCode,
    },

    #[error("Network error during {operation}: {source}")]
    Network {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid response from {operation}: {message}")]
    InvalidResponse {
        operation: &'static str,
        message: String,
    },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut cut = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
}

impl ApiError {
    pub fn from_status(operation: &'static str, status: StatusCode, body: &str) -> Self {
        ApiError::Status {
            operation,
            status,
            body: body.to_string(),
        }
    }

    /// HTTP status carried by the error, if the vault answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } | ApiError::UnexpectedStatus { status, .. } => {
                Some(*status)
            }
            ApiError::Network { source, .. } => source.status(),
            ApiError::InvalidResponse { .. } => None,
        }
    }

    /// Whether the vault reported the addressed object as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::Status { status, .. }
                if *status == StatusCode::NOT_FOUND || *status == StatusCode::GONE
        )
    }

    /// Response body, when the vault sent one.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}
