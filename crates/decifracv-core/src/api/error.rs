use reqwest::StatusCode;
use thiserror::Error;

use super::transport::TransportError;
use crate::auth::{StoreError, TokenError};

/// Failures of the request gateway itself. HTTP error statuses are not
/// gateway failures; they come back as responses.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Session storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid request path: {0}")]
    InvalidPath(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid request options: {0}")]
    InvalidOptions(String),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - session expired or credentials invalid")]
    Unauthorized,

    #[error("Login failed: {0}")]
    AuthenticationFailed(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Invalid credential from server: {0}")]
    InvalidCredential(#[from] TokenError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<TransportError> for ApiError {
    fn from(error: TransportError) -> Self {
        ApiError::Gateway(GatewayError::Transport(error))
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        ApiError::Gateway(GatewayError::Store(error))
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Human-readable message from an error body.
    ///
    /// The backend answers `{"detail": "..."}` for most failures and a list of
    /// `{"msg": "..."}` entries for validation errors.
    pub fn detail(body: &str) -> String {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let detail = parsed.as_ref().and_then(|v| v.get("detail"));

        match detail {
            Some(serde_json::Value::String(message)) => Self::truncate_body(message),
            Some(serde_json::Value::Array(items)) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if messages.is_empty() {
                    Self::truncate_body(body)
                } else {
                    Self::truncate_body(&messages.join("; "))
                }
            }
            _ => Self::truncate_body(body),
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = Self::detail(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(detail),
            code => ApiError::Rejected {
                status: code,
                detail,
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}
