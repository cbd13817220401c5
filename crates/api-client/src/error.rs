use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

pub const FALLBACK_MESSAGE: &str = "Request failed";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Credential storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<String>,
    message: Option<String>,
}

impl ApiError {
    /// Classifies a non-2xx response from its status and raw body.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let message = extract_message(body);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ApiError::Unauthorized(message.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()))
            }
            StatusCode::NOT_FOUND => {
                ApiError::NotFound(message.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()))
            }
            status if status.is_client_error() && message.is_some() => {
                ApiError::Validation(message.unwrap_or_default())
            }
            status => ApiError::Upstream {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
            },
        }
    }

    /// True when stored credentials should be dropped and the user sent to log in again.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::NotFound(_) => Some(404),
            ApiError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

fn extract_message(body: &[u8]) -> Option<String> {
    let parsed: ApiErrorResponse = serde_json::from_slice(body).ok()?;

    parsed
        .error
        .or(parsed.message)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}
