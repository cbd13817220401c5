use salvo::http::StatusCode;
use salvo::prelude::*;
use thiserror::Error;

use crate::core::types::responses::failed_response::FailedResponse;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Upstream request timed out: {0}")]
    UpstreamTimeout(String),

    #[error("Upstream API is unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Failed to read upstream response: {0}")]
    UpstreamBody(String),

    #[error("Failed to read request body: {0}")]
    InvalidRequestBody(String),

    #[error("Gateway is not configured: {0}")]
    Misconfigured(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UpstreamTimeout(_)
            | GatewayError::UpstreamUnreachable(_)
            | GatewayError::UpstreamBody(_) => StatusCode::BAD_GATEWAY,
            GatewayError::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to callers. Upstream details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            GatewayError::UpstreamTimeout(_)
            | GatewayError::UpstreamUnreachable(_)
            | GatewayError::UpstreamBody(_) => "Upstream API is unavailable",
            GatewayError::InvalidRequestBody(_) => "Invalid request body",
            GatewayError::Misconfigured(_) => "Internal server error",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::UpstreamTimeout(err.to_string())
        } else if err.is_body() || err.is_decode() {
            GatewayError::UpstreamBody(err.to_string())
        } else {
            GatewayError::UpstreamUnreachable(err.to_string())
        }
    }
}

#[async_trait]
impl Writer for GatewayError {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        res.status_code(self.status_code());
        res.render(Json(FailedResponse::new(self.public_message())));
    }
}
