use salvo::prelude::*;

use crate::core::types::responses::health_response::HealthResponse;

pub fn get_health_router() -> Router {
    Router::with_path("health-check").get(health_check)
}

/// Liveness of the gateway itself. The upstream is not contacted.
#[handler]
async fn health_check() -> HealthResponse {
    HealthResponse {
        status: "ok".to_string(),
    }
}
