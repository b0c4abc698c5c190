use axum::Json;
use serde::{Deserialize, Serialize};

const SERVICE_NAME: &str = "ml-service";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Response body for `GET /health`.
#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// `GET /health`: liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        service: SERVICE_NAME.into(),
        version: VERSION.into(),
    })
}

/// `GET /`: service banner.
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": VERSION,
    }))
}
