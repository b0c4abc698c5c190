//! HTTP API layer for tracelens.
//!
//! Every endpoint takes and returns JSON. Request bodies are parsed by hand
//! from `Bytes` so that malformed input gets the same `ApiError` shape as
//! every other failure instead of axum's plain-text rejection.

mod analyze;
mod embed;
mod health;
mod index;

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use tracelens_core::provider::Provider;
use tracelens_core::retrieval::RetrievalError;
use tracelens_core::state::AppState;

use analyze::analyze;
use embed::{embed, embed_batch, similarity};
use health::{health, root};
use index::{clear_store, index, index_batch, search, store_info};

/// Structured API error response.
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

pub(crate) type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

/// Build the application router with CORS for the configured origins.
pub fn router<P: Provider + 'static>(state: Arc<AppState<P>>) -> Router {
    let cors = cors_layer(&state.config.server.allowed_origins);
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/embed", post(embed::<P>))
        .route("/embed/batch", post(embed_batch::<P>))
        .route("/similarity", post(similarity::<P>))
        .route("/index", post(index::<P>))
        .route("/index/batch", post(index_batch::<P>))
        .route("/search", post(search::<P>))
        .route("/store/info", get(store_info::<P>))
        .route("/store/clear", post(clear_store::<P>))
        .route("/analyze", post(analyze::<P>))
        .with_state(state)
        .layer(cors)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}

// ── Error helpers ───────────────────────────────────────────────────────

pub(crate) fn bad_request(message: String) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            code: "bad_request".into(),
            message,
        }),
    )
}

pub(crate) fn embedding_error(message: String) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_GATEWAY,
        Json(ApiError {
            code: "embedding_error".into(),
            message,
        }),
    )
}

pub(crate) fn retrieval_error(e: RetrievalError) -> (StatusCode, Json<ApiError>) {
    match e {
        RetrievalError::Embedding(_) => embedding_error(e.to_string()),
        RetrievalError::Store(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiError {
                code: "invalid_vector".into(),
                message: e.to_string(),
            }),
        ),
    }
}

/// Deserialize a JSON request body, mapping failures to a 400 `ApiError`.
pub(crate) fn parse_body<T: DeserializeOwned>(
    body: &Bytes,
) -> Result<T, (StatusCode, Json<ApiError>)> {
    serde_json::from_slice(body).map_err(|e| bad_request(format!("invalid request body: {e}")))
}
