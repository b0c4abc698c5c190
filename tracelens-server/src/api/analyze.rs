use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use tracelens_core::analysis::Analysis;
use tracelens_core::provider::Provider;
use tracelens_core::state::AppState;

use super::{ApiResult, bad_request, parse_body, retrieval_error};

/// Request body for `POST /analyze`.
#[derive(Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub stack_trace: String,
    #[serde(default = "default_use_retrieval")]
    pub use_retrieval: bool,
}

fn default_use_retrieval() -> bool {
    true
}

/// `POST /analyze`: explain a stack trace, grounded in similar stored errors.
///
/// Generation problems come back as degraded `analysis` text with status 200;
/// only embedding failures turn into an error response.
pub async fn analyze<P: Provider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    body: Bytes,
) -> ApiResult<Analysis> {
    let request: AnalyzeRequest = parse_body(&body)?;
    if request.stack_trace.trim().is_empty() {
        return Err(bad_request("stack_trace must not be empty".into()));
    }
    let analysis = state
        .analyzer
        .analyze(&request.stack_trace, request.use_retrieval)
        .await
        .map_err(retrieval_error)?;
    log::info!(
        "analyzed stack trace ({} similar errors, context_used={})",
        analysis.similar_errors.len(),
        analysis.context_used
    );
    Ok(Json(analysis))
}
