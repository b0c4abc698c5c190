//! Raw embedding endpoints.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use tracelens_core::embedding;
use tracelens_core::provider::Provider;
use tracelens_core::state::AppState;

use super::{ApiResult, embedding_error, parse_body};

#[derive(Serialize, Deserialize)]
pub struct EmbedRequest {
    pub text: String,
}

#[derive(Serialize, Deserialize)]
pub struct EmbedResponse {
    pub embedding: Vec<f32>,
    pub dimension: usize,
}

#[derive(Serialize, Deserialize)]
pub struct EmbedBatchRequest {
    pub texts: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct EmbedBatchResponse {
    pub embeddings: Vec<Vec<f32>>,
    pub dimension: usize,
    pub count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct SimilarityRequest {
    pub text1: String,
    pub text2: String,
}

#[derive(Serialize, Deserialize)]
pub struct SimilarityResponse {
    pub similarity: f32,
    pub text1: String,
    pub text2: String,
}

/// `POST /embed`: embed one text.
pub async fn embed<P: Provider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    body: Bytes,
) -> ApiResult<EmbedResponse> {
    let request: EmbedRequest = parse_body(&body)?;
    let embedder = state.embedder();
    let embedding = embedding::embed_one(&**embedder, &request.text)
        .map_err(|e| embedding_error(e.to_string()))?;
    Ok(Json(EmbedResponse {
        dimension: embedding.len(),
        embedding,
    }))
}

/// `POST /embed/batch`: embed many texts in one model call.
pub async fn embed_batch<P: Provider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    body: Bytes,
) -> ApiResult<EmbedBatchResponse> {
    let request: EmbedBatchRequest = parse_body(&body)?;
    let embedder = state.embedder();
    let texts: Vec<&str> = request.texts.iter().map(String::as_str).collect();
    let embeddings = if texts.is_empty() {
        Vec::new()
    } else {
        embedding::embed_checked(&**embedder, &texts)
            .map_err(|e| embedding_error(e.to_string()))?
    };
    Ok(Json(EmbedBatchResponse {
        dimension: embedder.dimensions(),
        count: embeddings.len(),
        embeddings,
    }))
}

/// `POST /similarity`: cosine similarity of two texts.
pub async fn similarity<P: Provider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    body: Bytes,
) -> ApiResult<SimilarityResponse> {
    let request: SimilarityRequest = parse_body(&body)?;
    let vectors = embedding::embed_checked(
        &**state.embedder(),
        &[request.text1.as_str(), request.text2.as_str()],
    )
    .map_err(|e| embedding_error(e.to_string()))?;
    Ok(Json(SimilarityResponse {
        similarity: embedding::similarity(&vectors[0], &vectors[1]),
        text1: request.text1,
        text2: request.text2,
    }))
}
