//! Indexing, search and store management endpoints.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use tracelens_core::memory::{Document, SearchResult, StoreInfo};
use tracelens_core::provider::Provider;
use tracelens_core::retrieval::IndexItem;
use tracelens_core::state::AppState;

use super::{ApiResult, parse_body, retrieval_error};

const DEFAULT_K: i64 = 5;

/// Request body for `POST /index`.
#[derive(Serialize, Deserialize)]
pub struct IndexRequest {
    pub text: String,
    #[serde(default)]
    pub metadata: Option<Document>,
}

impl From<IndexRequest> for IndexItem {
    fn from(request: IndexRequest) -> Self {
        IndexItem {
            text: request.text,
            metadata: request.metadata.unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct IndexResponse {
    pub id: usize,
    pub message: String,
}

/// Request body for `POST /index/batch`.
#[derive(Serialize, Deserialize)]
pub struct IndexBatchRequest {
    pub items: Vec<IndexRequest>,
}

#[derive(Serialize, Deserialize)]
pub struct IndexBatchResponse {
    pub ids: Vec<usize>,
    pub count: usize,
}

/// Request body for `POST /search`. A `k` of zero or less returns no results.
#[derive(Serialize, Deserialize)]
pub struct SearchRequest {
    pub text: String,
    #[serde(default = "default_k")]
    pub k: i64,
}

fn default_k() -> i64 {
    DEFAULT_K
}

#[derive(Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct ClearResponse {
    pub message: String,
}

/// `POST /index`: embed and store one document.
pub async fn index<P: Provider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    body: Bytes,
) -> ApiResult<IndexResponse> {
    let request: IndexRequest = parse_body(&body)?;
    let item = IndexItem::from(request);
    let id = state
        .retriever
        .index_text(&item.text, item.metadata)
        .map_err(retrieval_error)?;
    Ok(Json(IndexResponse {
        id,
        message: "Document indexed".into(),
    }))
}

/// `POST /index/batch`: embed and store many documents, all or none.
pub async fn index_batch<P: Provider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    body: Bytes,
) -> ApiResult<IndexBatchResponse> {
    let request: IndexBatchRequest = parse_body(&body)?;
    let items = request.items.into_iter().map(IndexItem::from).collect();
    let ids = state.retriever.index_batch(items).map_err(retrieval_error)?;
    let count = ids.len();
    Ok(Json(IndexBatchResponse { ids, count }))
}

/// `POST /search`: rank stored documents by similarity to `text`.
pub async fn search<P: Provider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    body: Bytes,
) -> ApiResult<SearchResponse> {
    let request: SearchRequest = parse_body(&body)?;
    let k = usize::try_from(request.k).unwrap_or(0);
    let results = state
        .retriever
        .query(&request.text, k)
        .map_err(retrieval_error)?;
    let count = results.len();
    Ok(Json(SearchResponse { results, count }))
}

/// `GET /store/info`: current size and fixed dimension.
pub async fn store_info<P: Provider + 'static>(
    State(state): State<Arc<AppState<P>>>,
) -> Json<StoreInfo> {
    Json(state.retriever.info())
}

/// `POST /store/clear`: drop every stored document.
pub async fn clear_store<P: Provider + 'static>(
    State(state): State<Arc<AppState<P>>>,
) -> Json<ClearResponse> {
    state.retriever.clear();
    Json(ClearResponse {
        message: "Store cleared".into(),
    })
}
