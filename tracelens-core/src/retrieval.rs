//! Text-level indexing and querying on top of an embedder and a vector store.

use std::fmt;
use std::sync::Arc;

use crate::embedding::{self, EmbedError, Embedder};
use crate::memory::{Document, SearchResult, StoreInfo, VectorStore, VectorStoreError};

/// Metadata key that always holds the indexed text.
pub const TEXT_KEY: &str = "text";

/// Errors surfaced by retrieval operations.
#[derive(Debug)]
pub enum RetrievalError {
    /// The embedding dependency failed; nothing was stored.
    Embedding(EmbedError),
    /// The vector store rejected the operation; nothing was stored.
    Store(VectorStoreError),
}

impl fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedding(e) => write!(f, "embedding failed: {e}"),
            Self::Store(e) => write!(f, "vector store error: {e}"),
        }
    }
}

impl std::error::Error for RetrievalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Embedding(e) => Some(e),
            Self::Store(e) => Some(e),
        }
    }
}

impl From<EmbedError> for RetrievalError {
    fn from(e: EmbedError) -> Self {
        Self::Embedding(e)
    }
}

impl From<VectorStoreError> for RetrievalError {
    fn from(e: VectorStoreError) -> Self {
        Self::Store(e)
    }
}

/// A text to index together with its caller-supplied metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexItem {
    pub text: String,
    pub metadata: Document,
}

/// Bridges free text and the vector store.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Embed `text` and store it, with `text` copied into the metadata.
    pub fn index_text(&self, text: &str, metadata: Document) -> Result<usize, RetrievalError> {
        let vector = embedding::embed_one(&*self.embedder, text)?;
        let id = self.store.insert(&vector, with_text(metadata, text))?;
        Ok(id)
    }

    /// Batch form of [`Retriever::index_text`]. All items are stored or none.
    pub fn index_batch(&self, items: Vec<IndexItem>) -> Result<Vec<usize>, RetrievalError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let texts: Vec<&str> = items.iter().map(|item| item.text.as_str()).collect();
        let vectors = embedding::embed_checked(&*self.embedder, &texts)?;

        let documents = items
            .into_iter()
            .map(|item| with_text(item.metadata, &item.text))
            .collect();
        let ids = self.store.insert_batch(&vectors, documents)?;
        log::info!("indexed {} documents", ids.len());
        Ok(ids)
    }

    /// Embed `text` and return the `k` most similar stored entries.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let vector = embedding::embed_one(&*self.embedder, text)?;
        Ok(self.store.search(&vector, k)?)
    }

    pub fn store_size(&self) -> usize {
        self.store.len()
    }

    pub fn dimension(&self) -> usize {
        self.store.dimensions()
    }

    pub fn info(&self) -> StoreInfo {
        self.store.info()
    }

    pub fn clear(&self) {
        self.store.clear();
        log::info!("vector store cleared");
    }
}

fn with_text(mut metadata: Document, text: &str) -> Document {
    metadata.insert(TEXT_KEY.to_string(), serde_json::Value::String(text.to_string()));
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::flat::FlatVectorStore;
    use crate::testutil::{FailingEmbedder, MockEmbedder, ShortEmbedder};
    use serde_json::json;

    fn retriever() -> Retriever {
        Retriever::new(
            Arc::new(MockEmbedder::new(384)),
            Arc::new(FlatVectorStore::new(384).unwrap()),
        )
    }

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn item(text: &str, metadata: serde_json::Value) -> IndexItem {
        IndexItem {
            text: text.into(),
            metadata: doc(metadata),
        }
    }

    #[test]
    fn index_text_stores_text_in_metadata() {
        let r = retriever();
        let id = r
            .index_text("NullPointerException in UserService", doc(json!({"source": "github"})))
            .unwrap();
        assert_eq!(id, 0);

        let results = r.query("NullPointerException in UserService", 1).unwrap();
        assert_eq!(results[0].metadata["text"], "NullPointerException in UserService");
        assert_eq!(results[0].metadata["source"], "github");
    }

    #[test]
    fn index_text_overwrites_caller_text_key() {
        let r = retriever();
        r.index_text("real text", doc(json!({"text": "spoofed"}))).unwrap();
        let results = r.query("real text", 1).unwrap();
        assert_eq!(results[0].metadata["text"], "real text");
    }

    #[test]
    fn null_pointer_query_finds_null_pointer_fix() {
        let r = retriever();
        r.index_batch(vec![
            item("NullPointerException fix: check null before call", json!({})),
            item("ArrayIndexOutOfBoundsException", json!({})),
        ])
        .unwrap();

        let results = r.query("null pointer error", 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 0);
        assert_eq!(
            results[0].metadata["text"],
            "NullPointerException fix: check null before call"
        );

        let both = r.query("null pointer error", 2).unwrap();
        assert!(both[0].score > both[1].score);
    }

    #[test]
    fn batch_ids_match_sequential_ids() {
        let batched = retriever();
        let sequential = retriever();
        let items = vec![
            item("NullPointerException", json!({"type": "error"})),
            item("ArrayIndexOutOfBounds", json!({"type": "error"})),
            item("Connection refused", json!({"type": "network"})),
        ];

        let batch_ids = batched.index_batch(items.clone()).unwrap();
        let seq_ids: Vec<usize> = items
            .into_iter()
            .map(|i| sequential.index_text(&i.text, i.metadata).unwrap())
            .collect();
        assert_eq!(batch_ids, vec![0, 1, 2]);
        assert_eq!(batch_ids, seq_ids);

        let a = batched.query("Connection refused", 3).unwrap();
        let b = sequential.query("Connection refused", 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_batch_skips_embedder() {
        let embedder = Arc::new(MockEmbedder::new(8));
        let r = Retriever::new(embedder.clone(), Arc::new(FlatVectorStore::new(8).unwrap()));
        assert!(r.index_batch(Vec::new()).unwrap().is_empty());
        assert!(r.query("anything", 0).unwrap().is_empty());
        assert_eq!(embedder.calls(), 0);
    }

    #[test]
    fn embedding_failure_propagates_and_stores_nothing() {
        let r = Retriever::new(
            Arc::new(FailingEmbedder::new(8)),
            Arc::new(FlatVectorStore::new(8).unwrap()),
        );
        let err = r.index_text("anything", Document::new()).unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
        let err = r.query("anything", 3).unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
        assert_eq!(r.store_size(), 0);
    }

    #[test]
    fn short_embedding_batch_stores_nothing() {
        let r = Retriever::new(
            Arc::new(ShortEmbedder::new(8)),
            Arc::new(FlatVectorStore::new(8).unwrap()),
        );
        let err = r
            .index_batch(vec![item("a", json!({})), item("b", json!({}))])
            .unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Embedding(EmbedError::WrongCount { expected: 2, got: 1 })
        ));
        assert_eq!(r.store_size(), 0);
    }

    #[test]
    fn embedder_dimension_mismatch_is_a_store_error() {
        let r = Retriever::new(
            Arc::new(MockEmbedder::new(16)),
            Arc::new(FlatVectorStore::new(8).unwrap()),
        );
        let err = r.index_text("text", Document::new()).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Store(VectorStoreError::DimensionMismatch { expected: 8, got: 16 })
        ));
    }

    #[test]
    fn query_with_zero_k_is_empty() {
        let r = retriever();
        r.index_text("something", Document::new()).unwrap();
        assert!(r.query("something", 0).unwrap().is_empty());
    }

    #[test]
    fn size_and_clear_pass_through() {
        let r = retriever();
        r.index_text("one", Document::new()).unwrap();
        r.index_text("two", Document::new()).unwrap();
        assert_eq!(r.store_size(), 2);
        assert_eq!(r.dimension(), 384);

        r.clear();
        assert_eq!(r.store_size(), 0);
        assert_eq!(r.index_text("three", Document::new()).unwrap(), 0);
    }
}
