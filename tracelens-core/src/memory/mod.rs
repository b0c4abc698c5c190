pub mod flat;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque metadata attached to a stored vector.
///
/// The store never inspects it; only the retrieval and analysis layers read
/// the reserved `text` and `source` keys.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Errors that can occur during vector store operations.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorStoreError {
    /// Embedding dimension does not match the store's configured dimension.
    DimensionMismatch { expected: usize, got: usize },
    /// A batch was given a different number of vectors and documents.
    LengthMismatch { vectors: usize, documents: usize },
    /// A vector component is NaN or infinite.
    NonFiniteComponent { index: usize },
    /// A store cannot be created with zero dimensions.
    ZeroDimension,
}

impl fmt::Display for VectorStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { expected, got } => {
                write!(f, "dimension mismatch: expected {expected}, got {got}")
            }
            Self::LengthMismatch { vectors, documents } => write!(
                f,
                "length mismatch: {vectors} vectors but {documents} documents"
            ),
            Self::NonFiniteComponent { index } => {
                write!(f, "vector component {index} is not a finite number")
            }
            Self::ZeroDimension => write!(f, "vector dimension must be greater than zero"),
        }
    }
}

impl std::error::Error for VectorStoreError {}

/// A search result with similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: usize,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
    pub metadata: Document,
}

/// Size and dimension of a vector store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub size: usize,
    pub dimension: usize,
}

/// Trait abstracting vector storage and exact similarity search.
///
/// Ids are dense and assigned in insertion order starting at zero. A failed
/// call never leaves the store partially mutated.
pub trait VectorStore: Send + Sync {
    /// Store one vector with its document and return the new id.
    fn insert(&self, vector: &[f32], document: Document) -> Result<usize, VectorStoreError>;

    /// Store a batch atomically. Ids are contiguous and follow input order.
    fn insert_batch(
        &self,
        vectors: &[Vec<f32>],
        documents: Vec<Document>,
    ) -> Result<Vec<usize>, VectorStoreError>;

    /// Return up to `k` entries ranked by descending cosine similarity, ties
    /// broken by ascending id.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorStoreError>;

    /// Returns the number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The fixed vector dimension of this store.
    fn dimensions(&self) -> usize;

    fn info(&self) -> StoreInfo {
        StoreInfo {
            size: self.len(),
            dimension: self.dimensions(),
        }
    }

    /// Drop every entry and restart ids at zero.
    fn clear(&self);
}
