pub mod hash;
pub mod local;

use std::fmt;

/// Errors that can occur during embedding.
#[derive(Debug)]
pub enum EmbedError {
    /// Failed to load or initialize the embedding model.
    ModelLoad(String),
    /// Failed to encode input texts into vectors.
    EncodingFailed(String),
    /// The embedder returned a different number of vectors than texts given.
    WrongCount { expected: usize, got: usize },
}

impl fmt::Display for EmbedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelLoad(msg) => write!(f, "model load error: {msg}"),
            Self::EncodingFailed(msg) => write!(f, "encoding failed: {msg}"),
            Self::WrongCount { expected, got } => {
                write!(f, "embedder returned {got} vectors for {expected} texts")
            }
        }
    }
}

impl std::error::Error for EmbedError {}

/// Trait abstracting text-to-vector embedding.
///
/// Implementations must be deterministic for a given model: embedding a text
/// alone or as part of a batch yields the same vector.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts into vectors.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Dimensionality of the output vectors.
    fn dimensions(&self) -> usize;

    /// Model identifier string.
    fn model_name(&self) -> &str;

    /// Provider type identifier (e.g., "local", "hash").
    fn provider_type(&self) -> &str;
}

/// Embed a single text.
pub fn embed_one(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, EmbedError> {
    embed_checked(embedder, &[text])?
        .pop()
        .ok_or(EmbedError::WrongCount { expected: 1, got: 0 })
}

/// Embed a batch and verify one vector came back per input text.
pub fn embed_checked(embedder: &dyn Embedder, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
    let vectors = embedder.embed(texts)?;
    if vectors.len() != texts.len() {
        return Err(EmbedError::WrongCount {
            expected: texts.len(),
            got: vectors.len(),
        });
    }
    Ok(vectors)
}

/// Cosine similarity of two raw vectors. Zero when either vector has zero norm.
pub fn similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FailingEmbedder, ShortEmbedder};

    #[test]
    fn similarity_of_parallel_vectors_is_one() {
        let sim = similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((sim - 1.0).abs() < 1e-6, "got {sim}");
    }

    #[test]
    fn similarity_of_opposite_vectors_is_minus_one() {
        let sim = similarity(&[1.0, 0.0], &[-3.0, 0.0]);
        assert!((sim + 1.0).abs() < 1e-6, "got {sim}");
    }

    #[test]
    fn similarity_with_zero_vector_is_zero() {
        assert_eq!(similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn embed_one_propagates_failure() {
        let err = embed_one(&FailingEmbedder::new(4), "boom").unwrap_err();
        assert!(matches!(err, EmbedError::EncodingFailed(_)));
    }

    #[test]
    fn embed_checked_rejects_short_batches() {
        let err = embed_checked(&ShortEmbedder::new(4), &["a", "b"]).unwrap_err();
        match err {
            EmbedError::WrongCount { expected, got } => {
                assert_eq!(expected, 2);
                assert_eq!(got, 1);
            }
            other => panic!("expected WrongCount, got: {other:?}"),
        }
    }
}
