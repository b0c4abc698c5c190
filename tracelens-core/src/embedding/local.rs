use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{EmbedError, Embedder};

const DEFAULT_MODEL: EmbeddingModel = EmbeddingModel::AllMiniLML6V2;
pub const DEFAULT_DIMENSIONS: usize = 384;
pub const MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Local embedding provider using fastembed with ONNX runtime.
pub struct LocalEmbedder {
    model: Mutex<TextEmbedding>,
}

impl LocalEmbedder {
    pub fn new() -> Result<Self, EmbedError> {
        let options = InitOptions::new(DEFAULT_MODEL).with_show_download_progress(true);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| EmbedError::ModelLoad(e.to_string()))?;
        log::info!("loaded local embedding model {MODEL_NAME} ({DEFAULT_DIMENSIONS}d)");
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl Embedder for LocalEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbedError::EncodingFailed("embedding model lock poisoned".into()))?;
        model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbedError::EncodingFailed(e.to_string()))
    }

    fn dimensions(&self) -> usize {
        DEFAULT_DIMENSIONS
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn provider_type(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use super::*;
    use crate::embedding::similarity;

    /// Shared model instance across all tests to avoid parallel download races
    /// and redundant model loads.
    static EMBEDDER: LazyLock<LocalEmbedder> = LazyLock::new(|| LocalEmbedder::new().unwrap());

    #[test]
    #[ignore] // Downloads the ONNX model: cargo test -- --ignored
    fn embed_single_text_returns_384_dims() {
        let result = EMBEDDER.embed(&["java.lang.NullPointerException"]).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].len(), 384);
    }

    #[test]
    #[ignore] // Downloads the ONNX model: cargo test -- --ignored
    fn related_errors_score_higher_than_unrelated_text() {
        let result = EMBEDDER
            .embed(&[
                "null pointer error",
                "NullPointerException fix: check null before call",
                "How to make pasta carbonara",
            ])
            .unwrap();
        let related = similarity(&result[0], &result[1]);
        let unrelated = similarity(&result[0], &result[2]);
        assert!(
            related > unrelated,
            "expected {related} > {unrelated} for related stack traces"
        );
    }
}
