//! Deterministic embedders and providers for tests in this and dependent crates.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::embedding::hash::HashEmbedder;
use crate::embedding::{EmbedError, Embedder};
use crate::provider::{Provider, ProviderError};

/// Trigram-hash embedder that also counts how many texts it embedded.
pub struct MockEmbedder {
    inner: HashEmbedder,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: HashEmbedder::new(dimensions),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of texts embedded so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed(texts)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        "mock-embedder"
    }

    fn provider_type(&self) -> &str {
        "mock"
    }
}

/// Embedder whose every call fails.
pub struct FailingEmbedder {
    dimensions: usize,
}

impl FailingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Embedder for FailingEmbedder {
    fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Err(EmbedError::EncodingFailed("model unavailable".into()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "failing-embedder"
    }

    fn provider_type(&self) -> &str {
        "mock"
    }
}

/// Embedder that drops the last vector of every batch.
pub struct ShortEmbedder {
    inner: HashEmbedder,
}

impl ShortEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: HashEmbedder::new(dimensions),
        }
    }
}

impl Embedder for ShortEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut vectors = self.inner.embed(texts)?;
        vectors.pop();
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        "short-embedder"
    }

    fn provider_type(&self) -> &str {
        "mock"
    }
}

/// Provider that returns a fixed reply and remembers the last request.
pub struct MockProvider {
    reply: String,
    last: Mutex<Option<(String, String)>>,
}

impl MockProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            last: Mutex::new(None),
        }
    }

    pub fn last_system_prompt(&self) -> Option<String> {
        self.last.lock().as_ref().map(|(system, _)| system.clone())
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last.lock().as_ref().map(|(_, prompt)| prompt.clone())
    }
}

impl Provider for MockProvider {
    async fn generate(&self, system_prompt: &str, prompt: &str) -> Result<String, ProviderError> {
        *self.last.lock() = Some((system_prompt.to_string(), prompt.to_string()));
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "mock-provider"
    }
}

/// Provider whose every call is rate limited.
pub struct FailingProvider;

impl Provider for FailingProvider {
    async fn generate(&self, _system_prompt: &str, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::RateLimit("quota exhausted".into()))
    }

    fn model_name(&self) -> &str {
        "failing-provider"
    }
}
