//! Application state container.
//!
//! `AppState` is built once at startup and shared by every request handler.
//! It owns the vector store (through the retriever), the embedder and the
//! optional generation provider. It has no web-framework dependencies, so the
//! server and tests construct it the same way.

use std::sync::Arc;

use crate::analysis::Analyzer;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::embedding::hash::HashEmbedder;
use crate::embedding::local::LocalEmbedder;
use crate::memory::flat::FlatVectorStore;
use crate::provider::Provider;
use crate::provider::openai::OpenAiProvider;
use crate::retrieval::Retriever;

/// Shared application state.
pub struct AppState<P> {
    pub retriever: Arc<Retriever>,
    pub analyzer: Analyzer<P>,
    pub config: Config,
}

impl AppState<OpenAiProvider> {
    /// Construct the state described by `config`: embedder, empty store and,
    /// when an API key is available, the generation provider.
    pub fn new(config: Config) -> Result<Self, String> {
        let embedder = build_embedder(&config)?;
        let provider = build_provider(&config)?;
        Self::from_parts(config, embedder, provider)
    }
}

impl<P: Provider> AppState<P> {
    /// Assemble state from already-built components.
    pub fn from_parts(
        config: Config,
        embedder: Arc<dyn Embedder>,
        provider: Option<P>,
    ) -> Result<Self, String> {
        let dimension = config.index.dimension;
        if embedder.dimensions() != dimension {
            return Err(format!(
                "embedder '{}' produces {} dimensions but index.dimension is {dimension}",
                embedder.model_name(),
                embedder.dimensions()
            ));
        }
        let store = FlatVectorStore::new(dimension)
            .map_err(|e| format!("failed to create vector store: {e}"))?;
        let retriever = Arc::new(Retriever::new(embedder, Arc::new(store)));
        let analyzer = Analyzer::new(retriever.clone(), provider)
            .with_context_limit(config.analysis.context_limit);
        Ok(Self {
            retriever,
            analyzer,
            config,
        })
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        self.retriever.embedder()
    }
}

/// Build the embedder selected in `[embedding]`.
pub fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>, String> {
    match config.embedding.provider.as_str() {
        "local" => {
            let embedder = LocalEmbedder::new()
                .map_err(|e| format!("failed to initialize local embedder: {e}"))?;
            Ok(Arc::new(embedder))
        }
        "hash" => Ok(Arc::new(HashEmbedder::new(config.index.dimension))),
        other => Err(format!("unknown embedding provider '{other}'")),
    }
}

/// Build the generation provider, or `None` when generation is not configured.
pub fn build_provider(config: &Config) -> Result<Option<OpenAiProvider>, String> {
    let Some(ref generation) = config.generation else {
        log::info!("no [generation] section; analysis will return the fallback message");
        return Ok(None);
    };
    let Some(api_key) = generation.resolve_api_key() else {
        log::warn!(
            "generation API key not set (api_key or ${}); analysis will return the fallback message",
            generation.api_key_env.as_deref().unwrap_or("<none>")
        );
        return Ok(None);
    };
    let provider = OpenAiProvider::new(generation, api_key)
        .map_err(|e| format!("failed to initialize generation provider: {e}"))?;
    Ok(Some(provider))
}
