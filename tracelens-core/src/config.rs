use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DIMENSION: usize = 384;
const DEFAULT_EMBEDDING_PROVIDER: &str = "local";
const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
const DEFAULT_GENERATION_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_GENERATION_ENDPOINT: &str = "https://api.groq.com/openai/v1";
const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONTEXT_LIMIT: usize = 3;

/// Embedding providers that can be selected in `[embedding]`.
pub const EMBEDDING_PROVIDERS: &[&str] = &["local", "hash"];

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: Option<GenerationConfig>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed to call the API from a browser.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_allowed_origins() -> Vec<String> {
    [
        "http://localhost:8081",
        "http://127.0.0.1:8081",
        "http://localhost:3000",
        "http://localhost:5173",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
        }
    }
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
        }
    }
}

fn default_embedding_provider() -> String {
    DEFAULT_EMBEDDING_PROVIDER.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_type", rename = "type")]
    pub provider_type: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider_type: default_generation_type(),
            model: default_generation_model(),
            endpoint: default_generation_endpoint(),
            api_key: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    /// Resolve the API key from the inline value or the named environment
    /// variable. `None` means generation is not configured.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

fn default_generation_type() -> String {
    "openai".to_string()
}

fn default_generation_model() -> String {
    DEFAULT_GENERATION_MODEL.to_string()
}

fn default_generation_endpoint() -> String {
    DEFAULT_GENERATION_ENDPOINT.to_string()
}

fn default_api_key_env() -> Option<String> {
    Some(DEFAULT_API_KEY_ENV.to_string())
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct AnalysisConfig {
    /// Number of similar errors retrieved and rendered into the prompt.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            context_limit: default_context_limit(),
        }
    }
}

fn default_context_limit() -> usize {
    DEFAULT_CONTEXT_LIMIT
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file '{}': {e}", path.display()))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, String> {
        let config: Config =
            toml::from_str(contents).map_err(|e| format!("invalid config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.index.dimension == 0 {
            return Err("invalid config: index.dimension must be greater than zero".to_string());
        }
        if !EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(format!(
                "invalid config: unknown embedding provider '{}'. Valid providers: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            ));
        }
        if self.embedding.provider == "local"
            && self.index.dimension != crate::embedding::local::DEFAULT_DIMENSIONS
        {
            return Err(format!(
                "invalid config: local embedding model produces {} dimensions but index.dimension is {}",
                crate::embedding::local::DEFAULT_DIMENSIONS,
                self.index.dimension
            ));
        }
        if self.embedding.provider == "local"
            && self.embedding.model != crate::embedding::local::MODEL_NAME
        {
            return Err(format!(
                "invalid config: unsupported local embedding model '{}'. Supported models: {}",
                self.embedding.model,
                crate::embedding::local::MODEL_NAME
            ));
        }
        if let Some(ref generation) = self.generation {
            if generation.provider_type != "openai" {
                return Err(format!(
                    "invalid config: unknown generation type '{}'. Valid types: openai",
                    generation.provider_type
                ));
            }
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("failed to serialize config: {e}"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
        assert_eq!(config.index.dimension, 384);
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.analysis.context_limit, 3);
        assert!(config.generation.is_none());
        assert!(config.server.allowed_origins.contains(&"http://localhost:5173".to_string()));
    }

    #[test]
    fn generation_section_fills_in_defaults() {
        let toml = r#"
[generation]
api_key = "gsk-test"
"#;
        let config = Config::parse(toml).unwrap();
        let generation = config.generation.unwrap();
        assert_eq!(generation.provider_type, "openai");
        assert_eq!(generation.model, "llama-3.1-8b-instant");
        assert_eq!(generation.endpoint, "https://api.groq.com/openai/v1");
        assert_eq!(generation.max_tokens, 1024);
        assert_eq!(generation.timeout_secs, 30);
        assert_eq!(generation.api_key_env.as_deref(), Some("GROQ_API_KEY"));
        assert_eq!(generation.resolve_api_key().as_deref(), Some("gsk-test"));
    }

    #[test]
    fn api_key_env_resolves_from_environment() {
        let var = "TRACELENS_TEST_KEY_CONFIG_001";
        unsafe { std::env::set_var(var, "from-env") };
        let generation = GenerationConfig {
            api_key_env: Some(var.into()),
            ..GenerationConfig::default()
        };
        assert_eq!(generation.resolve_api_key().as_deref(), Some("from-env"));
        unsafe { std::env::remove_var(var) };
    }

    #[test]
    fn missing_key_means_unconfigured() {
        let generation = GenerationConfig {
            api_key: Some(String::new()),
            api_key_env: Some("TRACELENS_TEST_KEY_CONFIG_UNSET".into()),
            ..GenerationConfig::default()
        };
        assert!(generation.resolve_api_key().is_none());
    }

    #[test]
    fn hash_embedder_allows_custom_dimension() {
        let toml = r#"
[index]
dimension = 64

[embedding]
provider = "hash"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.index.dimension, 64);
    }

    #[test]
    fn local_embedder_rejects_wrong_dimension() {
        let err = Config::parse("[index]\ndimension = 128\n").unwrap_err();
        assert!(err.contains("384"), "error should mention 384: {err}");
    }

    #[test]
    fn local_embedder_rejects_unsupported_model() {
        let err = Config::parse("[embedding]\nmodel = \"bge-small-en-v1.5\"\n").unwrap_err();
        assert!(err.contains("bge-small-en-v1.5"), "error: {err}");
        assert!(err.contains("all-MiniLM-L6-v2"), "error: {err}");
    }

    #[test]
    fn hash_embedder_ignores_model_name() {
        let config = Config::parse(
            "[index]\ndimension = 32\n\n[embedding]\nprovider = \"hash\"\nmodel = \"anything\"\n",
        )
        .unwrap();
        assert_eq!(config.embedding.model, "anything");
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let toml = r#"
[index]
dimension = 0

[embedding]
provider = "hash"
"#;
        let err = Config::parse(toml).unwrap_err();
        assert!(err.contains("dimension"), "error: {err}");
    }

    #[test]
    fn unknown_embedding_provider_is_rejected() {
        let err = Config::parse("[embedding]\nprovider = \"cohere\"\n").unwrap_err();
        assert!(err.contains("cohere"), "error: {err}");
    }

    #[test]
    fn unknown_generation_type_is_rejected() {
        let err = Config::parse("[generation]\ntype = \"gemini\"\n").unwrap_err();
        assert!(err.contains("gemini"), "error: {err}");
    }

    #[test]
    fn custom_server_values_override_defaults() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 9000
allowed_origins = ["https://debug.example.com"]
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.server.allowed_origins, vec!["https://debug.example.com"]);
    }

    #[test]
    fn config_reads_specified_file() {
        let dir = std::env::temp_dir().join("tracelens-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("custom.toml");
        std::fs::write(&path, "[server]\nport = 8123\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.server.port, 8123);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_produces_clear_error() {
        let err = Config::from_file(Path::new("/nonexistent/tracelens.toml")).unwrap_err();
        assert!(err.contains("failed to read config file"), "error: {err}");
    }

    #[test]
    fn to_toml_string_round_trips() {
        let config = Config::parse("[generation]\nmodel = \"m\"\n").unwrap();
        let text = config.to_toml_string().unwrap();
        assert_eq!(Config::parse(&text).unwrap(), config);
    }

    #[test]
    fn example_config_is_valid() {
        let config = Config::parse(include_str!("../../tracelens.example.toml")).unwrap();
        assert_eq!(config, Config {
            generation: config.generation.clone(),
            ..Config::default()
        });
        let generation = config.generation.unwrap();
        assert_eq!(generation.model, "llama-3.1-8b-instant");
        assert_eq!(generation.api_key_env.as_deref(), Some("GROQ_API_KEY"));
    }
}
