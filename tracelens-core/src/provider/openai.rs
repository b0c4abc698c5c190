use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::GenerationConfig;
use crate::provider::{Provider, ProviderError};

/// OpenAI-compatible provider (works with OpenAI, Groq, LM Studio, and any
/// endpoint that speaks the same chat-completions protocol).
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

// --- Request body construction ---

/// Build the request body for a non-streaming chat completion.
pub(crate) fn build_request_body(
    model: &str,
    system_prompt: &str,
    prompt: &str,
    temperature: f32,
    max_tokens: u32,
) -> serde_json::Value {
    let mut messages = Vec::new();
    if !system_prompt.is_empty() {
        messages.push(serde_json::json!({
            "role": "system",
            "content": system_prompt,
        }));
    }
    messages.push(serde_json::json!({
        "role": "user",
        "content": prompt,
    }));

    serde_json::json!({
        "model": model,
        "messages": messages,
        "temperature": temperature,
        "max_tokens": max_tokens,
        "stream": false,
    })
}

// --- Response types ---

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Extract the first choice's text from a completion response body.
pub(crate) fn parse_completion(body: &str) -> Result<String, ProviderError> {
    let response: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON: {e}")))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::MalformedResponse("response has no message content".into()))
}

/// Map an HTTP error status code and body to a `ProviderError`.
pub(crate) fn map_error_status(status: u16, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|r| r.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        401 => ProviderError::Auth(message),
        429 => ProviderError::RateLimit(message),
        _ => ProviderError::Other(format!("HTTP {status}: {message}")),
    }
}

// --- Provider implementation ---

impl Provider for OpenAiProvider {
    async fn generate(&self, system_prompt: &str, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));
        let body = build_request_body(
            &self.model,
            system_prompt,
            prompt,
            self.temperature,
            self.max_tokens,
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(map_error_status(status.as_u16(), &text));
        }
        parse_completion(&text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_openai_compatible_spec() {
        let body = build_request_body(
            "llama-3.1-8b-instant",
            "You are a debugging assistant.",
            "Stack trace: ...",
            0.3,
            1024,
        );

        assert_eq!(body["model"], "llama-3.1-8b-instant");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 1024);
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);

        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[0]["content"], "You are a debugging assistant.");
        assert_eq!(msgs[1]["role"], "user");
        assert_eq!(msgs[1]["content"], "Stack trace: ...");
    }

    #[test]
    fn empty_system_prompt_is_omitted() {
        let body = build_request_body("m", "", "hi", 0.0, 16);
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["role"], "user");
    }

    #[test]
    fn parse_completion_returns_first_choice() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Add a null check."},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Add a null check.");
    }

    #[test]
    fn parse_completion_without_choices_is_malformed() {
        let err = parse_completion(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn parse_completion_with_invalid_json_is_malformed() {
        let err = parse_completion("<html>").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn error_status_401_maps_to_auth() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#;
        match map_error_status(401, body) {
            ProviderError::Auth(msg) => assert_eq!(msg, "Invalid API Key"),
            other => panic!("expected Auth, got: {other:?}"),
        }
    }

    #[test]
    fn error_status_429_maps_to_rate_limit() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"tokens"}}"#;
        match map_error_status(429, body) {
            ProviderError::RateLimit(msg) => assert_eq!(msg, "Rate limit reached"),
            other => panic!("expected RateLimit, got: {other:?}"),
        }
    }

    #[test]
    fn error_status_500_maps_to_other() {
        match map_error_status(500, "Internal Server Error") {
            ProviderError::Other(msg) => assert!(msg.contains("500"), "msg: {msg}"),
            other => panic!("expected Other, got: {other:?}"),
        }
    }

    #[test]
    fn provider_new_copies_config() {
        let config = GenerationConfig::default();
        let provider = OpenAiProvider::new(&config, "gsk-test".into()).unwrap();
        assert_eq!(provider.model_name(), "llama-3.1-8b-instant");
        assert_eq!(provider.endpoint, "https://api.groq.com/openai/v1");
        assert_eq!(provider.max_tokens, 1024);
    }

    #[tokio::test]
    #[ignore] // Requires network and GROQ_API_KEY: cargo test -- --ignored
    async fn integration_live_generation() {
        let key = std::env::var("GROQ_API_KEY").unwrap();
        let provider = OpenAiProvider::new(&GenerationConfig::default(), key).unwrap();
        let text = provider
            .generate("You are terse.", "Say hello in one word.")
            .await
            .unwrap();
        assert!(!text.is_empty(), "expected non-empty response");
    }
}
