//! Thin JSON client for a running tracelens server.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Analysis can wait on an LLM, so the client allows more time than the
/// server's own generation timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct Client {
    http: reqwest::Client,
    base: String,
}

impl Client {
    pub fn new(base: &str) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, String> {
        let url = self.url(path);
        log::debug!("GET {url}");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;
        decode(response).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, String> {
        let url = self.url(path);
        log::debug!("POST {url}");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, String> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| format!("failed to read response: {e}"))?;
    if !status.is_success() {
        return Err(error_message(status.as_u16(), &text));
    }
    serde_json::from_str(&text).map_err(|e| format!("unexpected response: {e}"))
}

/// Render a non-2xx response, preferring the server's `{code, message}` body.
pub fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => match (value["code"].as_str(), value["message"].as_str()) {
            (Some(code), Some(message)) => format!("server error {status} ({code}): {message}"),
            _ => format!("server error {status}: {body}"),
        },
        Err(_) => format!("server error {status}: {body}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let client = Client::new("http://127.0.0.1:8000/").unwrap();
        assert_eq!(client.url("/health"), "http://127.0.0.1:8000/health");
        assert_eq!(client.url("store/info"), "http://127.0.0.1:8000/store/info");
    }

    #[test]
    fn structured_error_is_rendered() {
        let msg = error_message(502, r#"{"code":"embedding_error","message":"model unavailable"}"#);
        assert_eq!(msg, "server error 502 (embedding_error): model unavailable");
    }

    #[test]
    fn plain_error_body_is_kept() {
        assert_eq!(error_message(404, "not found"), "server error 404: not found");
        assert_eq!(error_message(500, r#"{"error":"x"}"#), r#"server error 500: {"error":"x"}"#);
    }
}
