//! Minimal Ollama API client.
//!
//! This crate provides a focused client for a local Ollama server with:
//! - Non-streaming text generation (`/api/generate`)
//! - Model listing (`/api/tags`)
//! - A connection check that round-trips a short prompt

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "dengcao/Qwen3-30B-A3B-Instruct-2507:latest";

/// Errors that can occur when using the Ollama client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Ollama API client.
#[derive(Clone)]
pub struct Ollama {
    client: reqwest::Client,
    host: String,
    model: String,
}

impl Ollama {
    /// Create a client for the given model on the default local host.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            // Local models can take minutes on a cold load.
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(600))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            host: DEFAULT_HOST.to_string(),
            model: model.into(),
        }
    }

    /// Create a client from `OLLAMA_HOST` and `OLLAMA_MODEL`, falling back to defaults.
    pub fn from_env() -> Self {
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let client = Self::new(model);
        match std::env::var("OLLAMA_HOST") {
            Ok(host) => client.with_host(host),
            Err(_) => client,
        }
    }

    /// Point this client at a different server.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        let host: String = host.into();
        let host = host.trim_end_matches('/');
        // OLLAMA_HOST is commonly set without a scheme
        self.host = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };
        self
    }

    /// The model every request goes to.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Generate text for a prompt and return the model's reply.
    pub async fn prompt(&self, prompt: &str) -> Result<String, Error> {
        if self.host.is_empty() {
            return Err(Error::Config("host is empty".to_string()));
        }

        let api_request = self.build_api_request(prompt);
        debug!(model = %api_request.model, prompt_len = api_request.prompt.len(), "ollama generate");

        let response = self
            .client
            .post(format!("{}/api/generate", self.host))
            .headers(build_headers())
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: api_error_message(&body),
            });
        }

        let api_response: ApiGenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(api_response.response)
    }

    /// Check that the server is up and the model answers.
    ///
    /// Sends the prompt `"test"` and discards the reply.
    pub async fn ping(&self) -> Result<(), Error> {
        self.prompt("test").await.map(|_| ())
    }

    /// List the models installed on the server.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, Error> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.host))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: api_error_message(&body),
            });
        }

        let tags: ApiTagsResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelInfo {
                name: m.name,
                size: m.size,
            })
            .collect())
    }

    fn build_api_request<'a>(&'a self, prompt: &'a str) -> ApiGenerateRequest<'a> {
        ApiGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        }
    }
}

fn build_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Ollama reports failures as `{"error": "..."}`; fall back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string())
}

// ============================================================================
// Public types
// ============================================================================

/// A model installed on the server.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub size: u64,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ApiGenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ApiTagsResponse {
    #[serde(default)]
    models: Vec<ApiModel>,
}

#[derive(Debug, Deserialize)]
struct ApiModel {
    name: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Ollama::new("llama3");
        assert_eq!(client.model(), "llama3");
        assert_eq!(client.host(), DEFAULT_HOST);
    }

    #[test]
    fn test_client_with_host_trims_slash() {
        let client = Ollama::new("llama3").with_host("http://gpu-box:11434/");
        assert_eq!(client.host(), "http://gpu-box:11434");
    }

    #[test]
    fn test_client_with_host_adds_scheme() {
        let client = Ollama::new("llama3").with_host("127.0.0.1:11434");
        assert_eq!(client.host(), "http://127.0.0.1:11434");
    }

    #[test]
    fn test_api_request_disables_streaming() {
        let client = Ollama::new("qwen3");
        let api = client.build_api_request("hi");
        let json = serde_json::to_value(&api).unwrap();

        assert_eq!(json["model"], "qwen3");
        assert_eq!(json["prompt"], "hi");
        assert_eq!(json["stream"], false);
        assert_eq!(json.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_parse_generate_response() {
        let body = r#"{"model":"qwen3","created_at":"2024-01-01T00:00:00Z","response":"High Resonance","done":true,"done_reason":"stop","prompt_eval_count":12,"eval_count":3}"#;
        let api: ApiGenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(api.response, "High Resonance");
    }

    #[test]
    fn test_api_error_message() {
        assert_eq!(
            api_error_message(r#"{"error":"model 'nope' not found"}"#),
            "model 'nope' not found"
        );
        assert_eq!(api_error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn test_parse_tags() {
        let body = r#"{"models":[{"name":"llama3:latest","size":4661224676,"digest":"abc"}]}"#;
        let tags: ApiTagsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(tags.models.len(), 1);
        assert_eq!(tags.models[0].name, "llama3:latest");
    }
}
