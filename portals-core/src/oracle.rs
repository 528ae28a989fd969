//! Language-model backends.
//!
//! The pipeline only needs "prompt in, text out", so backends sit behind the
//! [`LanguageModel`] trait. [`ollama::Ollama`] is the production backend.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors from a language-model call.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Ollama error: {0}")]
    Backend(#[from] ollama::Error),

    #[error("Model unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can turn a prompt into free-form text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a reply for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;

    /// Name of the model, for display.
    fn name(&self) -> &str;
}

#[async_trait]
impl LanguageModel for ollama::Ollama {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        Ok(self.prompt(prompt).await?)
    }

    fn name(&self) -> &str {
        self.model()
    }
}

/// Connect to an Ollama model and confirm it answers.
pub async fn connect_ollama(
    host: Option<&str>,
    model: &str,
) -> Result<Arc<dyn LanguageModel>, ModelError> {
    let mut client = ollama::Ollama::new(model);
    if let Some(host) = host {
        client = client.with_host(host);
    }

    info!(model, host = client.host(), "connecting to ollama");
    client.ping().await?;
    info!(model, "ollama model answered");

    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_name_is_model() {
        let client = ollama::Ollama::new("llama3");
        assert_eq!(LanguageModel::name(&client), "llama3");
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        // Port 9 (discard) is essentially never an Ollama server
        let result = connect_ollama(Some("http://127.0.0.1:9"), "llama3").await;
        assert!(matches!(result, Err(ModelError::Backend(ollama::Error::Network(_)))));
    }
}
