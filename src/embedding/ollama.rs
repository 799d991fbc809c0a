//! Local Ollama backend.

use super::{EmbeddingBackend, EmbeddingError};
use async_trait::async_trait;
use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::GenerateEmbeddingsRequest;

const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Generates embeddings through a locally running Ollama server.
pub struct OllamaBackend {
    ollama: Ollama,
    model: String,
}

impl OllamaBackend {
    /// Connect to the Ollama server at `url` (port defaults to 11434).
    pub fn new(url: &str, model: impl Into<String>) -> Result<Self, EmbeddingError> {
        let (host, port) = split_host_port(url)?;
        tracing::debug!(host = %host, port, "Initialized Ollama embedding client");
        Ok(Self {
            ollama: Ollama::new(host, port),
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = GenerateEmbeddingsRequest::new(self.model.clone(), text.to_string().into());
        let response = self
            .ollama
            .generate_embeddings(request)
            .await
            .map_err(|error| EmbeddingError::Provider(error.to_string()))?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Provider("no embeddings returned".into()))
    }
}

fn split_host_port(url: &str) -> Result<(String, u16), EmbeddingError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|error| EmbeddingError::Provider(format!("invalid Ollama URL {url}: {error}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| EmbeddingError::Provider(format!("Ollama URL {url} has no host")))?;
    let port = parsed.port().unwrap_or(DEFAULT_OLLAMA_PORT);
    Ok((format!("{}://{host}", parsed.scheme()), port))
}
