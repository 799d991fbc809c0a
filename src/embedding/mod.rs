//! Embedding client abstraction and adapters.
//!
//! [`EmbeddingClient`] is the capability the pipelines depend on. [`Embedder`] implements it on
//! top of any [`EmbeddingBackend`] and owns the input/output policy: blank input is rejected,
//! long input is truncated to the configured character cap, and vectors whose length differs
//! from the configured dimension are refused rather than padded.

mod huggingface;
mod ollama;

pub use huggingface::HuggingFaceBackend;
pub use ollama::OllamaBackend;

use crate::config::{Config, EmbeddingProvider};
use crate::processing::chunking::{TextSplitter, normalize_text};
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by embedding providers and the embedding policy.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Input was empty once normalized.
    #[error("Input text cannot be empty")]
    EmptyInput,
    /// The embedding endpoint answered with a non-success status.
    #[error("Embedding API error: {status} - {body}")]
    Backend {
        /// HTTP status returned upstream.
        status: StatusCode,
        /// Body of the failing response.
        body: String,
    },
    /// The request never produced a usable response.
    #[error("Embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// A non-HTTP provider reported a failure.
    #[error("Embedding provider failed: {0}")]
    Provider(String),
    /// The backend returned a vector of the wrong length.
    #[error("Embedding length {actual} does not match expected {expected}")]
    Shape {
        /// Configured dimensionality.
        expected: usize,
        /// Length actually returned.
        actual: usize,
    },
}

impl EmbeddingError {
    /// Whether the failure originated upstream rather than from the caller's input.
    pub fn is_backend_failure(&self) -> bool {
        !matches!(self, Self::EmptyInput)
    }
}

/// One chunk of a document paired with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    /// Chunk text as produced by the splitter.
    pub text: String,
    /// Embedding of the chunk.
    pub embedding: Vec<f32>,
}

/// Interface the indexing and search pipelines use to obtain embeddings.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single piece of text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Split `text` into chunks and embed each of them, preserving order.
    ///
    /// Any chunk failure fails the whole call; no partial list is returned.
    async fn embed_chunks(&self, text: &str) -> Result<Vec<EmbeddedChunk>, EmbeddingError>;
}

/// Raw transport to an embedding model.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Request the embedding of already prepared text.
    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[async_trait]
impl<T: EmbeddingBackend + ?Sized> EmbeddingBackend for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).request_embedding(text).await
    }
}

/// Constraints enforced around the backend.
#[derive(Debug, Clone, Copy)]
pub struct EmbedderSettings {
    /// Expected vector length.
    pub dimension: usize,
    /// Inputs longer than this many characters are truncated.
    pub max_chars: usize,
}

/// [`EmbeddingClient`] implementation applying the input and shape policy to a backend.
pub struct Embedder {
    backend: Box<dyn EmbeddingBackend>,
    splitter: TextSplitter,
    settings: EmbedderSettings,
}

impl Embedder {
    /// Wrap `backend` with the given splitter and constraints.
    pub fn new(
        backend: Box<dyn EmbeddingBackend>,
        splitter: TextSplitter,
        settings: EmbedderSettings,
    ) -> Self {
        Self {
            backend,
            splitter,
            settings,
        }
    }

    /// Build the configured backend and wrap it.
    pub fn from_config(config: &Config, splitter: TextSplitter) -> Result<Self, EmbeddingError> {
        let backend: Box<dyn EmbeddingBackend> = match config.embedding_provider {
            EmbeddingProvider::HuggingFace => Box::new(HuggingFaceBackend::new(
                config.embedding_base_url(),
                &config.embedding_model,
                config.embedding_api_key.clone().unwrap_or_default(),
            )?),
            EmbeddingProvider::Ollama => Box::new(OllamaBackend::new(
                config.embedding_base_url(),
                config.embedding_model.clone(),
            )?),
        };
        tracing::info!(
            backend = backend.name(),
            model = %config.embedding_model,
            dimension = config.embedding_dimension,
            "Embedding client initialized"
        );
        Ok(Self::new(backend, splitter, config.embedder_settings()))
    }

    /// Expected vector length.
    pub fn dimension(&self) -> usize {
        self.settings.dimension
    }

    fn prepare_input(&self, text: &str) -> Result<String, EmbeddingError> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            tracing::error!("Input text is empty");
            return Err(EmbeddingError::EmptyInput);
        }

        let length = normalized.chars().count();
        if length > self.settings.max_chars {
            tracing::warn!(
                length,
                max_chars = self.settings.max_chars,
                "Text exceeds embedding input cap; truncating"
            );
            return Ok(normalized.chars().take(self.settings.max_chars).collect());
        }
        Ok(normalized)
    }
}

#[async_trait]
impl EmbeddingClient for Embedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let input = self.prepare_input(text)?;
        tracing::debug!(
            backend = self.backend.name(),
            length = input.chars().count(),
            preview = %preview(&input),
            "Generating embedding"
        );

        let vector = self.backend.request_embedding(&input).await.inspect_err(|error| {
            tracing::error!(backend = self.backend.name(), error = %error, "Embedding request failed");
        })?;

        if vector.len() != self.settings.dimension {
            tracing::error!(
                expected = self.settings.dimension,
                actual = vector.len(),
                "Unexpected embedding length"
            );
            return Err(EmbeddingError::Shape {
                expected: self.settings.dimension,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    async fn embed_chunks(&self, text: &str) -> Result<Vec<EmbeddedChunk>, EmbeddingError> {
        let chunks = self.splitter.split(text);
        let mut embedded = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = self.embed(&chunk).await?;
            embedded.push(EmbeddedChunk {
                text: chunk,
                embedding,
            });
        }
        Ok(embedded)
    }
}

fn preview(text: &str) -> String {
    let mut preview: String = text
        .chars()
        .take(50)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if text.chars().count() > 50 {
        preview.push_str("...");
    }
    preview
}
