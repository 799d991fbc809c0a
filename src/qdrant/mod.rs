//! Qdrant vector store integration.

use async_trait::async_trait;

pub mod client;
mod payload;
pub mod types;

pub use client::QdrantService;
pub use types::{Document, DocumentMetadata, SearchResult, StoreError, StoreSettings};

/// Persistence operations the indexing and search pipelines need from a vector store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection when it is missing. Idempotent.
    async fn ensure_collection(&self) -> Result<(), StoreError>;

    /// Whether a point with `id` is already stored.
    async fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Insert or overwrite a single point.
    async fn upsert(&self, document: Document) -> Result<(), StoreError>;

    /// Return up to `limit` points above the relevance threshold, best first.
    async fn query(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<SearchResult>, StoreError>;
}
