//! Shared types used by the Qdrant client and helpers.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant answered a call with an unexpected status code.
    #[error("Qdrant {operation} failed ({status}): {body}")]
    Operation {
        /// Store operation that failed.
        operation: &'static str,
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// A document vector does not match the collection size.
    #[error("Vector length {actual} does not match collection size {expected}")]
    InvalidVector {
        /// Configured vector size of the collection.
        expected: usize,
        /// Length of the rejected vector.
        actual: usize,
    },
}

/// Connection and collection settings for the Qdrant client.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Base URL of the Qdrant REST API.
    pub url: String,
    /// Collection holding the chunk vectors.
    pub collection: String,
    /// Optional value for the `api-key` header.
    pub api_key: Option<String>,
    /// Vector size used when creating the collection and validating upserts.
    pub vector_size: usize,
    /// Minimum similarity score for query results.
    pub score_threshold: f32,
}

/// Payload stored alongside each chunk vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    /// Chunk text.
    pub text: String,
    /// Name of the source file.
    pub file_name: String,
    /// Path of the source file.
    pub file_path: String,
    /// Position of the chunk within its file.
    pub chunk_index: usize,
}

/// A point ready to be written to the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Deterministic point identifier.
    pub id: String,
    /// Embedding vector of the chunk.
    pub vector: Vec<f32>,
    /// Payload stored with the vector.
    pub metadata: DocumentMetadata,
}

/// Scored point returned by a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Identifier of the matching point.
    pub id: String,
    /// Similarity score computed by Qdrant; higher is more relevant.
    pub score: f32,
    /// Payload of the matching point.
    pub metadata: DocumentMetadata,
}

#[derive(Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub(crate) result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
pub(crate) struct ScoredPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
