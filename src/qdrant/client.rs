//! HTTP client wrapper for interacting with Qdrant.

use crate::qdrant::{
    VectorStore,
    payload::{build_point, parse_metadata},
    types::{Document, SearchResponse, SearchResult, StoreError, StoreSettings},
};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

/// Lightweight HTTP client for Qdrant operations on a single collection.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) collection: String,
    pub(crate) vector_size: usize,
    pub(crate) score_threshold: f32,
}

impl QdrantService {
    /// Construct a new client from explicit settings.
    pub fn new(settings: StoreSettings) -> Result<Self, StoreError> {
        let client = Client::builder().user_agent("rusty-search/0.1").build()?;

        let base_url = normalize_base_url(&settings.url).map_err(StoreError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            collection = %settings.collection,
            has_api_key = %settings
                .api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key,
            collection: settings.collection,
            vector_size: settings.vector_size,
            score_threshold: settings.score_threshold,
        })
    }

    /// Name of the collection this client writes to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create or update the collection with the configured vector size.
    pub async fn create_collection(&self) -> Result<(), StoreError> {
        let body = json!({
            "vectors": {
                "size": self.vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{}", self.collection))?
            .json(&body)
            .send()
            .await?;

        self.ensure_success("create collection", response, || {
            tracing::info!(
                collection = %self.collection,
                vector_size = self.vector_size,
                "Collection created"
            );
        })
        .await
    }

    async fn collection_exists(&self) -> Result<bool, StoreError> {
        let response = self
            .request(Method::GET, &format!("collections/{}", self.collection))?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = StoreError::Operation {
                    operation: "collection check",
                    status,
                    body,
                };
                tracing::error!(collection = %self.collection, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, StoreError> {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        Ok(req)
    }

    async fn ensure_success<F>(
        &self,
        operation: &'static str,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::Operation {
                operation,
                status,
                body,
            };
            tracing::error!(collection = %self.collection, error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl VectorStore for QdrantService {
    async fn ensure_collection(&self) -> Result<(), StoreError> {
        if self.collection_exists().await? {
            tracing::debug!(collection = %self.collection, "Collection already exists");
            return Ok(());
        }

        tracing::debug!(
            collection = %self.collection,
            vector_size = self.vector_size,
            "Creating collection"
        );
        self.create_collection().await
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let response = self
            .request(
                Method::GET,
                &format!("collections/{}/points/{id}", self.collection),
            )?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = StoreError::Operation {
                    operation: "exists",
                    status,
                    body,
                };
                tracing::error!(collection = %self.collection, point_id = id, error = %error, "Point existence check failed");
                Err(error)
            }
        }
    }

    async fn upsert(&self, document: Document) -> Result<(), StoreError> {
        if document.vector.len() != self.vector_size {
            return Err(StoreError::InvalidVector {
                expected: self.vector_size,
                actual: document.vector.len(),
            });
        }

        let response = self
            .request(
                Method::PUT,
                &format!("collections/{}/points", self.collection),
            )?
            .query(&[("wait", true)])
            .json(&json!({ "points": [build_point(&document)] }))
            .send()
            .await?;

        self.ensure_success("upsert", response, || {
            tracing::debug!(
                collection = %self.collection,
                point_id = %document.id,
                file = %document.metadata.file_name,
                chunk_index = document.metadata.chunk_index,
                "Point upserted"
            );
        })
        .await
    }

    async fn query(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<SearchResult>, StoreError> {
        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
            "score_threshold": self.score_threshold,
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/search", self.collection),
            )?
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::Operation {
                operation: "search",
                status,
                body,
            };
            tracing::error!(collection = %self.collection, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: SearchResponse = response.json().await?;
        let results = payload
            .result
            .into_iter()
            .map(|point| SearchResult {
                metadata: parse_metadata(point.payload.as_ref()),
                id: stringify_point_id(point.id),
                score: point.score,
            })
            .collect();

        Ok(results)
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
