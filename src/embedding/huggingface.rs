//! Hugging Face inference API backend.

use super::{EmbeddingBackend, EmbeddingError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Feature-extraction responses come back either flat or wrapped in a batch dimension.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtraction {
    Flat(Vec<f32>),
    Batched(Vec<Vec<f32>>),
}

/// Calls the hosted feature-extraction endpoint of a Hugging Face model.
pub struct HuggingFaceBackend {
    pub(crate) client: Client,
    pub(crate) endpoint: String,
    pub(crate) api_key: String,
}

impl HuggingFaceBackend {
    /// Build a backend posting to `<base_url>/<model>` with a bearer token.
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder().user_agent("rusty-search/0.1").build()?;
        let endpoint = format_endpoint(base_url, model);
        tracing::debug!(endpoint = %endpoint, "Initialized Hugging Face embedding client");
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl EmbeddingBackend for HuggingFaceBackend {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({ "inputs": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Backend { status, body });
        }

        match response.json::<FeatureExtraction>().await? {
            FeatureExtraction::Flat(vector) => Ok(vector),
            FeatureExtraction::Batched(mut rows) if rows.len() == 1 => Ok(rows.remove(0)),
            FeatureExtraction::Batched(rows) => Err(EmbeddingError::Provider(format!(
                "expected a single embedding, received {}",
                rows.len()
            ))),
        }
    }
}

fn format_endpoint(base: &str, model: &str) -> String {
    let base = base.trim_end_matches('/');
    let model = model.trim_start_matches('/');
    format!("{base}/{model}")
}
