//! In-memory stand-ins for the embedding backend and the vector store.

use crate::embedding::{EmbeddingBackend, EmbeddingError};
use crate::processing::CancellationToken;
use crate::qdrant::{Document, SearchResult, StoreError, VectorStore};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Deterministic embedding backend hashing bytes into a normalized vector.
pub(crate) struct FakeBackend {
    dimension: usize,
    failing_on: Option<String>,
    overrides: HashMap<String, Vec<f32>>,
    requests: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            dimension,
            failing_on: None,
            overrides: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every request whose text contains `needle`.
    pub(crate) fn failing_on(mut self, needle: &str) -> Self {
        self.failing_on = Some(needle.to_string());
        self
    }

    /// Return `vector` verbatim when asked to embed exactly `text`.
    pub(crate) fn with_vector_for(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.overrides.insert(text.to_string(), vector);
        self
    }

    /// Texts received so far, in order.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];
        if self.dimension == 0 {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            embedding[idx % self.dimension] += f32::from(byte) / 255.0;
        }

        let norm = embedding.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(text.to_string());

        if let Some(needle) = &self.failing_on
            && text.contains(needle.as_str())
        {
            return Err(EmbeddingError::Backend {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "model is loading".into(),
            });
        }

        Ok(self
            .overrides
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.encode(text)))
    }
}

/// Vector store keeping points in a map and ranking them by cosine similarity.
pub(crate) struct MemoryStore {
    vector_size: usize,
    score_threshold: f32,
    points: Mutex<BTreeMap<String, Document>>,
    upserts: AtomicUsize,
    collection_setups: AtomicUsize,
    failing_setup: bool,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl MemoryStore {
    pub(crate) fn new(vector_size: usize, score_threshold: f32) -> Self {
        Self {
            vector_size,
            score_threshold,
            points: Mutex::new(BTreeMap::new()),
            upserts: AtomicUsize::new(0),
            collection_setups: AtomicUsize::new(0),
            failing_setup: false,
            cancel_after: None,
        }
    }

    /// Cancel `token` once `upserts` points have been written.
    pub(crate) fn cancelling_after(mut self, upserts: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((upserts, token));
        self
    }

    /// Make `ensure_collection` fail as if Qdrant were unreachable.
    pub(crate) fn failing_setup(mut self) -> Self {
        self.failing_setup = true;
        self
    }

    /// Seed a point without counting it as an upsert.
    pub(crate) fn insert(&self, document: Document) {
        self.points
            .lock()
            .expect("points lock")
            .insert(document.id.clone(), document);
    }

    pub(crate) fn documents(&self) -> Vec<Document> {
        self.points
            .lock()
            .expect("points lock")
            .values()
            .cloned()
            .collect()
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.points
            .lock()
            .expect("points lock")
            .keys()
            .cloned()
            .collect()
    }

    pub(crate) fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub(crate) fn collection_setups(&self) -> usize {
        self.collection_setups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_collection(&self) -> Result<(), StoreError> {
        self.collection_setups.fetch_add(1, Ordering::SeqCst);
        if self.failing_setup {
            return Err(StoreError::Operation {
                operation: "collection check",
                status: StatusCode::BAD_GATEWAY,
                body: "qdrant unreachable".into(),
            });
        }
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.points.lock().expect("points lock").contains_key(id))
    }

    async fn upsert(&self, document: Document) -> Result<(), StoreError> {
        if document.vector.len() != self.vector_size {
            return Err(StoreError::InvalidVector {
                expected: self.vector_size,
                actual: document.vector.len(),
            });
        }
        let written = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;
        self.insert(document);
        if let Some((limit, token)) = &self.cancel_after
            && written >= *limit
        {
            token.cancel();
        }
        Ok(())
    }

    async fn query(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<SearchResult>, StoreError> {
        let points = self.points.lock().expect("points lock");
        let mut results: Vec<SearchResult> = points
            .values()
            .map(|document| SearchResult {
                id: document.id.clone(),
                score: cosine(&vector, &document.vector),
                metadata: document.metadata.clone(),
            })
            .filter(|result| result.score >= self.score_threshold)
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);
        Ok(results)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
