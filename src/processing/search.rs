//! Query orchestrator: embeds a query, ranks stored chunks, and attaches snippets.

use crate::{
    embedding::EmbeddingClient,
    processing::{
        snippet::build_snippet,
        types::{SearchError, SearchHit},
    },
    qdrant::VectorStore,
};
use std::sync::Arc;

/// Result count used when a caller does not specify one.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
/// Largest result count a single query may request.
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Runs similarity searches against the vector store.
pub struct SearchService {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
}

impl SearchService {
    /// Wire the search pipeline to its collaborators.
    pub fn new(embedder: Arc<dyn EmbeddingClient>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Return up to `limit` hits for `query`, best first.
    ///
    /// The query and limit are validated before any remote call. Hits keep the store's ordering.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
            return Err(SearchError::Validation(format!(
                "limit must be between 1 and {MAX_SEARCH_LIMIT}, got {limit}"
            )));
        }
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::Validation("query cannot be empty".into()));
        }

        let vector = self.embedder.embed(query).await?;
        let results = self.store.query(vector, limit).await?;
        tracing::info!(limit, results = results.len(), "Search completed");

        Ok(results
            .into_iter()
            .map(|result| SearchHit {
                text_snippet: build_snippet(&result.metadata.text, query),
                id: result.id,
                score: result.score,
                file_name: result.metadata.file_name,
                file_path: result.metadata.file_path,
                chunk_index: result.metadata.chunk_index,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{Embedder, EmbedderSettings};
    use crate::processing::chunking::TextSplitter;
    use crate::qdrant::{Document, DocumentMetadata};
    use crate::testing::{FakeBackend, MemoryStore};

    const DIMENSION: usize = 4;
    const THRESHOLD: f32 = 0.6;

    fn searcher(backend: FakeBackend, store: Arc<MemoryStore>) -> (SearchService, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        let embedder = Embedder::new(
            Box::new(backend.clone()),
            TextSplitter::default(),
            EmbedderSettings {
                dimension: DIMENSION,
                max_chars: 2000,
            },
        );
        (SearchService::new(Arc::new(embedder), store), backend)
    }

    fn seed(store: &MemoryStore, name: &str, text: &str, vector: Vec<f32>) {
        store.insert(Document {
            id: format!("{name}-id"),
            vector,
            metadata: DocumentMetadata {
                text: text.into(),
                file_name: name.into(),
                file_path: format!("data/{name}"),
                chunk_index: 0,
            },
        });
    }

    #[tokio::test]
    async fn returns_at_most_limit_relevant_hits_in_descending_order() {
        let store = Arc::new(MemoryStore::new(DIMENSION, THRESHOLD));
        for i in 0..10 {
            let name = format!("relevant-{i}.txt");
            seed(
                &store,
                &name,
                "Rivers carve valleys.",
                vec![1.0, 0.08 * i as f32, 0.0, 0.0],
            );
        }
        for i in 0..3 {
            let name = format!("noise-{i}.txt");
            seed(
                &store,
                &name,
                "Unrelated text.",
                vec![0.1 * i as f32, 1.0, 0.5, 0.0],
            );
        }
        let backend = FakeBackend::new(DIMENSION).with_vector_for("rivers", vec![1.0, 0.0, 0.0, 0.0]);
        let (service, _) = searcher(backend, store);

        let hits = service.search("rivers", 5).await.expect("hits");

        assert_eq!(hits.len(), 5);
        assert!(hits.iter().all(|hit| hit.score >= THRESHOLD));
        assert!(hits.iter().all(|hit| hit.file_name.starts_with("relevant-")));
        assert!(hits.windows(2).all(|pair| pair[0].score >= pair[1].score));
        assert_eq!(hits[0].file_name, "relevant-0.txt");
    }

    #[tokio::test]
    async fn hits_carry_snippet_and_metadata() {
        let store = Arc::new(MemoryStore::new(DIMENSION, 0.0));
        seed(
            &store,
            "fox.txt",
            "The quick brown fox jumps",
            vec![1.0, 1.0, 1.0, 1.0],
        );
        let (service, _) = searcher(FakeBackend::new(DIMENSION), store);

        let hits = service.search("  brown  ", 3).await.expect("hits");

        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.id, "fox.txt-id");
        assert_eq!(hit.file_path, "data/fox.txt");
        assert_eq!(hit.chunk_index, 0);
        assert_eq!(hit.text_snippet, "The quick brown fox jumps");
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected_before_embedding() {
        let store = Arc::new(MemoryStore::new(DIMENSION, 0.0));
        let (service, backend) = searcher(FakeBackend::new(DIMENSION), store);

        for (query, limit) in [("rivers", 0), ("rivers", MAX_SEARCH_LIMIT + 1), (" \n ", 5)] {
            let error = service.search(query, limit).await.unwrap_err();
            assert!(matches!(error, SearchError::Validation(_)), "{query:?}/{limit}");
        }
        assert!(backend.requests().is_empty());

        assert!(service.search("rivers", MAX_SEARCH_LIMIT).await.is_ok());
    }

    #[tokio::test]
    async fn embedding_failures_surface() {
        let store = Arc::new(MemoryStore::new(DIMENSION, 0.0));
        let (service, _) = searcher(FakeBackend::new(DIMENSION).failing_on("boom"), store);

        let error = service.search("boom", 5).await.unwrap_err();
        assert!(matches!(error, SearchError::Embedding(ref inner) if inner.is_backend_failure()));
    }
}
