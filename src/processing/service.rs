//! Processing service coordinating uploads, indexing passes, and searches.

use crate::{
    config::Config,
    embedding::{Embedder, EmbeddingClient},
    metrics::{IndexingMetrics, MetricsSnapshot},
    processing::{
        cancel::CancellationToken,
        chunking::TextSplitter,
        indexer::IndexingService,
        search::SearchService,
        types::{
            DirectoryReport, FileReport, IndexingError, IndexingStage, SearchError, SearchHit,
            ServiceInitError, UploadError, UploadOutcome,
        },
    },
    qdrant::{QdrantService, VectorStore},
};
use async_trait::async_trait;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

/// Owns the long-lived pipeline handles shared by the HTTP surface and the CLI.
///
/// Construct the service once near process start and share it through an `Arc`. A single
/// cancellation token covers every indexing pass it starts; cancel it on shutdown.
pub struct ProcessingService {
    indexer: Arc<IndexingService>,
    searcher: SearchService,
    store: Arc<dyn VectorStore>,
    metrics: Arc<IndexingMetrics>,
    data_dir: PathBuf,
    cancel: CancellationToken,
}

/// Abstraction over the pipeline used by external surfaces.
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Rank stored chunks against `query`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError>;

    /// Store an uploaded `.txt` file in the data directory and index it.
    async fn index_upload(
        &self,
        file_name: &str,
        content: &[u8],
    ) -> Result<UploadOutcome, UploadError>;

    /// Start a background pass over the data directory and return the directory.
    fn start_directory_index(&self) -> PathBuf;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ProcessingService {
    /// Wire the service from explicit collaborators.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        let metrics = Arc::new(IndexingMetrics::new());
        let indexer = Arc::new(IndexingService::new(
            embedder.clone(),
            store.clone(),
            metrics.clone(),
        ));
        Self {
            indexer,
            searcher: SearchService::new(embedder, store.clone()),
            store,
            metrics,
            data_dir: data_dir.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Build the embedding backend and Qdrant client described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ServiceInitError> {
        let splitter = TextSplitter::new(
            config.text_splitter_chunk_size,
            config.text_splitter_chunk_overlap,
        )?;
        tracing::info!("Initializing embedding client");
        let embedder = Embedder::from_config(config, splitter)?;
        let store = QdrantService::new(config.store_settings())?;
        tracing::info!(
            collection = %store.collection(),
            data_dir = %config.data_dir.display(),
            "Processing service ready"
        );
        Ok(Self::new(
            Arc::new(embedder),
            Arc::new(store),
            config.data_dir.clone(),
        ))
    }

    /// Directory scanned by indexing passes and receiving uploads.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Token observed by every indexing pass this service runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Rank stored chunks against `query`.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.searcher.search(query, limit).await
    }

    /// Index every `.txt` file under `dir`.
    pub async fn index_directory(&self, dir: &Path) -> Result<DirectoryReport, IndexingError> {
        self.indexer.index_directory(dir, &self.cancel).await
    }

    /// Index one file already on disk.
    pub async fn index_file(&self, path: &Path) -> Result<FileReport, IndexingError> {
        self.indexer.index_file(path, &self.cancel).await
    }

    /// Spawn a directory pass over the data directory on the runtime.
    ///
    /// Passes are not serialized; a concurrent pass re-checks every chunk against the store.
    pub fn spawn_directory_index(&self) -> JoinHandle<()> {
        let indexer = self.indexer.clone();
        let cancel = self.cancel.clone();
        let dir = self.data_dir.clone();
        tokio::spawn(async move {
            match indexer.index_directory(&dir, &cancel).await {
                Ok(report) => tracing::info!(
                    directory = %dir.display(),
                    files = report.files_found,
                    indexed = report.indexed.len(),
                    failed = report.failures.len(),
                    cancelled = report.cancelled,
                    "Background indexing finished"
                ),
                Err(error) => tracing::error!(
                    directory = %dir.display(),
                    error = %error,
                    "Background indexing failed"
                ),
            }
        })
    }

    /// Validate an upload, write it into the data directory, and index it.
    ///
    /// The file is written before indexing starts; if indexing fails the file stays on disk and a
    /// later directory pass picks it up.
    pub async fn index_upload(
        &self,
        file_name: &str,
        content: &[u8],
    ) -> Result<UploadOutcome, UploadError> {
        validate_file_name(file_name)?;
        if content.is_empty() {
            return Err(UploadError::EmptyFile);
        }
        let text = std::str::from_utf8(content).map_err(|_| UploadError::InvalidEncoding)?;
        if text.trim().is_empty() {
            return Err(UploadError::EmptyFile);
        }

        self.store.ensure_collection().await.map_err(|error| {
            IndexingError::new(file_name, IndexingStage::CollectionSetup, error)
        })?;

        tokio::fs::create_dir_all(&self.data_dir).await?;
        let target = self.data_dir.join(file_name);
        let file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                return Err(UploadError::AlreadyExists(file_name.to_string()));
            }
            Err(error) => return Err(error.into()),
        };
        write_upload(&target, file, content).await?;
        tracing::info!(file = %target.display(), bytes = content.len(), "Stored upload");

        let report = self.indexer.index_file(&target, &self.cancel).await?;
        Ok(UploadOutcome {
            file_path: target.display().to_string(),
            report,
        })
    }

    /// Return the current indexing metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl ProcessingApi for ProcessingService {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        ProcessingService::search(self, query, limit).await
    }

    async fn index_upload(
        &self,
        file_name: &str,
        content: &[u8],
    ) -> Result<UploadOutcome, UploadError> {
        ProcessingService::index_upload(self, file_name, content).await
    }

    fn start_directory_index(&self) -> PathBuf {
        drop(self.spawn_directory_index());
        self.data_dir.clone()
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        ProcessingService::metrics_snapshot(self)
    }
}

/// Write `content` through `writer`, removing `target` if the write does not complete.
async fn write_upload<W>(target: &Path, mut writer: W, content: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match writer.write_all(content).await {
        Ok(()) => writer.flush().await,
        Err(error) => Err(error),
    };
    drop(writer);
    if let Err(error) = written {
        if let Err(cleanup) = tokio::fs::remove_file(target).await {
            tracing::warn!(
                file = %target.display(),
                error = %cleanup,
                "Failed to remove partial upload"
            );
        }
        return Err(error);
    }
    Ok(())
}

fn validate_file_name(file_name: &str) -> Result<(), UploadError> {
    let plain = Path::new(file_name)
        .file_name()
        .is_some_and(|name| name == file_name);
    if file_name.trim().is_empty() || !plain || file_name.contains(['/', '\\']) {
        return Err(UploadError::InvalidFileName(file_name.to_string()));
    }

    let is_text = Path::new(file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("txt"));
    if !is_text {
        return Err(UploadError::InvalidFileType(file_name.to_string()));
    }
    Ok(())
}
