//! Indexing orchestrator: files on disk to idempotent Qdrant points.
//!
//! Each file runs through `Reading -> Embedding -> Upserting(i)`. Chunk ids are derived from the
//! file name and chunk position, and a chunk the store already holds is skipped, so re-running a
//! pass over unchanged files writes nothing. Directory passes isolate failures per file.

use crate::{
    embedding::EmbeddingClient,
    metrics::IndexingMetrics,
    processing::{
        cancel::CancellationToken,
        identity::chunk_id,
        types::{
            DirectoryReport, FileFailure, FileReport, IndexingCause, IndexingError, IndexingStage,
        },
    },
    qdrant::{Document, DocumentMetadata, VectorStore},
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Target reported for failures that happen before the per-file loop.
pub const DIRECTORY_TARGET: &str = "directory";

/// Coordinates chunking, embedding, identity, and the vector store for files and directories.
pub struct IndexingService {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    metrics: Arc<IndexingMetrics>,
}

impl IndexingService {
    /// Wire the orchestrator to its collaborators.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        metrics: Arc<IndexingMetrics>,
    ) -> Self {
        Self {
            embedder,
            store,
            metrics,
        }
    }

    /// Index every `.txt` file under `dir`, recursively and in path order.
    ///
    /// A failing file is logged and recorded in the report; the pass moves on to the next file.
    /// Only collection setup and enumeration failures fail the call as a whole. A missing
    /// directory is not an error and produces an empty report.
    pub async fn index_directory(
        &self,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<DirectoryReport, IndexingError> {
        tracing::info!(directory = %dir.display(), "Starting directory indexing");

        self.store.ensure_collection().await.map_err(|error| {
            IndexingError::new(DIRECTORY_TARGET, IndexingStage::CollectionSetup, error)
        })?;

        match tokio::fs::try_exists(dir).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(directory = %dir.display(), "Directory does not exist; nothing to index");
                return Ok(DirectoryReport::default());
            }
            Err(error) => {
                return Err(IndexingError::new(
                    DIRECTORY_TARGET,
                    IndexingStage::Enumerating,
                    error,
                ));
            }
        }

        let files = discover_text_files(dir).await?;
        tracing::info!(directory = %dir.display(), files = files.len(), "Discovered text files");

        let mut report = DirectoryReport {
            files_found: files.len(),
            ..DirectoryReport::default()
        };

        for path in files {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match self.index_file(&path, cancel).await {
                Ok(file) => report.indexed.push(file),
                Err(error) if error.is_cancelled() => {
                    report.cancelled = true;
                    break;
                }
                Err(error) => {
                    tracing::error!(
                        file = %path.display(),
                        stage = %error.stage(),
                        backend_failure = error.is_backend_failure(),
                        error = %error,
                        "Failed to index file; continuing with the next one"
                    );
                    report.failures.push(FileFailure {
                        file_path: path,
                        error,
                    });
                }
            }
        }

        if report.cancelled {
            tracing::warn!(
                directory = %dir.display(),
                indexed = report.indexed.len(),
                remaining = report.files_found - report.indexed.len() - report.failures.len(),
                "Directory indexing cancelled"
            );
        } else {
            tracing::info!(
                directory = %dir.display(),
                indexed = report.indexed.len(),
                failed = report.failures.len(),
                inserted = report.inserted(),
                skipped = report.skipped(),
                "Directory indexing completed"
            );
        }
        Ok(report)
    }

    /// Index a single file, skipping chunks the store already holds.
    ///
    /// Any failure aborts the file's remaining chunks. Chunks written before the failure stay in
    /// the store and are skipped on the next run.
    pub async fn index_file(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<FileReport, IndexingError> {
        let result = self.index_file_inner(path, cancel).await;
        match &result {
            Ok(report) => self
                .metrics
                .record_file(report.inserted as u64, report.skipped as u64),
            Err(error) if error.is_cancelled() => {}
            Err(_) => self.metrics.record_failure(),
        }
        result
    }

    async fn index_file_inner(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<FileReport, IndexingError> {
        let file_name = file_name_of(path);
        let file_path = path.display().to_string();

        if cancel.is_cancelled() {
            return Err(IndexingError::new(
                &file_name,
                IndexingStage::Pending,
                IndexingCause::Cancelled,
            ));
        }

        tracing::debug!(file = %file_path, "Reading file");
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|error| IndexingError::new(&file_name, IndexingStage::Reading, error))?;
        if content.trim().is_empty() {
            return Err(IndexingError::new(
                &file_name,
                IndexingStage::Reading,
                IndexingCause::EmptyFile,
            ));
        }

        let chunks = self
            .embedder
            .embed_chunks(&content)
            .await
            .map_err(|error| IndexingError::new(&file_name, IndexingStage::Embedding, error))?;
        let chunk_count = chunks.len();
        tracing::debug!(file = %file_path, chunks = chunk_count, "Embedded file chunks");

        let mut inserted = 0;
        let mut skipped = 0;
        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            let stage = IndexingStage::Upserting { chunk_index };
            if cancel.is_cancelled() {
                return Err(IndexingError::new(
                    &file_name,
                    stage,
                    IndexingCause::Cancelled,
                ));
            }

            let id = chunk_id(&file_name, chunk_index).to_string();
            let present = self
                .store
                .exists(&id)
                .await
                .map_err(|error| IndexingError::new(&file_name, stage, error))?;
            if present {
                tracing::debug!(file = %file_path, chunk_index, point_id = %id, "Chunk already indexed; skipping");
                skipped += 1;
                continue;
            }

            let document = Document {
                id,
                vector: chunk.embedding,
                metadata: DocumentMetadata {
                    text: chunk.text,
                    file_name: file_name.clone(),
                    file_path: file_path.clone(),
                    chunk_index,
                },
            };
            self.store
                .upsert(document)
                .await
                .map_err(|error| IndexingError::new(&file_name, stage, error))?;
            inserted += 1;
        }

        tracing::info!(
            file = %file_path,
            chunks = chunk_count,
            inserted,
            skipped,
            "File indexed"
        );
        Ok(FileReport {
            file_name,
            file_path,
            chunk_count,
            inserted,
            skipped,
        })
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("txt"))
}

async fn discover_text_files(dir: &Path) -> Result<Vec<PathBuf>, IndexingError> {
    let root = dir.to_path_buf();
    let walked = tokio::task::spawn_blocking(move || collect_text_files(&root)).await;
    match walked {
        Ok(result) => result.map_err(|error| {
            IndexingError::new(DIRECTORY_TARGET, IndexingStage::Enumerating, error)
        }),
        Err(join) => Err(IndexingError::new(
            DIRECTORY_TARGET,
            IndexingStage::Enumerating,
            io::Error::other(join),
        )),
    }
}

fn collect_text_files(root: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_text_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
