//! Core data types and error definitions for the processing pipeline.

use crate::{embedding::EmbeddingError, qdrant::StoreError};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while configuring the text splitter.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Splitting configured an impossible size budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap would prevent the splitter from making progress.
    #[error("chunk overlap {overlap} must be smaller than chunk size {max_size}")]
    InvalidOverlap {
        /// Requested overlap in characters.
        overlap: usize,
        /// Requested chunk size in characters.
        max_size: usize,
    },
}

/// Stage of an indexing run at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexingStage {
    /// Ensuring the Qdrant collection exists before a directory pass.
    CollectionSetup,
    /// Enumerating text files under the target directory.
    Enumerating,
    /// Waiting to start work on a file.
    Pending,
    /// Reading file contents from disk.
    Reading,
    /// Splitting the text and embedding each chunk.
    Embedding,
    /// Checking and writing a single chunk.
    Upserting {
        /// Zero-based position of the chunk within its file.
        chunk_index: usize,
    },
}

impl fmt::Display for IndexingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CollectionSetup => f.write_str("collection setup"),
            Self::Enumerating => f.write_str("enumerating files"),
            Self::Pending => f.write_str("pending"),
            Self::Reading => f.write_str("reading"),
            Self::Embedding => f.write_str("embedding"),
            Self::Upserting { chunk_index } => write!(f, "upserting chunk {chunk_index}"),
        }
    }
}

/// Underlying reason an indexing run failed.
#[derive(Debug, Error)]
pub enum IndexingCause {
    /// The file contained no text to index.
    #[error("file is empty")]
    EmptyFile,
    /// Reading from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Walking the directory tree failed.
    #[error("directory enumeration failed: {0}")]
    Enumeration(#[from] walkdir::Error),
    /// The embedding pipeline rejected the text or the backend failed.
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Qdrant rejected a collection, existence, or upsert call.
    #[error("{0}")]
    Store(#[from] StoreError),
    /// A cancellation request stopped the run.
    #[error("indexing was cancelled")]
    Cancelled,
}

/// Errors emitted by the indexing orchestrator.
#[derive(Debug, Error)]
pub enum IndexingError {
    /// Indexing a file, or a directory pass as a whole, failed.
    #[error("Failed to index {target} while {stage}: {cause}")]
    Failed {
        /// File name, or `"directory"` for failures before the per-file loop.
        target: String,
        /// Stage the run had reached.
        stage: IndexingStage,
        /// Underlying failure.
        #[source]
        cause: IndexingCause,
    },
}

impl IndexingError {
    pub(crate) fn new(
        target: impl Into<String>,
        stage: IndexingStage,
        cause: impl Into<IndexingCause>,
    ) -> Self {
        Self::Failed {
            target: target.into(),
            stage,
            cause: cause.into(),
        }
    }

    /// File name (or `"directory"`) the failure belongs to.
    pub fn target(&self) -> &str {
        match self {
            Self::Failed { target, .. } => target,
        }
    }

    /// Stage at which the failure happened.
    pub fn stage(&self) -> IndexingStage {
        match self {
            Self::Failed { stage, .. } => *stage,
        }
    }

    /// Underlying failure.
    pub fn cause(&self) -> &IndexingCause {
        match self {
            Self::Failed { cause, .. } => cause,
        }
    }

    /// Whether the upstream embedding backend caused the failure.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self.cause(), IndexingCause::Embedding(error) if error.is_backend_failure())
    }

    /// Whether the run stopped because of a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.cause(), IndexingCause::Cancelled)
    }
}

/// Outcome of indexing a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// File name used to derive chunk identifiers.
    pub file_name: String,
    /// Path the file was read from.
    pub file_path: String,
    /// Number of chunks produced from the file.
    pub chunk_count: usize,
    /// Chunks written to the store during this run.
    pub inserted: usize,
    /// Chunks skipped because the store already held them.
    pub skipped: usize,
}

/// A file that failed during a directory pass.
#[derive(Debug)]
pub struct FileFailure {
    /// Path of the failing file.
    pub file_path: PathBuf,
    /// Reason the file could not be indexed.
    pub error: IndexingError,
}

/// Outcome of a directory-wide indexing pass.
#[derive(Debug, Default)]
pub struct DirectoryReport {
    /// Number of text files discovered under the directory.
    pub files_found: usize,
    /// Files indexed successfully, in processing order.
    pub indexed: Vec<FileReport>,
    /// Files that failed; the pass continued past each of them.
    pub failures: Vec<FileFailure>,
    /// Whether the pass stopped early because of a cancellation request.
    pub cancelled: bool,
}

impl DirectoryReport {
    /// Total chunks written across all indexed files.
    pub fn inserted(&self) -> usize {
        self.indexed.iter().map(|file| file.inserted).sum()
    }

    /// Total chunks skipped across all indexed files.
    pub fn skipped(&self) -> usize {
        self.indexed.iter().map(|file| file.skipped).sum()
    }
}

/// Errors emitted while orchestrating similarity searches.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The caller supplied an unusable query or limit.
    #[error("Invalid search request: {0}")]
    Validation(String),
    /// Embedding the query failed.
    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Qdrant search request returned an error response.
    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Structured search hit returned to API consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Point identifier assigned at indexing time.
    pub id: String,
    /// Similarity score reported by Qdrant.
    pub score: f32,
    /// Name of the source file.
    pub file_name: String,
    /// Path of the source file.
    pub file_path: String,
    /// Position of the chunk within its file.
    pub chunk_index: usize,
    /// Excerpt of the chunk near the query match.
    pub text_snippet: String,
}

/// Errors emitted while storing and indexing an uploaded file.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The name is empty or contains path components.
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
    /// Only `.txt` uploads are accepted.
    #[error("Invalid file type: {0}. Only .txt files are allowed.")]
    InvalidFileType(String),
    /// The upload carried no content.
    #[error("No file uploaded or file is empty")]
    EmptyFile,
    /// The upload is not valid UTF-8 text.
    #[error("Uploaded file is not valid UTF-8 text")]
    InvalidEncoding,
    /// A file with the same name is already stored.
    #[error("File already exists: {0}")]
    AlreadyExists(String),
    /// Writing the upload to disk failed.
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
    /// The stored file could not be indexed.
    #[error(transparent)]
    Indexing(#[from] IndexingError),
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    /// Where the upload was stored.
    pub file_path: String,
    /// Indexing outcome for the stored file.
    pub report: FileReport,
}

/// Errors raised while wiring the service from configuration.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// Text splitter settings were invalid.
    #[error("Invalid chunking settings: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding backend could not be constructed.
    #[error("Failed to initialize embedding backend: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Qdrant client could not be constructed.
    #[error("Failed to initialize Qdrant client: {0}")]
    Store(#[from] StoreError),
}
