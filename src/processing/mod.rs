//! Document processing pipeline: chunking, identity, indexing, and search orchestration.

mod cancel;
pub mod chunking;
pub mod identity;
pub mod indexer;
pub mod search;
mod service;
pub mod snippet;
pub mod types;

pub use cancel::CancellationToken;
pub use indexer::IndexingService;
pub use search::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT, SearchService};
pub use service::{ProcessingApi, ProcessingService};
pub use types::{
    ChunkingError, DirectoryReport, FileFailure, FileReport, IndexingCause, IndexingError,
    IndexingStage, SearchError, SearchHit, ServiceInitError, UploadError, UploadOutcome,
};
