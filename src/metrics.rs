use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing indexing activity.
#[derive(Default)]
pub struct IndexingMetrics {
    files_indexed: AtomicU64,
    file_failures: AtomicU64,
    chunks_upserted: AtomicU64,
    chunks_skipped: AtomicU64,
}

impl IndexingMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fully processed file and how its chunks were applied.
    pub fn record_file(&self, upserted: u64, skipped: u64) {
        self.files_indexed.fetch_add(1, Ordering::Relaxed);
        self.chunks_upserted.fetch_add(upserted, Ordering::Relaxed);
        self.chunks_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    /// Record a file whose indexing failed.
    pub fn record_failure(&self) {
        self.file_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_indexed: self.files_indexed.load(Ordering::Relaxed),
            file_failures: self.file_failures.load(Ordering::Relaxed),
            chunks_upserted: self.chunks_upserted.load(Ordering::Relaxed),
            chunks_skipped: self.chunks_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of indexing counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Files indexed without error since startup.
    pub files_indexed: u64,
    /// Files whose indexing failed since startup.
    pub file_failures: u64,
    /// Chunks written to the vector store.
    pub chunks_upserted: u64,
    /// Chunks skipped because the store already held them.
    pub chunks_skipped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_files_and_chunks() {
        let metrics = IndexingMetrics::new();
        metrics.record_file(2, 0);
        metrics.record_file(1, 3);
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.files_indexed, 2);
        assert_eq!(snapshot.file_failures, 1);
        assert_eq!(snapshot.chunks_upserted, 3);
        assert_eq!(snapshot.chunks_skipped, 3);
    }

    #[test]
    fn snapshot_starts_empty() {
        assert_eq!(IndexingMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
