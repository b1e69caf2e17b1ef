use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::Lsn;

/// Write-ahead-log collaborator, kept as a stub so the buffer pool's
/// constructor signature survives the day logging arrives. No records
/// are emitted yet.
#[derive(Debug, Default)]
pub struct LogManager {
    next_lsn: AtomicU64,
}

impl LogManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_lsn(&self) -> Lsn {
        self.next_lsn.fetch_add(1, Ordering::Relaxed)
    }

    /// Ensures all records up to `lsn` are durable. No-op until WAL
    /// emission exists.
    pub fn flush_lsn(&self, _lsn: Lsn) {}
}
