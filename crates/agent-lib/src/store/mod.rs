//! Sorted-set storage for recorded samples
//!
//! Each container series lives in one sorted set keyed by its routing key.
//! Members are encoded sample lines, scores are capture times in epoch
//! milliseconds. Inserting a member that already exists only moves its
//! score, so two identical consecutive samples leave a single entry.

#[cfg(any(test, feature = "test-util"))]
mod memory;
mod redis_store;
mod scanner;
mod sink;
mod writer;

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;
pub use redis_store::{RedisStore, StoreConfig};
pub use scanner::{ExportSummary, ScanError, Scanner, DEFAULT_PAGE_SIZE};
pub use sink::{CsvSink, JsonLinesSink, RowSink, SinkError};
pub use writer::StoreWriter;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a sorted-set store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot connect to store at {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: ::redis::RedisError,
    },

    #[error("invalid store address {addr}: {reason}")]
    Address { addr: String, reason: String },

    #[error("store command failed: {0}")]
    Command(#[from] ::redis::RedisError),
}

/// Minimal sorted-set protocol used by the writer and the scanner
#[async_trait]
pub trait SortedSetStore: Send + Sync {
    /// Round-trip check used at startup
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert `member` under `key` with `score`, replacing the score if
    /// the member already exists
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError>;

    /// One step of a cursor-based key scan. A returned cursor of `0`
    /// means the scan is complete. `count` is a hint, not a limit.
    async fn scan_keys(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<String>), StoreError>;

    /// Up to `count` members scored at or above `min`, with their scores,
    /// ascending by score and then by member
    async fn zrange_from_score(
        &self,
        key: &str,
        min: f64,
        count: usize,
    ) -> Result<Vec<(String, f64)>, StoreError>;
}
