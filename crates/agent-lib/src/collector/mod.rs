//! Metrics collection from kubelet summary endpoints
//!
//! This module fetches `stats/summary` documents per node through the API
//! server proxy, turns them into per-container samples, and drives the
//! fixed-cadence polling loop that writes them to the store.

mod fetcher;
mod processor;
mod r#loop;


pub use fetcher::{FetchError, KubeletClient, KubeletClientConfig};
pub use processor::{container_records, container_sample};
pub use r#loop::{
    Clock, Poller, PollerBuilder, PollerConfig, Schedule, SystemClock, TickReport,
};

pub use async_trait::async_trait;

use serde_json::Value;

/// Source of per-node summary documents
#[async_trait]
pub trait NodeFetcher: Send + Sync {
    /// Fetch the decoded summary for one node
    async fn fetch_summary(&self, node: &str) -> Result<Value, FetchError>;
}
