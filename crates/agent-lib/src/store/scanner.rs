//! Read side: streams stored series back out as flat rows

use super::{RowSink, SinkError, SortedSetStore, StoreError};
use crate::codec;
use crate::models::{FlatRow, RoutingKey};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Keys per SCAN step and members per ZRANGE page
pub const DEFAULT_PAGE_SIZE: usize = 500;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Counts from one export pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub keys: usize,
    pub rows: usize,
}

/// Walks keys matching a pattern and decodes every member.
///
/// Memory use is bounded by one page of keys and one page of members;
/// rows go to the sink as soon as they are decoded. SCAN may report a key
/// more than once, in which case its rows are emitted again.
pub struct Scanner {
    store: Arc<dyn SortedSetStore>,
    page_size: usize,
}

impl Scanner {
    pub fn new(store: Arc<dyn SortedSetStore>) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Export every key matching `pattern` into `sink`
    pub async fn export<S: RowSink + ?Sized>(
        &self,
        pattern: &str,
        sink: &mut S,
    ) -> Result<ExportSummary, ScanError> {
        let mut summary = ExportSummary::default();
        let mut cursor = 0u64;

        loop {
            let (next, keys) = self
                .store
                .scan_keys(pattern, cursor, self.page_size)
                .await?;

            for key in keys {
                let key = RoutingKey::from_raw(key);
                summary.rows += self.export_key(&key, sink).await?;
                summary.keys += 1;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        sink.flush()?;
        info!(
            pattern = %pattern,
            keys = summary.keys,
            rows = summary.rows,
            "Export complete"
        );
        Ok(summary)
    }

    /// Export one series in ascending score order, returning the row count.
    ///
    /// Pages follow a score cursor rather than ranks. The agent may re-add
    /// an identical member while we read, which moves it to a newer score;
    /// with rank paging that shifts every later member back by one and a
    /// row would be skipped. A moved member is emitted again at its new
    /// score.
    pub async fn export_key<S: RowSink + ?Sized>(
        &self,
        key: &RoutingKey,
        sink: &mut S,
    ) -> Result<usize, ScanError> {
        let mut rows = 0usize;
        let mut floor = f64::NEG_INFINITY;
        // Members already emitted at exactly `floor`
        let mut at_floor: HashSet<String> = HashSet::new();

        loop {
            let limit = self.page_size + at_floor.len();
            let entries = self
                .store
                .zrange_from_score(key.as_str(), floor, limit)
                .await?;
            let fetched = entries.len();

            for (member, score) in entries {
                if score == floor && at_floor.contains(&member) {
                    continue;
                }
                let row = FlatRow::new(key, score as i64, codec::decode(&member));
                sink.write_row(&row)?;
                rows += 1;

                if score > floor {
                    floor = score;
                    at_floor.clear();
                }
                at_floor.insert(member);
            }

            if fetched < limit {
                break;
            }
        }

        debug!(key = %key, rows, "Exported series");
        Ok(rows)
    }

    /// Collect routing keys matching `pattern`
    pub async fn list_keys(&self, pattern: &str) -> Result<Vec<RoutingKey>, StoreError> {
        let mut keys = Vec::new();
        let mut cursor = 0u64;

        loop {
            let (next, page) = self
                .store
                .scan_keys(pattern, cursor, self.page_size)
                .await?;
            keys.extend(page.into_iter().map(RoutingKey::from_raw));
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that re-adds one member at a newer score right before the
    /// second page is read, as the agent does when a sample repeats
    struct RewritingStore {
        inner: MemoryStore,
        reads: AtomicUsize,
        member: String,
        new_score: f64,
    }

    #[async_trait]
    impl SortedSetStore for RewritingStore {
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
            self.inner.zadd(key, member, score).await
        }

        async fn scan_keys(
            &self,
            pattern: &str,
            cursor: u64,
            count: usize,
        ) -> Result<(u64, Vec<String>), StoreError> {
            self.inner.scan_keys(pattern, cursor, count).await
        }

        async fn zrange_from_score(
            &self,
            key: &str,
            min: f64,
            count: usize,
        ) -> Result<Vec<(String, f64)>, StoreError> {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 1 {
                self.inner.zadd(key, &self.member, self.new_score).await?;
            }
            self.inner.zrange_from_score(key, min, count).await
        }
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .zadd("util:web:nginx", "cpu_cores=0.100000, rss_kb=10.00", 2_000.0)
            .await
            .unwrap();
        store
            .zadd("util:web:nginx", "cpu_cores=0.200000, rss_kb=20.00", 1_000.0)
            .await
            .unwrap();
        store
            .zadd("util:db:postgres", "cpu_cores=1.000000", 3_000.0)
            .await
            .unwrap();
        store.zadd("util:broken", "logs_bytes=7", 4_000.0).await.unwrap();
        store.zadd("session:abc", "cpu_cores=9", 5_000.0).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_export_emits_one_row_per_member() {
        let store = seeded_store().await;
        let scanner = Scanner::new(Arc::new(store)).with_page_size(1);
        let mut rows: Vec<FlatRow> = Vec::new();

        let summary = scanner.export("util:*", &mut rows).await.unwrap();

        assert_eq!(summary, ExportSummary { keys: 3, rows: 4 });
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.key.starts_with("util:")));
    }

    #[tokio::test]
    async fn test_export_key_orders_by_score() {
        let store = seeded_store().await;
        let scanner = Scanner::new(Arc::new(store));
        let mut rows: Vec<FlatRow> = Vec::new();

        let count = scanner
            .export_key(&RoutingKey::from_raw("util:web:nginx"), &mut rows)
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(rows[0].timestamp_ms, 1_000);
        assert_eq!(rows[0].cpu_cores, Some(0.2));
        assert_eq!(rows[1].timestamp_ms, 2_000);
        assert_eq!(rows[1].pod, "web");
        assert_eq!(rows[1].container, "nginx");
        assert_eq!(rows[1].mem_usage_kb, None);
    }

    #[tokio::test]
    async fn test_export_malformed_key_has_empty_pod() {
        let store = seeded_store().await;
        let scanner = Scanner::new(Arc::new(store));
        let mut rows: Vec<FlatRow> = Vec::new();

        scanner
            .export_key(&RoutingKey::from_raw("util:broken"), &mut rows)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pod, "");
        assert_eq!(rows[0].container, "");
        assert_eq!(rows[0].logs_bytes, Some(7.0));
    }

    #[tokio::test]
    async fn test_export_key_pages_exactly_on_boundary() {
        let store = MemoryStore::new();
        for i in 0..4 {
            store
                .zadd("util:p:c", &format!("logs_bytes={}", i), i as f64)
                .await
                .unwrap();
        }
        let scanner = Scanner::new(Arc::new(store)).with_page_size(2);
        let mut rows: Vec<FlatRow> = Vec::new();

        let count = scanner
            .export_key(&RoutingKey::from_raw("util:p:c"), &mut rows)
            .await
            .unwrap();

        assert_eq!(count, 4);
        let stamps: Vec<i64> = rows.iter().map(|r| r.timestamp_ms).collect();
        assert_eq!(stamps, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_list_keys() {
        let store = seeded_store().await;
        let scanner = Scanner::new(Arc::new(store));

        let keys = scanner.list_keys("util:*:*").await.unwrap();
        let keys: Vec<&str> = keys.iter().map(RoutingKey::as_str).collect();
        assert_eq!(keys, vec!["util:db:postgres", "util:web:nginx"]);
    }

    #[tokio::test]
    async fn test_export_key_survives_member_moving_between_pages() {
        let inner = MemoryStore::new();
        for i in 0..4 {
            inner
                .zadd("util:p:c", &format!("logs_bytes={}", i), i as f64)
                .await
                .unwrap();
        }
        let store = RewritingStore {
            inner: inner.clone(),
            reads: AtomicUsize::new(0),
            member: "logs_bytes=0".to_string(),
            new_score: 100.0,
        };
        let scanner = Scanner::new(Arc::new(store)).with_page_size(2);
        let mut rows: Vec<FlatRow> = Vec::new();

        scanner
            .export_key(&RoutingKey::from_raw("util:p:c"), &mut rows)
            .await
            .unwrap();

        let stamps: Vec<i64> = rows.iter().map(|r| r.timestamp_ms).collect();
        assert_eq!(stamps, vec![0, 1, 2, 3, 100]);

        // Every entry present after the export was emitted at its final score
        for (member, score) in inner.entries("util:p:c").await {
            assert!(
                rows.iter().any(|r| r.timestamp_ms == score as i64
                    && r.logs_bytes == codec::decode(&member).logs_bytes),
                "missing {} at {}",
                member,
                score
            );
        }
    }

    #[tokio::test]
    async fn test_export_key_pages_through_equal_scores() {
        let store = MemoryStore::new();
        for member in ["rss_kb=1", "rss_kb=2", "rss_kb=3", "rss_kb=4", "rss_kb=5"] {
            store.zadd("util:p:c", member, 7_000.0).await.unwrap();
        }
        store.zadd("util:p:c", "rss_kb=6", 8_000.0).await.unwrap();
        let scanner = Scanner::new(Arc::new(store)).with_page_size(2);
        let mut rows: Vec<FlatRow> = Vec::new();

        let count = scanner
            .export_key(&RoutingKey::from_raw("util:p:c"), &mut rows)
            .await
            .unwrap();

        assert_eq!(count, 6);
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.rss_kb).collect();
        assert_eq!(
            values,
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(6.0)]
        );
    }
}
