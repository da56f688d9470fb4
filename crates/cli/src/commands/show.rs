//! Single-series view

use agent_lib::models::{FlatRow, RoutingKey};
use agent_lib::store::{Scanner, SortedSetStore};
use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;
use tabled::Tabled;

use crate::output::{format_bytes, format_cores, format_kib, print_table, print_warning, OutputFormat};

/// Row for the series table
#[derive(Tabled, serde::Serialize)]
struct SampleRow {
    #[tabled(rename = "Time (UTC)")]
    time: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "CPU Time")]
    cpu_time: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Working Set")]
    working_set: String,
    #[tabled(rename = "RSS")]
    rss: String,
    #[tabled(rename = "Logs")]
    logs: String,
    #[tabled(rename = "Rootfs")]
    rootfs: String,
}

impl From<&FlatRow> for SampleRow {
    fn from(row: &FlatRow) -> Self {
        Self {
            time: row.timestamp_utc.clone(),
            cpu: format_cores(row.cpu_cores),
            cpu_time: row
                .cpu_time_sec
                .map(|s| format!("{:.2}s", s))
                .unwrap_or_else(|| "-".to_string()),
            memory: format_kib(row.mem_usage_kb),
            working_set: format_kib(row.mem_working_kb),
            rss: format_kib(row.rss_kb),
            logs: format_bytes(row.logs_bytes),
            rootfs: format_bytes(row.rootfs_bytes),
        }
    }
}

/// Show the samples recorded for one pod/container
pub async fn show_series(
    store: Arc<dyn SortedSetStore>,
    pod: &str,
    container: &str,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let key = RoutingKey::new(pod, container);
    let rows = load_series(store, &key, limit).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Table => {
            if rows.is_empty() {
                print_warning(&format!("No samples recorded under {}", key));
                return Ok(());
            }
            println!("{} {}", "Series".bold(), key.to_string().cyan());
            let table_rows: Vec<SampleRow> = rows.iter().map(SampleRow::from).collect();
            print_table(&table_rows, format);
        }
    }

    Ok(())
}

/// Read a series in score order, keeping the last `limit` rows
async fn load_series(
    store: Arc<dyn SortedSetStore>,
    key: &RoutingKey,
    limit: Option<usize>,
) -> Result<Vec<FlatRow>> {
    let mut rows: Vec<FlatRow> = Vec::new();
    Scanner::new(store).export_key(key, &mut rows).await?;

    if let Some(limit) = limit {
        let skip = rows.len().saturating_sub(limit);
        rows.drain(..skip);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_lib::store::MemoryStore;

    #[tokio::test]
    async fn test_load_series_limit_keeps_latest() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .zadd("util:p:c", &format!("cpu_cores={}", i), (i * 100) as f64)
                .await
                .unwrap();
        }

        let rows = load_series(Arc::new(store), &RoutingKey::new("p", "c"), Some(2))
            .await
            .unwrap();

        let stamps: Vec<i64> = rows.iter().map(|r| r.timestamp_ms).collect();
        assert_eq!(stamps, vec![300, 400]);
    }

    #[test]
    fn test_sample_row_placeholders() {
        let row = FlatRow::new(
            &RoutingKey::new("p", "c"),
            0,
            agent_lib::models::DecodedSample {
                cpu_cores: Some(0.25),
                ..Default::default()
            },
        );

        let sample = SampleRow::from(&row);
        assert_eq!(sample.cpu, "250m");
        assert_eq!(sample.cpu_time, "-");
        assert_eq!(sample.rss, "-");
    }
}
