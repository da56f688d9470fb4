//! Streaming export of recorded series

use agent_lib::store::{CsvSink, ExportSummary, JsonLinesSink, Scanner, SortedSetStore};
use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;

use crate::output::print_success;

/// Export file format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FileFormat {
    /// Comma-separated values with a header row
    #[default]
    Csv,
    /// One JSON object per line
    Jsonl,
}

/// Write every sample under keys matching `pattern` to `path`
pub async fn export_series(
    store: Arc<dyn SortedSetStore>,
    pattern: &str,
    path: &str,
    format: FileFormat,
) -> Result<()> {
    let summary = export_to_file(store, pattern, path, format).await?;

    print_success(&format!(
        "Wrote {} rows from {} keys to {} (pattern: {})",
        summary.rows, summary.keys, path, pattern
    ));
    Ok(())
}

pub async fn export_to_file(
    store: Arc<dyn SortedSetStore>,
    pattern: &str,
    path: &str,
    format: FileFormat,
) -> Result<ExportSummary> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
    let writer = BufWriter::new(file);
    let scanner = Scanner::new(store);

    let summary = match format {
        FileFormat::Csv => {
            let mut sink = CsvSink::new(writer)?;
            scanner.export(pattern, &mut sink).await?
        }
        FileFormat::Jsonl => {
            let mut sink = JsonLinesSink::new(writer);
            scanner.export(pattern, &mut sink).await?
        }
    };

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_lib::store::MemoryStore;
    use tempfile::TempDir;

    async fn seeded_store() -> Arc<dyn SortedSetStore> {
        let store = MemoryStore::new();
        store
            .zadd("util:web:nginx", "cpu_cores=0.500000, logs_bytes=10", 1_000.0)
            .await
            .unwrap();
        store
            .zadd("util:web:nginx", "cpu_cores=0.250000, logs_bytes=20", 2_000.0)
            .await
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_export_csv_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.csv");
        let path = path.to_str().unwrap();

        let summary = export_to_file(seeded_store().await, "util:*", path, FileFormat::Csv)
            .await
            .unwrap();

        assert_eq!(summary.rows, 2);
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("key,pod,container,timestamp_ms"));
        assert!(lines[1].starts_with("util:web:nginx,web,nginx,1000,"));
    }

    #[tokio::test]
    async fn test_export_jsonl_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.jsonl");
        let path = path.to_str().unwrap();

        export_to_file(seeded_store().await, "util:*", path, FileFormat::Jsonl)
            .await
            .unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        let first: serde_json::Value =
            serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(first["container"], "nginx");
        assert_eq!(first["logs_bytes"], 10.0);
        assert!(first["rss_kb"].is_null());
    }

    #[tokio::test]
    async fn test_export_no_matches_writes_header_only() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.csv");
        let path = path.to_str().unwrap();

        let summary = export_to_file(seeded_store().await, "nothing:*", path, FileFormat::Csv)
            .await
            .unwrap();

        assert_eq!(summary, ExportSummary::default());
        assert_eq!(std::fs::read_to_string(path).unwrap().lines().count(), 1);
    }
}
