//! Series listing

use agent_lib::store::{Scanner, SortedSetStore};
use anyhow::Result;
use std::sync::Arc;
use tabled::Tabled;

use crate::output::{print_info, print_table, OutputFormat};

#[derive(Tabled, serde::Serialize)]
struct KeyRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Pod")]
    pod: String,
    #[tabled(rename = "Container")]
    container: String,
}

/// List routing keys matching `pattern`
pub async fn list_keys(
    store: Arc<dyn SortedSetStore>,
    pattern: &str,
    format: OutputFormat,
) -> Result<()> {
    let keys = Scanner::new(store).list_keys(pattern).await?;

    let rows: Vec<KeyRow> = keys
        .iter()
        .map(|key| {
            let (pod, container) = key.split();
            KeyRow {
                key: key.to_string(),
                pod: pod.to_string(),
                container: container.to_string(),
            }
        })
        .collect();

    print_table(&rows, format);
    if matches!(format, OutputFormat::Table) && !rows.is_empty() {
        print_info(&format!("{} series match {}", rows.len(), pattern));
    }
    Ok(())
}
