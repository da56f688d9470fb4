//! Turns a node summary document into per-container samples

use crate::extract::{extract_array, extract_f64, extract_label};
use crate::models::{ContainerRecord, ContainerSample, RoutingKey, UNKNOWN_CONTAINER};
use serde_json::Value;
use tracing::debug;

const NANOS_PER_SEC: f64 = 1e9;
const BYTES_PER_KB: f64 = 1024.0;

/// Build a sample from one container entry, converting units
pub fn container_sample(container: &Value) -> ContainerSample {
    ContainerSample {
        cpu_cores: extract_f64(container, &["cpu", "usageNanoCores"]) / NANOS_PER_SEC,
        cpu_time_sec: extract_f64(container, &["cpu", "usageCoreNanoSeconds"]) / NANOS_PER_SEC,
        mem_usage_kb: extract_f64(container, &["memory", "usageBytes"]) / BYTES_PER_KB,
        mem_working_kb: extract_f64(container, &["memory", "workingSetBytes"]) / BYTES_PER_KB,
        rss_kb: extract_f64(container, &["memory", "rssBytes"]) / BYTES_PER_KB,
        logs_bytes: extract_f64(container, &["logs", "usedBytes"]),
        rootfs_bytes: extract_f64(container, &["rootfs", "usedBytes"]),
    }
}

/// Walk `summary.pods[*].containers[*]`, keeping pods whose namespace
/// equals `namespace` exactly.
///
/// Malformed entries are skipped individually; they never affect their
/// siblings.
pub fn container_records(summary: &Value, namespace: &str) -> Vec<ContainerRecord> {
    let mut records = Vec::new();

    for pod in extract_array(summary, "pods") {
        if !pod.is_object() {
            debug!("Skipping non-object pod entry");
            continue;
        }

        let pod_ref = pod.get("podRef");
        // A present but non-string namespace never matches the filter
        let pod_namespace = match pod_ref.and_then(|r| r.get("namespace")) {
            None => Some(""),
            Some(value) => value.as_str(),
        };
        if pod_namespace != Some(namespace) {
            continue;
        }
        let pod_name = pod_ref
            .and_then(|r| extract_label(r, "name"))
            .unwrap_or_default();

        for container in extract_array(pod, "containers") {
            if !container.is_object() {
                debug!(pod = %pod_name, "Skipping non-object container entry");
                continue;
            }

            let container_name =
                extract_label(container, "name").unwrap_or_else(|| UNKNOWN_CONTAINER.to_string());

            records.push(ContainerRecord {
                key: RoutingKey::new(&pod_name, &container_name),
                namespace: namespace.to_string(),
                sample: container_sample(container),
            });
        }
    }

    records
}
