//! Core data models for the utilization recorder

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by every routing key written by the agent
pub const KEY_PREFIX: &str = "util";

/// Container name used when the summary omits one
pub const UNKNOWN_CONTAINER: &str = "unknown";

/// One container's resource counters at a capture instant.
///
/// Every field is always present on the write side; missing source
/// counters are recorded as `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSample {
    pub cpu_cores: f64,
    pub cpu_time_sec: f64,
    pub mem_usage_kb: f64,
    pub mem_working_kb: f64,
    pub rss_kb: f64,
    pub logs_bytes: f64,
    pub rootfs_bytes: f64,
}

impl ContainerSample {
    /// Field values in wire order
    pub fn values(&self) -> [f64; 7] {
        [
            self.cpu_cores,
            self.cpu_time_sec,
            self.mem_usage_kb,
            self.mem_working_kb,
            self.rss_kb,
            self.logs_bytes,
            self.rootfs_bytes,
        ]
    }
}

/// A sample read back from the store. Fields missing from the stored
/// member are `None`, never `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedSample {
    pub cpu_cores: Option<f64>,
    pub cpu_time_sec: Option<f64>,
    pub mem_usage_kb: Option<f64>,
    pub mem_working_kb: Option<f64>,
    pub rss_kb: Option<f64>,
    pub logs_bytes: Option<f64>,
    pub rootfs_bytes: Option<f64>,
}

impl DecodedSample {
    /// Build from values in wire order
    pub fn from_values(values: [Option<f64>; 7]) -> Self {
        let [cpu_cores, cpu_time_sec, mem_usage_kb, mem_working_kb, rss_kb, logs_bytes, rootfs_bytes] =
            values;
        Self {
            cpu_cores,
            cpu_time_sec,
            mem_usage_kb,
            mem_working_kb,
            rss_kb,
            logs_bytes,
            rootfs_bytes,
        }
    }
}

/// Identifies one container's time series: `util:<pod>:<container>`.
///
/// Pod names are not namespaced, so same-named pods in different
/// namespaces share a series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingKey(String);

impl RoutingKey {
    pub fn new(pod_name: &str, container_name: &str) -> Self {
        Self(format!("{}:{}:{}", KEY_PREFIX, pod_name, container_name))
    }

    /// Wrap a key read back from the store as-is
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(pod, container)`.
    ///
    /// Splits on the first two `:` only, so a container segment may itself
    /// contain `:`. Keys with fewer than two separators yield empty strings.
    pub fn split(&self) -> (&str, &str) {
        let mut parts = self.0.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(pod), Some(container)) => (pod, container),
            _ => ("", ""),
        }
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A sample produced by walking a node summary, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRecord {
    pub key: RoutingKey,
    pub namespace: String,
    pub sample: ContainerSample,
}

/// One exported row: a single (key, member, score) entry decoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    pub key: String,
    pub pod: String,
    pub container: String,
    pub timestamp_ms: i64,
    pub timestamp_utc: String,
    pub cpu_cores: Option<f64>,
    pub cpu_time_sec: Option<f64>,
    pub mem_usage_kb: Option<f64>,
    pub mem_working_kb: Option<f64>,
    pub rss_kb: Option<f64>,
    pub logs_bytes: Option<f64>,
    pub rootfs_bytes: Option<f64>,
}

impl FlatRow {
    /// Column order used by tabular exports
    pub const COLUMNS: [&'static str; 12] = [
        "key",
        "pod",
        "container",
        "timestamp_ms",
        "timestamp_utc",
        "cpu_cores",
        "cpu_time_sec",
        "mem_usage_kb",
        "mem_working_kb",
        "rss_kb",
        "logs_bytes",
        "rootfs_bytes",
    ];

    pub fn new(key: &RoutingKey, timestamp_ms: i64, sample: DecodedSample) -> Self {
        let (pod, container) = key.split();
        let timestamp_utc = format_epoch_millis(timestamp_ms);

        Self {
            key: key.as_str().to_string(),
            pod: pod.to_string(),
            container: container.to_string(),
            timestamp_ms,
            timestamp_utc,
            cpu_cores: sample.cpu_cores,
            cpu_time_sec: sample.cpu_time_sec,
            mem_usage_kb: sample.mem_usage_kb,
            mem_working_kb: sample.mem_working_kb,
            rss_kb: sample.rss_kb,
            logs_bytes: sample.logs_bytes,
            rootfs_bytes: sample.rootfs_bytes,
        }
    }
}

/// RFC 3339 UTC rendering of a capture score, millisecond precision with
/// a `Z` suffix. Out-of-range values render as an empty string.
pub fn format_epoch_millis(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|ts| ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_default()
}
