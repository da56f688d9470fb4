//! Observability infrastructure for the utilization agent
//!
//! Provides:
//! - Prometheus metrics (tick duration, samples written, fetch and write errors)
//! - Structured JSON logging with tracing

use crate::collector::TickReport;
use crate::models::RoutingKey;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for tick duration (in seconds)
const TICK_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

struct AgentMetricsInner {
    tick_duration_seconds: Histogram,
    samples_written: IntCounter,
    fetch_errors: IntCounterVec,
    write_errors: IntCounter,
    nodes_configured: IntGauge,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            tick_duration_seconds: register_histogram!(
                "util_agent_tick_duration_seconds",
                "Time spent polling every configured node once",
                TICK_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_duration_seconds"),

            samples_written: register_int_counter!(
                "util_agent_samples_written_total",
                "Container samples written to the store"
            )
            .expect("Failed to register samples_written"),

            fetch_errors: register_int_counter_vec!(
                "util_agent_fetch_errors_total",
                "Node summary fetches that failed, by kind",
                &["kind"]
            )
            .expect("Failed to register fetch_errors"),

            write_errors: register_int_counter!(
                "util_agent_write_errors_total",
                "Sample writes rejected by the store"
            )
            .expect("Failed to register write_errors"),

            nodes_configured: register_int_gauge!(
                "util_agent_nodes_configured",
                "Number of nodes polled each tick"
            )
            .expect("Failed to register nodes_configured"),
        }
    }
}

/// Agent metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new)
    }

    pub fn observe_tick_duration(&self, duration_secs: f64) {
        self.inner().tick_duration_seconds.observe(duration_secs);
    }

    pub fn inc_samples_written(&self) {
        self.inner().samples_written.inc();
    }

    /// `kind` is "fetch" or "decode"
    pub fn inc_fetch_errors(&self, kind: &str) {
        self.inner().fetch_errors.with_label_values(&[kind]).inc();
    }

    pub fn inc_write_errors(&self) {
        self.inner().write_errors.inc();
    }

    pub fn set_nodes_configured(&self, count: i64) {
        self.inner().nodes_configured.set(count);
    }

    /// Every registered metric family in the Prometheus text format
    pub fn render(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Structured logger for agent events
///
/// Keeps event names and field names consistent across the JSON log.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log agent startup
    pub fn log_startup(&self, version: &str, nodes: &[String], namespace: &str, cadence_ms: u64) {
        info!(
            event = "agent_started",
            instance = %self.instance,
            agent_version = %version,
            nodes = %nodes.join(","),
            namespace = %namespace,
            cadence_ms = cadence_ms,
            "Utilization agent started"
        );
    }

    /// Log agent shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Utilization agent shutting down"
        );
    }

    /// Log the outcome of one tick
    pub fn log_tick(&self, report: &TickReport) {
        if report.nodes_failed > 0 || report.write_errors > 0 {
            warn!(
                event = "tick_completed",
                instance = %self.instance,
                nodes_ok = report.nodes_ok,
                nodes_failed = report.nodes_failed,
                samples = report.samples_written,
                write_errors = report.write_errors,
                elapsed_secs = report.elapsed.as_secs_f64(),
                "Tick completed with errors"
            );
        } else {
            info!(
                event = "tick_completed",
                instance = %self.instance,
                nodes_ok = report.nodes_ok,
                samples = report.samples_written,
                elapsed_secs = report.elapsed.as_secs_f64(),
                "Tick completed"
            );
        }
    }

    /// Log one stored sample
    pub fn log_sample(&self, node: &str, key: &RoutingKey, member: &str, score: i64) {
        debug!(
            event = "sample_written",
            instance = %self.instance,
            node = %node,
            key = %key,
            member = %member,
            score = score,
            "Logged sample to store"
        );
    }
}
