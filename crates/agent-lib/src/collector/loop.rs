//! Fixed-cadence polling loop
//!
//! Each tick fetches every configured node in order, writes one sample per
//! container, then sleeps until the next scheduled boundary. Boundaries are
//! computed from the previous boundary rather than from "now", so the loop
//! does not drift; a tick that overruns its slot is followed immediately by
//! the next one.

use super::{container_records, NodeFetcher};
use crate::health::{components, HealthRegistry};
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::store::StoreWriter;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Time source and sleep primitive for the poller
#[async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic time, used for scheduling and durations
    fn now(&self) -> Instant;

    /// Wall-clock time in epoch milliseconds, used as sample scores
    fn epoch_millis(&self) -> i64;

    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by tokio timers
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Drift-free tick boundaries
#[derive(Debug, Clone)]
pub struct Schedule {
    cadence: Duration,
    next: Instant,
}

impl Schedule {
    /// Start a schedule whose first boundary is `start`
    pub fn new(cadence: Duration, start: Instant) -> Self {
        Self {
            cadence,
            next: start,
        }
    }

    /// Advance to the next boundary and return how long to sleep from
    /// `now` to reach it; zero if it has already passed
    pub fn next_delay(&mut self, now: Instant) -> Duration {
        self.next += self.cadence;
        self.next.saturating_duration_since(now)
    }
}

/// Configuration for the poller
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Nodes polled each tick, in order
    pub nodes: Vec<String>,
    /// Only pods in this namespace are sampled (exact match)
    pub namespace: String,
    /// Tick cadence (default: 100 milliseconds)
    pub cadence: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            namespace: "default".to_string(),
            cadence: Duration::from_millis(100),
        }
    }
}

/// Outcome of a single tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Wall-clock capture time used as the score for every write
    pub captured_at_ms: i64,
    pub nodes_ok: usize,
    pub nodes_failed: usize,
    pub samples_written: usize,
    pub write_errors: usize,
    pub elapsed: Duration,
}

/// Polls the configured nodes on a fixed cadence and records samples
pub struct Poller<C: Clock = SystemClock> {
    fetcher: Arc<dyn NodeFetcher>,
    writer: StoreWriter,
    config: PollerConfig,
    clock: C,
    metrics: AgentMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
}

impl<C: Clock> Poller<C> {
    pub fn new(
        fetcher: Arc<dyn NodeFetcher>,
        writer: StoreWriter,
        config: PollerConfig,
        clock: C,
    ) -> Self {
        let metrics = AgentMetrics::new();
        metrics.set_nodes_configured(config.nodes.len() as i64);

        Self {
            fetcher,
            writer,
            config,
            clock,
            metrics,
            logger: StructuredLogger::new("poller"),
            health: None,
        }
    }

    /// Report component health to `registry` after every tick
    pub fn with_health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Run until `shutdown` fires. Shutdown is only observed between ticks;
    /// a tick in progress always completes.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            nodes = self.config.nodes.len(),
            namespace = %self.config.namespace,
            cadence_ms = self.config.cadence.as_millis() as u64,
            "Starting poller"
        );

        let mut schedule = Schedule::new(self.config.cadence, self.clock.now());

        loop {
            let report = self.tick().await;
            self.logger.log_tick(&report);

            let delay = schedule.next_delay(self.clock.now());
            if delay.is_zero() {
                debug!(
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Tick overran cadence, starting next tick immediately"
                );
            }

            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("Shutting down poller");
                    break;
                }
                _ = self.clock.sleep(delay) => {}
            }
        }
    }

    /// Poll every node once
    pub async fn tick(&self) -> TickReport {
        let start = self.clock.now();
        let mut report = TickReport {
            captured_at_ms: self.clock.epoch_millis(),
            ..Default::default()
        };

        for node in &self.config.nodes {
            self.poll_node(node, &mut report).await;
        }

        report.elapsed = self.clock.now().saturating_duration_since(start);
        self.metrics
            .observe_tick_duration(report.elapsed.as_secs_f64());
        self.update_health(&report).await;

        report
    }

    async fn poll_node(&self, node: &str, report: &mut TickReport) {
        let summary = match self.fetcher.fetch_summary(node).await {
            Ok(summary) => summary,
            Err(e) => {
                report.nodes_failed += 1;
                self.metrics.inc_fetch_errors(e.kind());
                warn!(node = %node, kind = e.kind(), error = %e, "Skipping node for this tick");
                return;
            }
        };
        report.nodes_ok += 1;

        for record in container_records(&summary, &self.config.namespace) {
            match self
                .writer
                .write(&record.key, &record.sample, report.captured_at_ms)
                .await
            {
                Ok(member) => {
                    report.samples_written += 1;
                    self.metrics.inc_samples_written();
                    self.logger
                        .log_sample(node, &record.key, &member, report.captured_at_ms);
                }
                Err(e) => {
                    report.write_errors += 1;
                    self.metrics.inc_write_errors();
                    warn!(node = %node, key = %record.key, error = %e, "Failed to write sample");
                }
            }
        }
    }

    async fn update_health(&self, report: &TickReport) {
        let Some(health) = &self.health else {
            return;
        };
        health.record_tick(report.captured_at_ms).await;

        if !self.config.nodes.is_empty() && report.nodes_ok == 0 {
            health
                .set_degraded(components::POLLER, "All node fetches failed")
                .await;
        } else {
            health.set_healthy(components::POLLER).await;
        }

        if report.write_errors > 0 {
            health
                .set_degraded(
                    components::STORE,
                    format!("{} writes failed in last tick", report.write_errors),
                )
                .await;
        } else {
            health.set_healthy(components::STORE).await;
        }
    }
}

/// Builder for creating a poller
pub struct PollerBuilder {
    fetcher: Option<Arc<dyn NodeFetcher>>,
    writer: Option<StoreWriter>,
    config: PollerConfig,
    health: Option<HealthRegistry>,
}

impl PollerBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            fetcher: None,
            writer: None,
            config: PollerConfig::default(),
            health: None,
        }
    }

    /// Set the node summary fetcher
    pub fn fetcher(mut self, fetcher: Arc<dyn NodeFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Set the store writer
    pub fn writer(mut self, writer: StoreWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the nodes polled each tick
    pub fn nodes(mut self, nodes: Vec<String>) -> Self {
        self.config.nodes = nodes;
        self
    }

    /// Set the namespace filter
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Set the tick cadence
    pub fn cadence(mut self, cadence: Duration) -> Self {
        self.config.cadence = cadence;
        self
    }

    /// Set the health registry
    pub fn health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    /// Build the poller on the system clock
    pub fn build(self) -> Result<Poller> {
        self.build_with_clock(SystemClock)
    }

    /// Build the poller on a custom clock
    pub fn build_with_clock<C: Clock>(self, clock: C) -> Result<Poller<C>> {
        let fetcher = self
            .fetcher
            .ok_or_else(|| anyhow::anyhow!("Fetcher is required"))?;
        let writer = self
            .writer
            .ok_or_else(|| anyhow::anyhow!("Store writer is required"))?;

        let poller = Poller::new(fetcher, writer, self.config, clock);
        Ok(match self.health {
            Some(registry) => poller.with_health(registry),
            None => poller,
        })
    }
}

impl Default for PollerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
