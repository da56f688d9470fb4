//! Agent configuration
//!
//! Read once from the process environment at startup and handed to each
//! component as an immutable value.

use agent_lib::collector::{KubeletClientConfig, PollerConfig};
use agent_lib::store::StoreConfig;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// API server proxy host used to reach kubelets
    #[serde(default = "default_kubelet_host")]
    pub kubelet_host: String,

    #[serde(default = "default_kubelet_port")]
    pub kubelet_port: u16,

    #[serde(default = "default_kubelet_scheme")]
    pub kubelet_scheme: String,

    /// Per-node summary request timeout in milliseconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,

    #[serde(default = "default_redis_host")]
    pub redis_host: String,

    #[serde(default = "default_redis_port")]
    pub redis_port: u16,

    #[serde(default)]
    pub redis_db: i64,

    #[serde(default)]
    pub redis_username: Option<String>,

    #[serde(default)]
    pub redis_password: Option<String>,

    /// Tick cadence in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Only pods in this namespace are sampled
    #[serde(default = "default_namespace_filter")]
    pub namespace_filter: String,

    /// Comma-separated node names (required)
    #[serde(default)]
    pub node_names: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_kubelet_host() -> String {
    "localhost".to_string()
}

fn default_kubelet_port() -> u16 {
    8001
}

fn default_kubelet_scheme() -> String {
    "http".to_string()
}

fn default_fetch_timeout() -> u64 {
    5_000
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_poll_interval() -> u64 {
    100
}

fn default_namespace_filter() -> String {
    "default".to_string()
}

fn default_api_port() -> u16 {
    8080
}

impl AgentConfig {
    /// Load configuration from the environment and validate it
    pub fn load() -> Result<Self> {
        let source = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("Failed to read environment")?;

        Self::from_config(source)
    }

    pub fn from_config(source: config::Config) -> Result<Self> {
        let config: Self = source
            .try_deserialize()
            .context("Invalid agent configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.nodes().is_empty() {
            bail!(
                "Set NODE_NAMES to a comma-separated list of node names \
                 (e.g., NODE_NAMES='node1,node2')"
            );
        }
        if self.poll_interval_ms == 0 {
            bail!("POLL_INTERVAL_MS must be greater than zero");
        }
        Ok(())
    }

    /// Node names in polling order, trimmed, empty entries dropped
    pub fn nodes(&self) -> Vec<String> {
        self.node_names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn kubelet_client_config(&self) -> KubeletClientConfig {
        KubeletClientConfig {
            base_url: format!(
                "{}://{}:{}",
                self.kubelet_scheme, self.kubelet_host, self.kubelet_port
            ),
            timeout: Duration::from_millis(self.fetch_timeout_ms),
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        StoreConfig {
            host: self.redis_host.clone(),
            port: self.redis_port,
            db: self.redis_db,
            username: non_empty(&self.redis_username),
            password: non_empty(&self.redis_password),
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            nodes: self.nodes(),
            namespace: self.namespace_filter.clone(),
            cadence: Duration::from_millis(self.poll_interval_ms),
        }
    }
}
