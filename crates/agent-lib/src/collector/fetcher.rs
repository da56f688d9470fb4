//! HTTP client for the kubelet summary API

use super::{async_trait, NodeFetcher};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Errors from fetching one node's summary. None of these are fatal: the
/// node is skipped for the current tick.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for node {node} failed: {source}")]
    Request {
        node: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("node {node} returned HTTP {status}")]
    Status { node: String, status: StatusCode },

    #[error("invalid summary JSON from node {node}: {source}")]
    Decode {
        node: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot build summary URL for node {node}")]
    Url { node: String },
}

impl FetchError {
    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Request { .. } | FetchError::Status { .. } | FetchError::Url { .. } => {
                "fetch"
            }
            FetchError::Decode { .. } => "decode",
        }
    }
}

/// Configuration for the kubelet client
#[derive(Debug, Clone)]
pub struct KubeletClientConfig {
    /// Base URL of the API server proxy (e.g., "http://localhost:8001")
    pub base_url: String,
    /// Per-request timeout (default: 5 seconds)
    pub timeout: Duration,
}

impl Default for KubeletClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Fetches `GET <base>/api/v1/nodes/<node>/proxy/stats/summary`
#[derive(Clone)]
pub struct KubeletClient {
    client: Client,
    base_url: Url,
}

impl KubeletClient {
    pub fn new(config: &KubeletClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid kubelet URL {}: {}", config.base_url, e))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Kubelet URL {} cannot carry a path", config.base_url);
        }

        Ok(Self { client, base_url })
    }

    /// Summary URL for `node`, with the node name path-escaped
    pub fn summary_url(&self, node: &str) -> Option<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(["api", "v1", "nodes", node, "proxy", "stats", "summary"]);
        Some(url)
    }
}

#[async_trait]
impl NodeFetcher for KubeletClient {
    async fn fetch_summary(&self, node: &str) -> Result<Value, FetchError> {
        let url = self.summary_url(node).ok_or_else(|| FetchError::Url {
            node: node.to_string(),
        })?;

        let request_error = |source| FetchError::Request {
            node: node.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                node: node.to_string(),
                status,
            });
        }

        let body = response.bytes().await.map_err(request_error)?;
        debug!(node = %node, bytes = body.len(), "Fetched node summary");

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            node: node.to_string(),
            source,
        })
    }
}
