//! Store connection for the CLI

use agent_lib::store::{RedisStore, SortedSetStore, StoreConfig};
use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;

/// Store connection flags, with the same environment names the agent uses
#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// Store host
    #[arg(long, env = "REDIS_HOST", default_value = "127.0.0.1", global = true)]
    pub redis_host: String,

    /// Store port
    #[arg(long, env = "REDIS_PORT", default_value_t = 6379, global = true)]
    pub redis_port: u16,

    /// Store database index
    #[arg(long, env = "REDIS_DB", default_value_t = 0, global = true)]
    pub redis_db: i64,

    /// Store ACL username
    #[arg(long, env = "REDIS_USERNAME", global = true)]
    pub redis_username: Option<String>,

    /// Store password
    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true, global = true)]
    pub redis_password: Option<String>,
}

impl StoreArgs {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            host: self.redis_host.clone(),
            port: self.redis_port,
            db: self.redis_db,
            username: self.redis_username.clone().filter(|u| !u.is_empty()),
            password: self.redis_password.clone().filter(|p| !p.is_empty()),
        }
    }
}

/// Connect to the store described by `args`
pub async fn connect(args: &StoreArgs) -> Result<Arc<dyn SortedSetStore>> {
    let config = args.store_config();
    let store = RedisStore::connect(&config)
        .await
        .with_context(|| format!("Unable to connect to store at {}", config.addr()))?;
    Ok(Arc::new(store))
}
