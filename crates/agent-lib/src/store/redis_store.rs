//! Redis-backed sorted-set store

use super::{SortedSetStore, StoreError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};
use url::Url;

/// Connection settings for the store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            username: None,
            password: None,
        }
    }
}

impl StoreConfig {
    /// `host:port`, used in diagnostics
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connection URL including credentials and database index
    pub fn url(&self) -> Result<Url, StoreError> {
        let invalid = |reason: String| StoreError::Address {
            addr: self.addr(),
            reason,
        };

        let mut url = Url::parse(&format!("redis://{}/{}", self.addr(), self.db))
            .map_err(|e| invalid(e.to_string()))?;

        if let Some(username) = self.username.as_deref() {
            url.set_username(username)
                .map_err(|_| invalid("username not allowed".to_string()))?;
        }
        if let Some(password) = self.password.as_deref() {
            url.set_password(Some(password))
                .map_err(|_| invalid("password not allowed".to_string()))?;
        }

        Ok(url)
    }
}

/// Sorted-set store on a shared, auto-reconnecting Redis connection
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect and verify the server answers `PING`.
    ///
    /// Any failure here is fatal for the caller: the agent cannot run
    /// without a store.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let addr = config.addr();
        let url = config.url()?;

        let client = redis::Client::open(url.as_str()).map_err(|source| StoreError::Connection {
            addr: addr.clone(),
            source,
        })?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|source| StoreError::Connection {
                addr: addr.clone(),
                source,
            })?;

        let store = Self { conn };
        store.ping().await.map_err(|e| match e {
            StoreError::Command(source) => StoreError::Connection {
                addr: addr.clone(),
                source,
            },
            other => other,
        })?;

        info!(addr = %addr, db = config.db, "Connected to sorted-set store");
        Ok(store)
    }
}

#[async_trait]
impl SortedSetStore for RedisStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn scan_keys(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<String>), StoreError> {
        let mut conn = self.conn.clone();
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;
        debug!(cursor, next, keys = keys.len(), "Scanned key page");
        Ok((next, keys))
    }

    async fn zrange_from_score(
        &self,
        key: &str,
        min: f64,
        count: usize,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let mut conn = self.conn.clone();
        let entries: Vec<(String, f64)> = conn
            .zrangebyscore_limit_withscores(key, min, "+inf", 0, count as isize)
            .await?;
        Ok(entries)
    }
}
