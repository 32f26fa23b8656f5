use super::CounterStore;
use anyhow::{Context, Result};
use redis::AsyncCommands;
use std::time::Duration;

/// Counter store backed by a Redis-compatible server. Only `GET` and
/// `SET .. EX` are used, so anything with string get/put-with-expiry
/// semantics can stand in.
#[derive(Clone)]
pub struct RedisCounterStore {
    client: redis::Client,
}

impl RedisCounterStore {
    /// Parses the URL only; no connection is made until the first request.
    pub fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid REDIS_URL")?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .context("redis connect failed")
    }
}

#[async_trait::async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> Result<Option<u32>> {
        let mut con = self.connection().await?;
        let stored: Option<String> = con.get(key).await.context("redis GET failed")?;
        // An unparsable value counts as absent rather than poisoning the gate.
        Ok(stored.and_then(|s| s.parse::<u32>().ok()))
    }

    async fn put(&self, key: &str, count: u32, ttl: Duration) -> Result<()> {
        let mut con = self.connection().await?;
        let _: () = con
            .set_ex(key, count.to_string(), ttl.as_secs())
            .await
            .context("redis SET EX failed")?;
        Ok(())
    }
}
