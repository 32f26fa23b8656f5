pub mod redis;

use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

pub const MAX_REQUESTS_PER_DAY: u32 = 3;

/// Counter records self-expire; one live record per (client, day).
pub const COUNTER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Minimal counter capability: read a count, write a count with an expiry.
/// Any key-value store with string get/put-with-expiry semantics can
/// implement this.
#[async_trait::async_trait]
pub trait CounterStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<u32>>;
    async fn put(&self, key: &str, count: u32, ttl: Duration) -> Result<()>;
}

/// Always-permit store for deployments without a counter backend. Selected
/// at startup so the gate logic stays free of null-checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnlimitedStore;

#[async_trait::async_trait]
impl CounterStore for UnlimitedStore {
    async fn get(&self, _key: &str) -> Result<Option<u32>> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _count: u32, _ttl: Duration) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Exhausted,
}

/// Per-client daily request ceiling, keyed on the UTC calendar day.
#[derive(Clone)]
pub struct QuotaGate {
    store: Arc<dyn CounterStore>,
    max_per_day: u32,
}

impl QuotaGate {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            max_per_day: MAX_REQUESTS_PER_DAY,
        }
    }

    pub fn key_for(client_id: &str, day: NaiveDate) -> String {
        format!("rate_limit:{client_id}:{day}")
    }

    /// Read-check-increment. The read and the write are two separate store
    /// operations; concurrent requests for one client may both observe the
    /// pre-increment count, allowing limited over-admission. Store failures
    /// never block the request (fail-open).
    pub async fn admit(&self, client_id: &str, day: NaiveDate) -> Admission {
        let key = Self::key_for(client_id, day);

        let count = match self.store.get(&key).await {
            Ok(count) => count.unwrap_or(0),
            Err(err) => {
                tracing::warn!(%key, error = %err, "counter store read failed; skipping rate limit");
                return Admission::Allowed;
            }
        };

        if count >= self.max_per_day {
            return Admission::Exhausted;
        }

        // Best-effort: a lost increment under-counts, it never blocks.
        if let Err(err) = self.store.put(&key, count + 1, COUNTER_TTL).await {
            tracing::warn!(%key, error = %err, "counter store write failed; continuing without increment");
        }

        Admission::Allowed
    }
}
