use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use super::DayLedger;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-process ledger backing the test suites. Every primitive holds the
/// single map lock for its whole read-modify-write.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a plain value, e.g. an existing counter.
    pub async fn insert(&self, key: &str, value: &str) {
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
    }

    /// Remaining lifetime of `key`, if it exists and has one.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let guard = self.entries.lock().await;
        guard
            .get(key)
            .filter(|e| e.live(now))
            .and_then(|e| e.expires_at)
            .map(|at| at - now)
    }
}

#[async_trait]
impl DayLedger for MemoryLedger {
    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        let now = Instant::now();
        let mut guard = self.entries.lock().await;
        if guard.get(key).is_some_and(|e| e.live(now)) {
            return Ok(false);
        }
        guard.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(now + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(true)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let now = Instant::now();
        let mut guard = self.entries.lock().await;
        let current = match guard.get(key).filter(|e| e.live(now)) {
            Some(entry) => entry
                .value
                .parse::<i64>()
                .map_err(|_| anyhow!("value at {key} is not an integer"))?,
            None => 0,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| anyhow!("increment of {key} would overflow"))?;
        let expires_at = guard
            .get(key)
            .filter(|e| e.live(now))
            .and_then(|e| e.expires_at);
        guard.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let guard = self.entries.lock().await;
        Ok(guard
            .get(key)
            .filter(|e| e.live(now))
            .map(|e| e.value.clone()))
    }
}
