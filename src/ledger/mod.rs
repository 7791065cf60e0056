//! Day ledger: the remote key-value store holding the daily sent-marker and
//! the dispatch counter.
//!
//! Callers rely on the store's native primitives for atomicity:
//! - `set_if_absent` must be a single conditional write (`SET NX EX`);
//! - `incr` must be a single atomic increment (`INCR`).
//!
//! No implementation may emulate either with a read followed by a write.

use anyhow::Result;
use async_trait::async_trait;

pub mod memory;
pub mod upstash;

pub use memory::MemoryLedger;
pub use upstash::UpstashLedger;

/// Key of the dispatch counter.
pub const DAY_COUNT_KEY: &str = "dayCount";
/// Lifetime of a daily sent-marker (48 hours).
pub const SENT_MARKER_TTL_SECS: u64 = 172_800;

/// Key of the sent-marker for a calendar date rendered as `YYYY-MM-DD`.
pub fn sent_marker_key(date: &str) -> String {
    format!("sent:{date}")
}

#[async_trait]
pub trait DayLedger: Send + Sync {
    /// Set `key` only if it is absent. Returns `true` when this call created it.
    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool>;

    /// Atomically increment `key` and return the new value. Absent keys start at 0.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Plain read without side effects.
    async fn get(&self, key: &str) -> Result<Option<String>>;
}
