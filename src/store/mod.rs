//! Slow-query persistence.
//!
//! Entries live in a key-value collaborator under day-partitioned keys
//! (`slow_queries:<YYYY-MM-DD>`, UTC). Each partition is an append-only
//! list, newest first, with its expiry re-armed on every write so the log
//! never outlives the retention window.

pub mod memory;

pub use memory::MemoryStore;

use crate::config::ConfigHandle;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Error type for the key-value collaborator.
#[derive(Debug)]
pub enum StoreError {
    /// Backing store unreachable. Distinct from "no entries".
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Key-value store collaborator.
///
/// Satisfied by any external cache/store offering atomic list append,
/// range reads, key expiry, and set-if-not-exists with TTL. The subsystem
/// depends on this interface only; it implements no storage of its own
/// beyond the in-memory test double in [`memory`].
pub trait KvStore: Send + Sync {
    /// Prepends `value` to the list at `key`. Must be atomic per call.
    fn list_push_front(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Reads list elements from `start` to `stop` inclusive; negative
    /// indices count from the end (`0, -1` reads the whole list).
    fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError>;

    /// (Re)sets the expiry of `key`.
    fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), StoreError>;

    /// Sets `key` to `value` with a TTL only if it does not exist.
    /// Returns `true` when the key was set by this call.
    fn set_nx_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError>;
}

/// One persisted slow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowQueryEntry {
    pub statement_preview: String,
    pub params_preview: String,
    pub duration_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

fn day_key(date: NaiveDate) -> String {
    format!("slow_queries:{}", date.format("%Y-%m-%d"))
}

/// Day-partitioned slow-query log.
#[derive(Clone)]
pub struct SlowQueryStore {
    kv: Arc<dyn KvStore>,
    config: ConfigHandle,
}

impl SlowQueryStore {
    pub fn new(kv: Arc<dyn KvStore>, config: ConfigHandle) -> Self {
        Self { kv, config }
    }

    /// Persists one entry into its UTC day partition.
    ///
    /// Fire-and-forget: this runs downstream of hot query execution, so
    /// every failure is logged at debug level and swallowed.
    pub fn record(&self, entry: &SlowQueryEntry) {
        let payload = match serde_json::to_string(entry) {
            Ok(p) => p,
            Err(err) => {
                debug!("slow query entry not serializable: {}", err);
                return;
            }
        };
        let key = day_key(entry.timestamp.date_naive());
        if let Err(err) = self.kv.list_push_front(&key, &payload) {
            debug!("slow query not persisted: {}", err);
            return;
        }
        let ttl = u64::from(self.config.load().retention_days) * 86_400;
        if let Err(err) = self.kv.expire(&key, ttl) {
            debug!("retention not applied to {}: {}", key, err);
        }
    }

    /// Reads the last `days` partitions, most recent day first.
    ///
    /// Entries come back in store order (newest first within a day);
    /// callers needing global chronological order must sort. A store
    /// outage surfaces as `Err`, never as an empty result.
    pub fn scan(&self, days: u32) -> Result<Vec<SlowQueryEntry>, StoreError> {
        self.scan_at(Utc::now(), days)
    }

    /// `scan` with an explicit notion of "now", for reports and tests.
    pub fn scan_at(&self, now: DateTime<Utc>, days: u32) -> Result<Vec<SlowQueryEntry>, StoreError> {
        let mut entries = Vec::new();
        for offset in 0..i64::from(days) {
            let date = (now - Duration::days(offset)).date_naive();
            for raw in self.kv.list_range(&day_key(date), 0, -1)? {
                match serde_json::from_str(&raw) {
                    Ok(entry) => entries.push(entry),
                    // A corrupt element must not hide the rest of the log.
                    Err(err) => debug!("skipping corrupt slow query entry: {}", err),
                }
            }
        }
        Ok(entries)
    }
}
