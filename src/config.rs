//! Monitoring configuration.
//!
//! `MonitorConfig` is immutable once constructed. Hot reload is done by
//! building a fresh config and swapping it into a [`ConfigHandle`]; fields
//! are never mutated in place while requests are running.

use std::env;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// Thresholds and limits for the monitoring subsystem.
///
/// Constructed once at startup, either with [`Default`] or from
/// `SQLWATCH_*` environment variables via [`MonitorConfig::from_env`].
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Statements slower than this (seconds) are persisted as slow queries.
    pub slow_query_threshold_seconds: f64,
    /// Total per-request query time above this triggers a warning log.
    pub critical_request_threshold_seconds: f64,
    /// Pool utilization above this is classified as warning.
    pub pool_warning_utilization: f64,
    /// Pool utilization above this is classified as critical.
    pub pool_critical_utilization: f64,
    /// Day partitions of the slow-query log expire after this many days.
    pub retention_days: u32,
    /// Minimum seconds between two alerts for the same metric/window/severity.
    pub alert_cooldown_seconds: u64,
    /// Persisted statement text is truncated to this many characters.
    pub statement_preview_len: usize,
    /// Persisted bind-parameter text is truncated to this many characters.
    pub params_preview_len: usize,
    /// Normalized query patterns are truncated to this many characters.
    pub pattern_max_len: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_seconds: 0.5,
            critical_request_threshold_seconds: 5.0,
            pool_warning_utilization: 0.9,
            pool_critical_utilization: 0.95,
            retention_days: 7,
            alert_cooldown_seconds: 1800,
            statement_preview_len: 500,
            params_preview_len: 200,
            pattern_max_len: 200,
        }
    }
}

impl MonitorConfig {
    /// Builds a config from `SQLWATCH_*` environment variables.
    ///
    /// Unset variables keep their defaults. Malformed values are logged
    /// and fall back to the default instead of failing startup.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            slow_query_threshold_seconds: env_f64(
                "SQLWATCH_SLOW_QUERY_THRESHOLD_SECONDS",
                d.slow_query_threshold_seconds,
            ),
            critical_request_threshold_seconds: env_f64(
                "SQLWATCH_CRITICAL_REQUEST_THRESHOLD_SECONDS",
                d.critical_request_threshold_seconds,
            ),
            pool_warning_utilization: env_f64(
                "SQLWATCH_POOL_WARNING_UTILIZATION",
                d.pool_warning_utilization,
            ),
            pool_critical_utilization: env_f64(
                "SQLWATCH_POOL_CRITICAL_UTILIZATION",
                d.pool_critical_utilization,
            ),
            retention_days: env_parse("SQLWATCH_RETENTION_DAYS", d.retention_days),
            alert_cooldown_seconds: env_parse(
                "SQLWATCH_ALERT_COOLDOWN_SECONDS",
                d.alert_cooldown_seconds,
            ),
            statement_preview_len: env_parse(
                "SQLWATCH_STATEMENT_PREVIEW_LEN",
                d.statement_preview_len,
            ),
            params_preview_len: env_parse("SQLWATCH_PARAMS_PREVIEW_LEN", d.params_preview_len),
            pattern_max_len: env_parse("SQLWATCH_PATTERN_MAX_LEN", d.pattern_max_len),
        }
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    env_parse(name, default)
}

fn env_parse<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!("ignoring malformed {}={:?}", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// Shared handle to the current configuration.
///
/// `load` returns an atomic snapshot; `store` swaps the whole config.
/// Readers on the hot path clone an `Arc`, never lock across work.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<MonitorConfig>>>,
}

impl ConfigHandle {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Current config snapshot. Falls back to the last value on a poisoned
    /// lock; configuration reads must never fail the caller.
    pub fn load(&self) -> Arc<MonitorConfig> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replaces the active configuration atomically.
    pub fn store(&self, config: MonitorConfig) {
        let next = Arc::new(config);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.slow_query_threshold_seconds, 0.5);
        assert_eq!(cfg.retention_days, 7);
        assert_eq!(cfg.alert_cooldown_seconds, 1800);
        assert_eq!(cfg.pool_warning_utilization, 0.9);
        assert_eq!(cfg.pool_critical_utilization, 0.95);
    }

    #[test]
    fn test_handle_swap() {
        let handle = ConfigHandle::default();
        assert_eq!(handle.load().retention_days, 7);

        handle.store(MonitorConfig {
            retention_days: 3,
            ..MonitorConfig::default()
        });
        assert_eq!(handle.load().retention_days, 3);
    }

    #[test]
    fn test_snapshot_survives_swap() {
        let handle = ConfigHandle::default();
        let snapshot = handle.load();
        handle.store(MonitorConfig {
            slow_query_threshold_seconds: 1.0,
            ..MonitorConfig::default()
        });
        // The old snapshot is unaffected by the swap.
        assert_eq!(snapshot.slow_query_threshold_seconds, 0.5);
        assert_eq!(handle.load().slow_query_threshold_seconds, 1.0);
    }
}
