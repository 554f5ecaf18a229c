//! Connection pool monitoring.
//!
//! The pool itself belongs to the host; it is observed through the
//! [`PoolIntrospect`] trait, a read-only view over atomically maintained
//! counters. Health classification is stateless: each call classifies the
//! latest snapshot, there is no persisted state machine and no hysteresis.

use crate::config::MonitorConfig;
use serde::Serialize;

/// Error type for pool introspection.
#[derive(Debug)]
pub enum PoolError {
    /// The pool failed to report its counters.
    MetricsUnavailable(String),
}

impl std::fmt::Display for PoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolError::MetricsUnavailable(msg) => write!(f, "pool metrics unavailable: {}", msg),
        }
    }
}

impl std::error::Error for PoolError {}

/// Raw counters read from the host's pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolCounters {
    pub size: u32,
    pub checked_out: u32,
    pub overflow: u32,
    pub max_overflow: u32,
}

/// Read-only view over a connection pool's live counters.
///
/// Implementations must not mutate pool state; sampling runs concurrently
/// with normal checkout/checkin.
pub trait PoolIntrospect: Send + Sync {
    fn counters(&self) -> Result<PoolCounters, PoolError>;
}

/// Point-in-time pool state with derived figures.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolSnapshot {
    pub size: u32,
    pub checked_out: u32,
    pub overflow: u32,
    pub max_overflow: u32,
    pub total: u32,
    /// Base connections not currently checked out; negative when demand
    /// has spilled into overflow.
    pub available: i64,
    pub utilization: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolHealth {
    pub status: PoolStatus,
    pub utilization: f64,
    pub recommendations: Vec<String>,
}

/// Reads the pool counters into a snapshot. Pure read, no side effects.
pub fn snapshot(pool: &dyn PoolIntrospect) -> Result<PoolSnapshot, PoolError> {
    let c = pool.counters()?;
    let utilization = if c.size == 0 {
        0.0
    } else {
        f64::from(c.checked_out) / f64::from(c.size)
    };
    Ok(PoolSnapshot {
        size: c.size,
        checked_out: c.checked_out,
        overflow: c.overflow,
        max_overflow: c.max_overflow,
        total: c.size + c.overflow,
        available: i64::from(c.size) - i64::from(c.checked_out),
        utilization,
    })
}

/// Classifies pool health against the configured utilization thresholds.
///
/// Rules are checked in order and the first match sets the status, but
/// recommendations accumulate across all matched rules. A pool that fails
/// to report counters degrades to `Unknown`; this never returns an error.
pub fn health(pool: &dyn PoolIntrospect, config: &MonitorConfig) -> PoolHealth {
    let snap = match snapshot(pool) {
        Ok(snap) => snap,
        Err(err) => {
            return PoolHealth {
                status: PoolStatus::Unknown,
                utilization: 0.0,
                recommendations: vec![format!("pool metrics unavailable: {}", err)],
            };
        }
    };

    let mut status = PoolStatus::Healthy;
    let mut recommendations = Vec::new();

    if snap.overflow > snap.size {
        status = PoolStatus::Critical;
        recommendations.push(format!(
            "overflow connections ({}) exceed base pool size ({}): pool exhaustion",
            snap.overflow, snap.size,
        ));
    }

    if snap.utilization > config.pool_critical_utilization {
        if status == PoolStatus::Healthy {
            status = PoolStatus::Critical;
        }
        recommendations.push(format!(
            "pool utilization at {:.0}% exceeds the critical threshold, increase pool size",
            snap.utilization * 100.0,
        ));
    } else if snap.utilization > config.pool_warning_utilization {
        if status == PoolStatus::Healthy {
            status = PoolStatus::Warning;
        }
        recommendations.push(format!(
            "high pool utilization ({:.0}%), consider increasing pool size",
            snap.utilization * 100.0,
        ));
    }

    PoolHealth {
        status,
        utilization: snap.utilization,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPool(PoolCounters);

    impl PoolIntrospect for FixedPool {
        fn counters(&self) -> Result<PoolCounters, PoolError> {
            Ok(self.0)
        }
    }

    struct BrokenPool;

    impl PoolIntrospect for BrokenPool {
        fn counters(&self) -> Result<PoolCounters, PoolError> {
            Err(PoolError::MetricsUnavailable("driver panic".to_string()))
        }
    }

    fn pool(size: u32, checked_out: u32, overflow: u32) -> FixedPool {
        FixedPool(PoolCounters {
            size,
            checked_out,
            overflow,
            max_overflow: 20,
        })
    }

    #[test]
    fn test_snapshot_derived_fields() {
        let snap = snapshot(&pool(10, 5, 2)).unwrap();
        assert_eq!(snap.total, 12);
        assert_eq!(snap.available, 5);
        assert!((snap.utilization - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_size_pool() {
        let snap = snapshot(&pool(0, 0, 0)).unwrap();
        assert_eq!(snap.utilization, 0.0);
    }

    #[test]
    fn test_healthy_pool() {
        let health = health(&pool(10, 5, 2), &MonitorConfig::default());
        assert_eq!(health.status, PoolStatus::Healthy);
        assert!(health.recommendations.is_empty());
    }

    #[test]
    fn test_warning_boundary_excluded() {
        // Utilization of exactly 0.9 is not a warning; the rule is strict.
        let health = health(&pool(10, 9, 0), &MonitorConfig::default());
        assert_eq!(health.status, PoolStatus::Healthy);
    }

    #[test]
    fn test_warning_band() {
        // 19/20 = 0.95: above warning, not above critical.
        let health = health(&pool(20, 19, 0), &MonitorConfig::default());
        assert_eq!(health.status, PoolStatus::Warning);
        assert_eq!(health.recommendations.len(), 1);
        assert!(health.recommendations[0].contains("95%"));
    }

    #[test]
    fn test_critical_utilization() {
        let health = health(&pool(10, 10, 2), &MonitorConfig::default());
        assert_eq!(health.status, PoolStatus::Critical);
    }

    #[test]
    fn test_overflow_exhaustion_is_critical() {
        // Overflow above base size is critical regardless of utilization.
        let health = health(&pool(10, 2, 12), &MonitorConfig::default());
        assert_eq!(health.status, PoolStatus::Critical);
        assert!(health.recommendations[0].contains("exhaustion"));
    }

    #[test]
    fn test_recommendations_accumulate() {
        // Exhausted and saturated: one status, two recommendations.
        let health = health(&pool(10, 10, 12), &MonitorConfig::default());
        assert_eq!(health.status, PoolStatus::Critical);
        assert_eq!(health.recommendations.len(), 2);
    }

    #[test]
    fn test_broken_pool_degrades_to_unknown() {
        let health = health(&BrokenPool, &MonitorConfig::default());
        assert_eq!(health.status, PoolStatus::Unknown);
        assert!(health.recommendations[0].contains("pool metrics unavailable"));
    }
}
