//! sqlwatch — query-performance monitoring and connection-pool health.
//!
//! Embedded as a library inside a host service. The host's data-access layer
//! calls the recorder hooks around every statement; everything else is derived
//! from those records.
//!
//! Provides:
//! - `config` — immutable monitoring configuration, hot-swappable handle
//! - `normalize` — SQL statement shape extraction (literal stripping)
//! - `recorder` — per-statement timing hooks, request-scoped query buffer
//! - `analyzer` — per-request query summary
//! - `store` — day-partitioned slow-query log over a key-value collaborator
//! - `analysis` — slow-query pattern aggregation and optimization advisors
//! - `pool` — connection pool snapshot and health classification
//! - `alert` — windowed threshold checks with de-duplicated delivery

pub mod alert;
pub mod analysis;
pub mod analyzer;
pub mod config;
pub mod normalize;
pub mod pool;
pub mod recorder;
pub mod store;

pub use analysis::Severity;
pub use config::{ConfigHandle, MonitorConfig};
