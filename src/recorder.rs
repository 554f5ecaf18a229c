//! Query execution recording.
//!
//! The host's database layer calls [`QueryRecorder::on_statement_start`] and
//! [`QueryRecorder::on_statement_end`] around every statement. Durations are
//! measured with monotonic clocks; a per-connection stack of start times
//! supports nested statements on the same connection.
//!
//! Everything here runs inside hot query execution, so the whole module is
//! fire-and-forget: no method returns an error and no failure may reach the
//! query's caller.

use crate::analyzer::{self, RequestAnalysis};
use crate::config::{ConfigHandle, MonitorConfig};
use crate::normalize::truncate_chars;
use crate::store::{SlowQueryEntry, SlowQueryStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, warn};

/// Statement prefix length used in slow-query warn lines.
const LOG_PREVIEW_LEN: usize = 80;

/// One executed statement, as seen by the current request.
#[derive(Debug, Clone, Serialize)]
pub struct QueryExecutionRecord {
    pub statement: String,
    pub params_preview: String,
    pub duration_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

/// Request-scoped buffer of executed statements.
///
/// Created at request start, threaded through the request's call chain by
/// the host, summarized once at request end and then dropped. Never shared
/// across requests.
#[derive(Default)]
pub struct RequestContext {
    records: Vec<QueryExecutionRecord>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[QueryExecutionRecord] {
        &self.records
    }

    /// Summarizes the buffered records.
    ///
    /// Also logs a warning when the request's total query time exceeds the
    /// configured critical request threshold.
    pub fn finish(&self, config: &MonitorConfig) -> RequestAnalysis {
        let analysis = analyzer::analyze(&self.records, config.slow_query_threshold_seconds);
        if analysis.total_time_seconds > config.critical_request_threshold_seconds {
            warn!(
                "request spent {:.3}s in {} queries (critical threshold {:.3}s)",
                analysis.total_time_seconds,
                analysis.total_queries,
                config.critical_request_threshold_seconds,
            );
        }
        analysis
    }
}

/// Measures statement durations and feeds the slow-query log.
pub struct QueryRecorder {
    config: ConfigHandle,
    store: SlowQueryStore,
    /// Per-connection stacks of monotonic start times.
    starts: Mutex<HashMap<u64, Vec<Instant>>>,
}

impl QueryRecorder {
    pub fn new(config: ConfigHandle, store: SlowQueryStore) -> Self {
        Self {
            config,
            store,
            starts: Mutex::new(HashMap::new()),
        }
    }

    /// Marks the start of a statement on `conn_id`.
    pub fn on_statement_start(&self, conn_id: u64) {
        let Ok(mut starts) = self.starts.lock() else {
            debug!("start stack lock poisoned, statement not timed");
            return;
        };
        starts.entry(conn_id).or_default().push(Instant::now());
    }

    /// Marks the completion of the innermost statement on `conn_id` and
    /// appends the measured record to `ctx`.
    ///
    /// An end without a matching start is logged and skipped; the pairing
    /// error never reaches the query's caller.
    pub fn on_statement_end(
        &self,
        ctx: &mut RequestContext,
        conn_id: u64,
        statement: &str,
        params: &str,
    ) {
        let start = {
            let Ok(mut starts) = self.starts.lock() else {
                debug!("start stack lock poisoned, statement dropped");
                return;
            };
            starts.get_mut(&conn_id).and_then(Vec::pop)
        };
        let Some(start) = start else {
            debug!("statement end without start on connection {}", conn_id);
            return;
        };
        self.record_execution(ctx, statement, params, start.elapsed().as_secs_f64());
    }

    /// Records an execution with a host-measured duration.
    ///
    /// This is the common path behind the start/end hooks; hosts that time
    /// statements themselves can call it directly.
    pub fn record_execution(
        &self,
        ctx: &mut RequestContext,
        statement: &str,
        params: &str,
        duration_seconds: f64,
    ) {
        let config = self.config.load();
        let timestamp = Utc::now();
        ctx.records.push(QueryExecutionRecord {
            statement: statement.to_string(),
            params_preview: truncate_chars(params, config.params_preview_len),
            duration_seconds,
            timestamp,
        });

        if duration_seconds > config.slow_query_threshold_seconds {
            warn!(
                "slow query ({:.3}s): {}",
                duration_seconds,
                truncate_chars(statement, LOG_PREVIEW_LEN),
            );
            self.store.record(&SlowQueryEntry {
                statement_preview: truncate_chars(statement, config.statement_preview_len),
                params_preview: truncate_chars(params, config.params_preview_len),
                duration_seconds,
                timestamp,
            });
        }
    }
}
