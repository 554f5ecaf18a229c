//! Per-request query summary.
//!
//! A pure read over the request's buffered records; hosts attach the result
//! to response headers, log context, or error reports.

use crate::recorder::QueryExecutionRecord;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SlowestQuery {
    pub statement: String,
    pub duration_seconds: f64,
}

/// Summary of one request's database activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestAnalysis {
    pub total_queries: usize,
    pub total_time_seconds: f64,
    pub average_time_seconds: f64,
    /// Records whose duration strictly exceeds the slow-query threshold.
    pub slow_queries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slowest_query: Option<SlowestQuery>,
}

/// Summarizes `records` against `threshold` (seconds).
pub fn analyze(records: &[QueryExecutionRecord], threshold: f64) -> RequestAnalysis {
    if records.is_empty() {
        return RequestAnalysis::default();
    }

    let total_time_seconds: f64 = records.iter().map(|r| r.duration_seconds).sum();
    let slowest = records
        .iter()
        .max_by(|a, b| {
            a.duration_seconds
                .partial_cmp(&b.duration_seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|r| SlowestQuery {
            statement: r.statement.clone(),
            duration_seconds: r.duration_seconds,
        });

    RequestAnalysis {
        total_queries: records.len(),
        total_time_seconds,
        average_time_seconds: total_time_seconds / records.len() as f64,
        slow_queries: records
            .iter()
            .filter(|r| r.duration_seconds > threshold)
            .count(),
        slowest_query: slowest,
    }
}
