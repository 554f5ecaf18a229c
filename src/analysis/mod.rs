//! Slow-query pattern aggregation and reporting.
//!
//! Scans N days of the slow-query log, groups entries by normalized
//! pattern, ranks patterns by cumulative time impact and runs the
//! optimization advisors over the heaviest ones. Reports are built fresh
//! on every call; nothing here is cached.

pub mod advisor;

use crate::config::MonitorConfig;
use crate::normalize::normalize;
use crate::store::{SlowQueryEntry, SlowQueryStore, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Patterns kept in a report.
const MAX_PATTERNS: usize = 20;
/// Top patterns handed to the advisors.
const ADVISED_PATTERNS: usize = 10;
/// Example entries retained per pattern, in first-seen order.
const MAX_EXAMPLES: usize = 3;

/// Shared severity scale for recommendations and alerts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One group of structurally identical slow queries.
#[derive(Debug, Clone, Serialize)]
pub struct PatternAggregate {
    pub pattern: String,
    pub count: usize,
    pub total_duration_seconds: f64,
    pub max_duration_seconds: f64,
    pub examples: Vec<SlowQueryEntry>,
}

impl PatternAggregate {
    pub fn average_duration_seconds(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_duration_seconds / self.count as f64
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SlowQueryReport {
    pub period_days: u32,
    pub total_slow_queries: usize,
    pub query_patterns: Vec<PatternAggregate>,
    pub recommendations: Vec<advisor::Recommendation>,
}

/// Builds a report over the last `days` days of the slow-query log.
///
/// A store outage comes back as `Err`; a partial report is never returned.
pub fn report(
    store: &SlowQueryStore,
    config: &MonitorConfig,
    days: u32,
) -> Result<SlowQueryReport, StoreError> {
    report_at(store, config, Utc::now(), days)
}

/// `report` with an explicit notion of "now", for tests and backfills.
pub fn report_at(
    store: &SlowQueryStore,
    config: &MonitorConfig,
    now: DateTime<Utc>,
    days: u32,
) -> Result<SlowQueryReport, StoreError> {
    let entries = store.scan_at(now, days)?;
    let total_slow_queries = entries.len();
    let mut patterns = aggregate(&entries, config.pattern_max_len);
    patterns.truncate(MAX_PATTERNS);

    let advisors = advisor::all_advisors();
    let mut recommendations = Vec::new();
    for aggregate in patterns.iter().take(ADVISED_PATTERNS) {
        for adv in &advisors {
            recommendations.extend(adv.evaluate(aggregate));
        }
    }

    Ok(SlowQueryReport {
        period_days: days,
        total_slow_queries,
        query_patterns: patterns,
        recommendations,
    })
}

/// Groups entries by normalized pattern and ranks by total time impact.
///
/// Sort order is deterministic: total duration desc, then count desc,
/// then pattern asc.
pub fn aggregate(entries: &[SlowQueryEntry], pattern_max_len: usize) -> Vec<PatternAggregate> {
    let mut by_pattern: HashMap<String, usize> = HashMap::new();
    let mut aggregates: Vec<PatternAggregate> = Vec::new();

    for entry in entries {
        let pattern = normalize(&entry.statement_preview, pattern_max_len);
        let idx = *by_pattern.entry(pattern.clone()).or_insert_with(|| {
            aggregates.push(PatternAggregate {
                pattern,
                count: 0,
                total_duration_seconds: 0.0,
                max_duration_seconds: 0.0,
                examples: Vec::new(),
            });
            aggregates.len() - 1
        });
        let agg = &mut aggregates[idx];
        agg.count += 1;
        agg.total_duration_seconds += entry.duration_seconds;
        if entry.duration_seconds > agg.max_duration_seconds {
            agg.max_duration_seconds = entry.duration_seconds;
        }
        if agg.examples.len() < MAX_EXAMPLES {
            agg.examples.push(entry.clone());
        }
    }

    aggregates.sort_by(|a, b| {
        b.total_duration_seconds
            .partial_cmp(&a.total_duration_seconds)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.count.cmp(&a.count))
            .then(a.pattern.cmp(&b.pattern))
    });
    aggregates
}
