//! Optimization advisors.
//!
//! Each advisor looks at one ranked [`PatternAggregate`] and may emit zero
//! or more recommendations. Heuristics are intentionally coarse: they point
//! a human at the right query group, they do not rewrite queries.

use crate::analysis::{PatternAggregate, Severity};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Index,
    NPlusOne,
    Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub severity: Severity,
    /// The query pattern this recommendation applies to.
    pub pattern: String,
    pub description: String,
}

pub trait PatternAdvisor: Send + Sync {
    fn id(&self) -> &'static str;
    fn evaluate(&self, agg: &PatternAggregate) -> Vec<Recommendation>;
}

pub fn all_advisors() -> Vec<Box<dyn PatternAdvisor>> {
    vec![
        Box::new(IndexAdvisor),
        Box::new(NPlusOneAdvisor),
        Box::new(PaginationAdvisor),
    ]
}

fn contains_keyword(pattern: &str, keyword: &str) -> bool {
    pattern.to_uppercase().contains(keyword)
}

// ============================================================
// IndexAdvisor
// ============================================================

pub struct IndexAdvisor;

impl PatternAdvisor for IndexAdvisor {
    fn id(&self) -> &'static str {
        "index"
    }

    fn evaluate(&self, agg: &PatternAggregate) -> Vec<Recommendation> {
        if !contains_keyword(&agg.pattern, "WHERE") || agg.average_duration_seconds() <= 0.1 {
            return Vec::new();
        }
        vec![Recommendation {
            kind: RecommendationKind::Index,
            severity: Severity::High,
            pattern: agg.pattern.clone(),
            description: "consider adding an index for frequently queried columns".to_string(),
        }]
    }
}

// ============================================================
// NPlusOneAdvisor
// ============================================================

pub struct NPlusOneAdvisor;

impl PatternAdvisor for NPlusOneAdvisor {
    fn id(&self) -> &'static str {
        "n_plus_one"
    }

    fn evaluate(&self, agg: &PatternAggregate) -> Vec<Recommendation> {
        if agg.count <= 100 || contains_keyword(&agg.pattern, "JOIN") {
            return Vec::new();
        }
        vec![Recommendation {
            kind: RecommendationKind::NPlusOne,
            severity: Severity::High,
            pattern: agg.pattern.clone(),
            description: format!(
                "possible N+1 query pattern ({} similar queries)",
                agg.count
            ),
        }]
    }
}

// ============================================================
// PaginationAdvisor
// ============================================================

pub struct PaginationAdvisor;

impl PatternAdvisor for PaginationAdvisor {
    fn id(&self) -> &'static str {
        "pagination"
    }

    fn evaluate(&self, agg: &PatternAggregate) -> Vec<Recommendation> {
        if contains_keyword(&agg.pattern, "LIMIT") || agg.average_duration_seconds() <= 0.5 {
            return Vec::new();
        }
        vec![Recommendation {
            kind: RecommendationKind::Pagination,
            severity: Severity::Medium,
            pattern: agg.pattern.clone(),
            description: "consider adding pagination".to_string(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate(pattern: &str, count: usize, total: f64) -> PatternAggregate {
        PatternAggregate {
            pattern: pattern.to_string(),
            count,
            total_duration_seconds: total,
            max_duration_seconds: total,
            examples: Vec::new(),
        }
    }

    fn evaluate_all(agg: &PatternAggregate) -> Vec<Recommendation> {
        all_advisors()
            .iter()
            .flat_map(|a| a.evaluate(agg))
            .collect()
    }

    #[test]
    fn test_n_plus_one_with_index() {
        // 150 similar filtered queries averaging 0.3s: both heuristics fire.
        let agg = aggregate("SELECT * FROM posts WHERE client_id = ?", 150, 45.0);
        let recs = evaluate_all(&agg);
        let kinds: Vec<_> = recs.iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&RecommendationKind::Index));
        assert!(kinds.contains(&RecommendationKind::NPlusOne));
        let n1 = recs
            .iter()
            .find(|r| r.kind == RecommendationKind::NPlusOne)
            .unwrap();
        assert_eq!(n1.severity, Severity::High);
        assert!(n1.description.contains("150"));
    }

    #[test]
    fn test_fast_paginated_query_is_clean() {
        let agg = aggregate("SELECT * FROM posts ORDER BY id LIMIT ?", 50, 2.5);
        assert!(evaluate_all(&agg).is_empty());
    }

    #[test]
    fn test_index_needs_where_clause() {
        let agg = aggregate("SELECT * FROM posts", 10, 5.0);
        let recs = IndexAdvisor.evaluate(&agg);
        assert!(recs.is_empty());
    }

    #[test]
    fn test_index_average_boundary() {
        // Exactly 0.1s average does not fire; just above does.
        let at = aggregate("SELECT * FROM t WHERE id = ?", 10, 1.0);
        assert!(IndexAdvisor.evaluate(&at).is_empty());
        let above = aggregate("SELECT * FROM t WHERE id = ?", 10, 1.01);
        assert_eq!(IndexAdvisor.evaluate(&above).len(), 1);
    }

    #[test]
    fn test_join_suppresses_n_plus_one() {
        let agg = aggregate("SELECT * FROM a JOIN b ON a.id = b.a_id", 150, 45.0);
        assert!(NPlusOneAdvisor.evaluate(&agg).is_empty());
    }

    #[test]
    fn test_pagination_on_slow_unbounded_query() {
        let agg = aggregate("SELECT * FROM logs", 4, 2.8);
        let recs = PaginationAdvisor.evaluate(&agg);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].severity, Severity::Medium);
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let agg = aggregate("select * from t where id = ?", 10, 5.0);
        assert_eq!(IndexAdvisor.evaluate(&agg).len(), 1);
    }
}
