//! Fusion configuration and result types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::passage::{Passage, RetrievalOrigin};

/// Share of each additional source's score added to the best score when
/// several strategies return the same passage
pub const DEFAULT_AGREEMENT_BONUS: f64 = 0.5;

/// Configuration for merging several ranked lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Multiplier applied to the non-best scores of a passage found by several sources
    #[serde(default = "default_agreement_bonus")]
    pub agreement_bonus: f64,
    /// Per-source deadline in milliseconds
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,
    /// Minimum number of passages requested from every source
    #[serde(default = "default_per_source_limit")]
    pub per_source_limit: usize,
}

fn default_agreement_bonus() -> f64 {
    DEFAULT_AGREEMENT_BONUS
}

fn default_source_timeout_ms() -> u64 {
    5_000
}

fn default_per_source_limit() -> usize {
    20
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            agreement_bonus: default_agreement_bonus(),
            source_timeout_ms: default_source_timeout_ms(),
            per_source_limit: default_per_source_limit(),
        }
    }
}

impl FusionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agreement_bonus(mut self, bonus: f64) -> Self {
        self.agreement_bonus = bonus;
        self
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_per_source_limit(mut self, limit: usize) -> Self {
        self.per_source_limit = limit;
        self
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    /// Number of passages to ask every source for when `k` fused results are wanted
    pub fn fetch_size(&self, k: usize) -> usize {
        k.max(self.per_source_limit)
    }
}

/// How a single source behaved during one fusion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Ok { returned: usize },
    Failed { reason: String },
    TimedOut { timeout_ms: u64 },
}

impl SourceStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok { .. } => "ok",
            Self::Failed { .. } => "failed",
            Self::TimedOut { .. } => "timed_out",
        }
    }
}

/// Score of one hit as seen by its own source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceHit {
    pub source_id: String,
    pub rank: usize,
    pub position_score: f64,
    pub weighted_score: f64,
}

/// Outcome of querying one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub name: String,
    pub origin: RetrievalOrigin,
    pub weight: f64,
    #[serde(flatten)]
    pub status: SourceStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hits: Vec<SourceHit>,
}

/// Output of one fusion call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusedResults {
    /// Deduplicated passages, best first
    pub passages: Vec<Passage>,
    /// One report per queried source, in source order
    pub reports: Vec<SourceReport>,
}

impl FusedResults {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn failed_sources(&self) -> usize {
        self.reports.iter().filter(|r| !r.status.is_ok()).count()
    }

    /// True when sources were queried and none of them answered
    pub fn all_failed(&self) -> bool {
        !self.reports.is_empty() && self.reports.iter().all(|r| !r.status.is_ok())
    }

    pub fn into_passages(self) -> Vec<Passage> {
        self.passages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, status: SourceStatus) -> SourceReport {
        SourceReport {
            name: name.to_string(),
            origin: RetrievalOrigin::Lexical,
            weight: 1.0,
            status,
            hits: Vec::new(),
        }
    }

    #[test]
    fn test_fusion_config_defaults() {
        let config = FusionConfig::default();

        assert_eq!(config.agreement_bonus, 0.5);
        assert_eq!(config.source_timeout(), Duration::from_secs(5));
        assert_eq!(config.fetch_size(5), 20);
        assert_eq!(config.fetch_size(50), 50);
    }

    #[test]
    fn test_all_failed() {
        let mut results = FusedResults::empty();
        assert!(!results.all_failed());

        results.reports.push(report("a", SourceStatus::Failed { reason: "down".into() }));
        results.reports.push(report("b", SourceStatus::TimedOut { timeout_ms: 10 }));
        assert!(results.all_failed());
        assert_eq!(results.failed_sources(), 2);

        results.reports.push(report("c", SourceStatus::Ok { returned: 0 }));
        assert!(!results.all_failed());
    }

    #[test]
    fn test_source_report_serialization() {
        let json = serde_json::to_value(report("bm25", SourceStatus::TimedOut { timeout_ms: 250 })).unwrap();

        assert_eq!(json["status"], "timed_out");
        assert_eq!(json["timeout_ms"], 250);
        assert!(json.get("hits").is_none());
    }
}
