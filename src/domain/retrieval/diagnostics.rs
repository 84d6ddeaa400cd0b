//! Retrieval diagnostics attached to answers

use std::fmt;

use serde::{Deserialize, Serialize};

use super::fusion::{FusedResults, SourceStatus};
use super::passage::RetrievalOrigin;

/// Entries kept per list
pub const DIAGNOSTIC_TOP_N: usize = 3;

const SOURCE_ID_DISPLAY_CHARS: usize = 50;

/// One scored entry in a diagnostics list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSource {
    pub source_id: String,
    pub rank: usize,
    pub score: f64,
}

impl ScoredSource {
    fn new(source_id: &str, rank: usize, score: f64) -> Self {
        Self {
            source_id: truncate_chars(source_id, SOURCE_ID_DISPLAY_CHARS),
            rank,
            score,
        }
    }
}

/// Top hits of a single source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDiagnostics {
    pub name: String,
    pub origin: RetrievalOrigin,
    pub weight: f64,
    #[serde(flatten)]
    pub status: SourceStatus,
    pub top: Vec<ScoredSource>,
}

/// Per-source and combined top hits of the last retrieval in a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalDiagnostics {
    pub sources: Vec<SourceDiagnostics>,
    pub combined: Vec<ScoredSource>,
}

impl RetrievalDiagnostics {
    pub fn from_results(results: &FusedResults) -> Self {
        let sources = results
            .reports
            .iter()
            .map(|report| SourceDiagnostics {
                name: report.name.clone(),
                origin: report.origin,
                weight: report.weight,
                status: report.status.clone(),
                top: report
                    .hits
                    .iter()
                    .take(DIAGNOSTIC_TOP_N)
                    .map(|hit| ScoredSource::new(&hit.source_id, hit.rank, hit.position_score))
                    .collect(),
            })
            .collect();

        let combined = results
            .passages
            .iter()
            .take(DIAGNOSTIC_TOP_N)
            .enumerate()
            .map(|(rank, p)| ScoredSource::new(&p.source_id, rank, p.fused_score))
            .collect();

        Self { sources, combined }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.combined.is_empty()
    }
}

impl fmt::Display for RetrievalDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for source in &self.sources {
            writeln!(
                f,
                "{} ({}, weight {:.2}): {}",
                source.name,
                source.origin,
                source.weight,
                source.status.label()
            )?;
            for entry in &source.top {
                writeln!(f, "  {}. {} ({:.4})", entry.rank + 1, entry.source_id, entry.score)?;
            }
        }

        writeln!(f, "combined:")?;
        for entry in &self.combined {
            writeln!(f, "  {}. {} ({:.4})", entry.rank + 1, entry.source_id, entry.score)?;
        }
        Ok(())
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max).collect();
    truncated.push_str("...");
    truncated
}
