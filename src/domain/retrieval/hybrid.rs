//! Hybrid retriever
//!
//! Queries every configured source concurrently and merges their rankings:
//!
//! - a hit at zero-based rank `r` from a source with weight `w` scores `w / (r + 1)`
//! - a source that errors or misses its deadline is skipped and reported
//! - hits sharing a fingerprint collapse into one passage whose score is the
//!   best per-source score plus `agreement_bonus` times the sum of the others
//! - passages are ordered by fused score, then source order, then rank

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;
use tracing::{debug, warn};

use super::fusion::{FusedResults, FusionConfig, SourceHit, SourceReport, SourceStatus};
use super::passage::{Fingerprint, Passage, RetrievedPassage};
use super::source::RetrievalSource;
use crate::domain::DomainError;

/// A source paired with its fusion weight
#[derive(Debug, Clone)]
pub struct WeightedSource {
    pub source: Arc<dyn RetrievalSource>,
    pub weight: f64,
}

/// Fuses several ranked lists into one deduplicated list
#[derive(Debug, Clone)]
pub struct HybridRetriever {
    sources: Vec<WeightedSource>,
    config: FusionConfig,
}

/// Best hit seen so far for one fingerprint
struct Candidate {
    passage: RetrievedPassage,
    fingerprint: Fingerprint,
    source_index: usize,
    rank: usize,
    best_score: f64,
    /// One score per contributing source
    scores: Vec<(usize, f64)>,
}

impl Candidate {
    fn fused_score(&self, bonus: f64) -> f64 {
        let mut scores: Vec<f64> = self.scores.iter().map(|(_, s)| *s).collect();
        scores.sort_by(|a, b| b.total_cmp(a));

        let mut iter = scores.into_iter();
        let best = iter.next().unwrap_or(0.0);
        best + bonus * iter.sum::<f64>()
    }
}

impl HybridRetriever {
    /// Create a retriever without sources
    pub fn new(config: FusionConfig) -> Self {
        Self {
            sources: Vec::new(),
            config,
        }
    }

    /// Add a source; sources added earlier win score ties
    pub fn with_source(mut self, source: Arc<dyn RetrievalSource>, weight: f64) -> Self {
        self.sources.push(WeightedSource { source, weight });
        self
    }

    /// Pair sources with weights, rejecting mismatched or invalid weight vectors
    pub fn from_parts(
        sources: Vec<Arc<dyn RetrievalSource>>,
        weights: &[f64],
        config: FusionConfig,
    ) -> Result<Self, DomainError> {
        if sources.len() != weights.len() {
            return Err(DomainError::validation(format!(
                "{} retrieval sources but {} weights",
                sources.len(),
                weights.len()
            )));
        }

        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(DomainError::validation(format!(
                "Fusion weights must be finite and non-negative, got {}",
                bad
            )));
        }

        let sources = sources
            .into_iter()
            .zip(weights.iter().copied())
            .map(|(source, weight)| WeightedSource { source, weight })
            .collect();

        Ok(Self { sources, config })
    }

    pub fn sources(&self) -> &[WeightedSource] {
        &self.sources
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fetch and fuse the top `k` passages for `query`
    ///
    /// Never fails: unavailable sources show up in `FusedResults::reports`.
    pub async fn fuse(&self, query: &str, k: usize) -> FusedResults {
        if k == 0 || self.sources.is_empty() {
            return FusedResults::empty();
        }

        let fetch = self.config.fetch_size(k);
        let timeout = self.config.source_timeout();

        // join_all yields in input order, so completion order never leaks into the result
        let outcomes = join_all(self.sources.iter().map(|ws| async move {
            tokio::time::timeout(timeout, ws.source.search(query, fetch)).await
        }))
        .await;

        let mut candidates: HashMap<Fingerprint, Candidate> = HashMap::new();
        let mut reports = Vec::with_capacity(self.sources.len());

        for (index, (ws, outcome)) in self.sources.iter().zip(outcomes).enumerate() {
            let name = ws.source.name().to_string();

            let results = match outcome {
                Ok(Ok(results)) => results,
                Ok(Err(e)) => {
                    warn!(source = %name, error = %e, "Retrieval source failed, skipping");
                    counter!("docubot_retrieval_source_failures_total", "source" => name.clone(), "reason" => "error")
                        .increment(1);
                    reports.push(self.report(ws, SourceStatus::Failed { reason: e.to_string() }, Vec::new()));
                    continue;
                }
                Err(_) => {
                    warn!(source = %name, timeout_ms = self.config.source_timeout_ms, "Retrieval source timed out, skipping");
                    counter!("docubot_retrieval_source_failures_total", "source" => name.clone(), "reason" => "timeout")
                        .increment(1);
                    reports.push(self.report(
                        ws,
                        SourceStatus::TimedOut {
                            timeout_ms: self.config.source_timeout_ms,
                        },
                        Vec::new(),
                    ));
                    continue;
                }
            };

            let returned = results.len().min(fetch);
            let mut hits = Vec::with_capacity(returned);

            for (rank, retrieved) in results.into_iter().take(fetch).enumerate() {
                let position_score = 1.0 / (rank as f64 + 1.0);
                let score = position_score * ws.weight;

                hits.push(SourceHit {
                    source_id: retrieved.source_id.clone(),
                    rank,
                    position_score,
                    weighted_score: score,
                });

                let fingerprint = retrieved.fingerprint();
                match candidates.get_mut(&fingerprint) {
                    Some(candidate) => {
                        // A source repeating a passage only counts its best rank
                        if candidate.scores.iter().any(|(i, _)| *i == index) {
                            continue;
                        }
                        candidate.scores.push((index, score));
                        if score > candidate.best_score {
                            candidate.passage = retrieved;
                            candidate.source_index = index;
                            candidate.rank = rank;
                            candidate.best_score = score;
                        }
                    }
                    None => {
                        candidates.insert(
                            fingerprint.clone(),
                            Candidate {
                                passage: retrieved,
                                fingerprint,
                                source_index: index,
                                rank,
                                best_score: score,
                                scores: vec![(index, score)],
                            },
                        );
                    }
                }
            }

            debug!(source = %name, returned, "Retrieval source answered");
            reports.push(self.report(ws, SourceStatus::Ok { returned }, hits));
        }

        let bonus = self.config.agreement_bonus;
        let mut scored: Vec<(f64, Candidate)> = candidates
            .into_values()
            .map(|c| (c.fused_score(bonus), c))
            .collect();

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .total_cmp(score_a)
                .then_with(|| a.source_index.cmp(&b.source_index))
                .then_with(|| a.rank.cmp(&b.rank))
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });
        scored.truncate(k);

        let passages = scored
            .into_iter()
            .map(|(fused_score, c)| {
                let origin = self.sources[c.source_index].source.origin();
                Passage::from_retrieved(c.passage, origin, c.rank, fused_score)
            })
            .collect::<Vec<_>>();

        debug!(
            fused = passages.len(),
            sources = self.sources.len(),
            "Fused retrieval results"
        );

        FusedResults { passages, reports }
    }

    fn report(&self, ws: &WeightedSource, status: SourceStatus, hits: Vec<SourceHit>) -> SourceReport {
        SourceReport {
            name: ws.source.name().to_string(),
            origin: ws.source.origin(),
            weight: ws.weight,
            status,
            hits,
        }
    }
}

impl fmt::Display for HybridRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .sources
            .iter()
            .map(|ws| format!("{}({})={}", ws.source.name(), ws.source.origin(), ws.weight))
            .collect();
        write!(f, "hybrid[{}]", parts.join(", "))
    }
}
