//! Per-run pipeline state

use std::collections::HashSet;

use super::relevance::Relevance;
use crate::domain::retrieval::Passage;
use crate::domain::verification::VerificationReport;

/// Mutable context of one pipeline run
///
/// Created when a question arrives and dropped once the answer is returned.
/// Only the orchestrator mutates it, through the transition methods below:
///
/// - `iteration` never decreases and never exceeds `max_iterations`
/// - `passages` never holds two entries with the same fingerprint
#[derive(Debug, Clone)]
pub struct PipelineState {
    question: String,
    passages: Vec<Passage>,
    draft_answer: String,
    verification: Option<VerificationReport>,
    relevance: Option<Relevance>,
    iteration: u32,
    max_iterations: u32,
}

impl PipelineState {
    pub fn new(question: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            question: question.into(),
            passages: Vec::new(),
            draft_answer: String::new(),
            verification: None,
            relevance: None,
            iteration: 0,
            max_iterations,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn draft_answer(&self) -> &str {
        &self.draft_answer
    }

    pub fn verification(&self) -> Option<&VerificationReport> {
        self.verification.as_ref()
    }

    pub fn relevance(&self) -> Option<Relevance> {
        self.relevance
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn has_budget(&self) -> bool {
        self.iteration < self.max_iterations
    }

    pub fn set_relevance(&mut self, relevance: Relevance) {
        self.relevance = Some(relevance);
    }

    /// Start a research pass; returns false once the budget is spent
    pub fn begin_pass(&mut self) -> bool {
        if !self.has_budget() {
            return false;
        }
        self.iteration += 1;
        true
    }

    /// Replace the working passage set, dropping repeated fingerprints
    pub fn replace_passages(&mut self, passages: Vec<Passage>) {
        let mut seen = HashSet::with_capacity(passages.len());
        self.passages = passages
            .into_iter()
            .filter(|p| seen.insert(p.fingerprint.clone()))
            .collect();
    }

    /// Record a new draft; the previous verification no longer applies
    pub fn record_draft(&mut self, draft: impl Into<String>) {
        self.draft_answer = draft.into();
        self.verification = None;
    }

    pub fn record_verification(&mut self, report: VerificationReport) {
        self.verification = Some(report);
    }

    pub fn take_verification(&mut self) -> Option<VerificationReport> {
        self.verification.take()
    }

    pub fn is_verified(&self) -> bool {
        self.verification.as_ref().is_some_and(|v| v.passed())
    }
}
