//! Stage traits sequenced by the orchestrator

use async_trait::async_trait;

use super::relevance::RelevanceAssessment;
use crate::domain::error::DomainError;
use crate::domain::retrieval::{HybridRetriever, Passage};
use crate::domain::verification::VerificationReport;

#[cfg(test)]
use mockall::automock;

/// Decides whether the corpus can plausibly answer a question
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RelevanceClassifier: Send + Sync {
    /// Retrieve a broad candidate set and classify the question against it
    ///
    /// An empty candidate set must never yield `CanAnswer`.
    async fn classify(
        &self,
        question: &str,
        retriever: &HybridRetriever,
    ) -> Result<RelevanceAssessment, DomainError>;
}

/// Produces a candidate answer from a question and its passages
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DraftGenerator: Send + Sync {
    async fn draft(&self, question: &str, passages: &[Passage]) -> Result<String, DomainError>;
}

/// Checks a draft against the passages it was built from
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AnswerVerifier: Send + Sync {
    async fn verify(&self, draft: &str, passages: &[Passage]) -> Result<VerificationReport, DomainError>;
}
