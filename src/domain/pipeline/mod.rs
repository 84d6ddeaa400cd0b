//! Question-answering pipeline domain
//!
//! Types and stage traits for the bounded relevance → research → verify loop.

mod answer;
mod cancellation;
mod config;
mod relevance;
mod request;
mod stages;
mod state;

pub use answer::{
    CITATION_EXCERPT_CHARS, Citation, CitationKind, PipelineAnswer, Termination, UNVERIFIED_NOTE,
    format_long_answer,
};
pub use cancellation::CancellationToken;
pub use config::{DEFAULT_MAX_ITERATIONS, PipelineConfig};
pub use relevance::{Relevance, RelevanceAssessment};
pub use request::PipelineRequest;
pub use stages::{AnswerVerifier, DraftGenerator, RelevanceClassifier};
pub use state::PipelineState;

#[cfg(test)]
pub use stages::{MockAnswerVerifier, MockDraftGenerator, MockRelevanceClassifier};
