//! Domain layer - Core types, traits and the fusion algorithm

pub mod error;
pub mod llm;
pub mod pipeline;
pub mod retrieval;
pub mod verification;

pub use error::{
    DomainError, GENERATION_FAILED_MESSAGE, IRRELEVANT_QUESTION_MESSAGE, PipelineError, PipelineStage,
    SEARCH_UNAVAILABLE_MESSAGE,
};
pub use llm::{FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, Message, MessageRole, Usage};
pub use pipeline::{
    AnswerVerifier, CancellationToken, Citation, CitationKind, DraftGenerator, PipelineAnswer, PipelineConfig,
    PipelineRequest, PipelineState, Relevance, RelevanceAssessment, RelevanceClassifier, Termination,
};
pub use retrieval::{
    FusedResults, FusionConfig, HybridRetriever, Passage, PassageLocation, RetrievalDiagnostics, RetrievalOrigin,
    RetrievalSource, RetrievedPassage, SourceReport, SourceStatus,
};
pub use verification::{Verdict, VerificationReport};
