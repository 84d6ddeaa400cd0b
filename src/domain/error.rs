use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by collaborators (language models, search backends, configuration)
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Timed out after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Unparseable response: {message}")]
    Parse { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Pipeline stage a fatal error is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Request,
    Classification,
    Generation,
    Verification,
    Cancelled,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "invalid_request",
            Self::Classification => "classification",
            Self::Generation => "generation",
            Self::Verification => "verification",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing sentence when the knowledge base could not be searched
pub const SEARCH_UNAVAILABLE_MESSAGE: &str =
    "I could not search your knowledge base right now. Please try again in a moment.";

/// User-facing sentence when no answer could be generated
pub const GENERATION_FAILED_MESSAGE: &str =
    "I could not generate an answer to your question. Please try again in a moment.";

/// Fixed answer for questions the corpus cannot answer
pub const IRRELEVANT_QUESTION_MESSAGE: &str = "This question is not related to the uploaded document(s), \
     or there is insufficient information to answer it.";

/// Fatal outcome of a pipeline run, tagged with the stage that failed
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Relevance classification failed: {0}")]
    Classification(#[source] DomainError),

    #[error("Answer generation failed: {0}")]
    Generation(#[source] DomainError),

    #[error("Answer verification failed: {0}")]
    Verification(#[source] DomainError),

    #[error("Pipeline run was cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::InvalidRequest(_) => PipelineStage::Request,
            Self::Classification(_) => PipelineStage::Classification,
            Self::Generation(_) => PipelineStage::Generation,
            Self::Verification(_) => PipelineStage::Verification,
            Self::Cancelled => PipelineStage::Cancelled,
        }
    }

    /// Message safe to show to the person who asked the question
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest(message) => format!("Your question could not be processed: {}", message),
            Self::Classification(_) | Self::Generation(_) | Self::Verification(_) => {
                GENERATION_FAILED_MESSAGE.to_string()
            }
            Self::Cancelled => "The request was cancelled before an answer was ready.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error() {
        let error = DomainError::timeout("chat completion", 1500);
        assert_eq!(error.to_string(), "Timed out after 1500ms: chat completion");
        assert!(error.is_timeout());
    }

    #[test]
    fn test_provider_error() {
        let error = DomainError::provider("openai", "rate limited");
        assert_eq!(error.to_string(), "Provider error: openai - rate limited");
        assert!(!error.is_timeout());
    }

    #[test]
    fn test_pipeline_error_stage_tags() {
        let err = PipelineError::Generation(DomainError::provider("groq", "503"));
        assert_eq!(err.stage(), PipelineStage::Generation);
        assert_eq!(err.stage().as_str(), "generation");

        let err = PipelineError::Verification(DomainError::parse("empty"));
        assert_eq!(err.stage().to_string(), "verification");

        assert_eq!(PipelineError::Cancelled.stage(), PipelineStage::Cancelled);
        assert_eq!(
            PipelineError::invalid_request("empty question").stage(),
            PipelineStage::Request
        );
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let classify = PipelineError::Classification(DomainError::timeout("classify", 10)).user_message();
        let generate = PipelineError::Generation(DomainError::provider("groq", "boom")).user_message();

        assert_eq!(classify, GENERATION_FAILED_MESSAGE);
        assert_eq!(generate, GENERATION_FAILED_MESSAGE);
        assert_ne!(generate, SEARCH_UNAVAILABLE_MESSAGE);
        assert_ne!(generate, IRRELEVANT_QUESTION_MESSAGE);
        assert_ne!(SEARCH_UNAVAILABLE_MESSAGE, IRRELEVANT_QUESTION_MESSAGE);
    }
}
