//! Pipeline run request

use std::sync::Arc;

use super::config::DEFAULT_MAX_ITERATIONS;
use crate::domain::error::PipelineError;
use crate::domain::retrieval::RetrievalSource;

/// Input of a single pipeline run
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub question: String,
    pub sources: Vec<Arc<dyn RetrievalSource>>,
    /// One fusion weight per source, same order
    pub weights: Vec<f64>,
    pub max_iterations: u32,
}

impl PipelineRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            sources: Vec::new(),
            weights: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn RetrievalSource>, weight: f64) -> Self {
        self.sources.push(source);
        self.weights.push(weight);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Check the request before any collaborator is called
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.question.trim().is_empty() {
            return Err(PipelineError::invalid_request("question must not be empty"));
        }

        if self.max_iterations == 0 {
            return Err(PipelineError::invalid_request("max_iterations must be at least 1"));
        }

        if self.sources.is_empty() {
            return Err(PipelineError::invalid_request("at least one retrieval source is required"));
        }

        if self.weights.len() != self.sources.len() {
            return Err(PipelineError::invalid_request(format!(
                "expected {} weights, got {}",
                self.sources.len(),
                self.weights.len()
            )));
        }

        if self.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(PipelineError::invalid_request(
                "weights must be finite and non-negative",
            ));
        }

        Ok(())
    }
}
