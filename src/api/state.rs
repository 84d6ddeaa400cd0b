//! Application state shared by request handlers

use std::fmt;
use std::sync::Arc;

use crate::domain::retrieval::WeightedSource;
use crate::domain::{PipelineConfig, PipelineRequest};
use crate::infrastructure::pipeline::PipelineOrchestrator;

/// The orchestrator plus the sources every question is asked against
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PipelineOrchestrator>,
    pub sources: Arc<Vec<WeightedSource>>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("pipeline", &self.pipeline)
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl AppState {
    pub fn new(pipeline: PipelineOrchestrator, sources: Vec<WeightedSource>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            sources: Arc::new(sources),
        }
    }

    pub fn pipeline_config(&self) -> &PipelineConfig {
        self.pipeline.config()
    }

    /// Build a run request against the configured sources
    ///
    /// `weights` replaces the configured weights as given; a length
    /// mismatch is rejected when the request is validated.
    pub fn request(
        &self,
        question: impl Into<String>,
        weights: Option<Vec<f64>>,
        max_iterations: Option<u32>,
    ) -> PipelineRequest {
        let mut request = PipelineRequest::new(question)
            .with_max_iterations(max_iterations.unwrap_or(self.pipeline_config().max_iterations));

        for weighted in self.sources.iter() {
            request = request.with_source(weighted.source.clone(), weighted.weight);
        }

        if let Some(weights) = weights {
            request.weights = weights;
        }

        request
    }
}
