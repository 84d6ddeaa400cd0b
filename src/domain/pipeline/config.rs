//! Pipeline configuration

use serde::{Deserialize, Serialize};

use crate::domain::retrieval::FusionConfig;

/// Iteration budget used when a request does not set one
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// Configuration shared by every run of the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Candidates fetched for the relevance check
    #[serde(default = "default_relevance_k")]
    pub relevance_k: usize,
    /// Passages fetched on every research pass
    #[serde(default = "default_research_k")]
    pub research_k: usize,
    /// Budget applied when a request does not set one
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Render long answers as bullet points
    #[serde(default)]
    pub format_long_answers: bool,
    #[serde(default)]
    pub fusion: FusionConfig,
}

fn default_relevance_k() -> usize {
    20
}

fn default_research_k() -> usize {
    10
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            relevance_k: default_relevance_k(),
            research_k: default_research_k(),
            max_iterations: default_max_iterations(),
            format_long_answers: false,
            fusion: FusionConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relevance_k(mut self, k: usize) -> Self {
        self.relevance_k = k;
        self
    }

    pub fn with_research_k(mut self, k: usize) -> Self {
        self.research_k = k;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_format_long_answers(mut self, enabled: bool) -> Self {
        self.format_long_answers = enabled;
        self
    }

    pub fn with_fusion(mut self, fusion: FusionConfig) -> Self {
        self.fusion = fusion;
        self
    }
}
