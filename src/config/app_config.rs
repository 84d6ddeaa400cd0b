use serde::Deserialize;

use crate::domain::{FusionConfig, PipelineConfig};
use crate::infrastructure::agents::AgentConfig;
use crate::infrastructure::llm::GROQ_BASE_URL;
use crate::infrastructure::observability::MetricsConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Chat-completions endpoint used by every agent
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Falls back to `GROQ_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(flatten)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f64,
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,
    #[serde(default = "default_per_source_limit")]
    pub per_source_limit: usize,
    /// JSON or JSONL corpus for the lexical source
    #[serde(default)]
    pub corpus_path: Option<String>,
    /// Search service for the semantic source
    #[serde(default)]
    pub semantic_endpoint: Option<String>,
    #[serde(default)]
    pub semantic_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_relevance_k")]
    pub relevance_k: usize,
    #[serde(default = "default_research_k")]
    pub research_k: usize,
    #[serde(default)]
    pub format_long_answers: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_level() -> String {
    "info".to_string()
}

fn default_llm_base_url() -> String {
    GROQ_BASE_URL.to_string()
}

fn default_lexical_weight() -> f64 {
    0.4
}

fn default_semantic_weight() -> f64 {
    0.6
}

fn default_source_timeout_ms() -> u64 {
    FusionConfig::default().source_timeout_ms
}

fn default_per_source_limit() -> usize {
    FusionConfig::default().per_source_limit
}

fn default_max_iterations() -> u32 {
    PipelineConfig::default().max_iterations
}

fn default_relevance_k() -> usize {
    PipelineConfig::default().relevance_k
}

fn default_research_k() -> usize {
    PipelineConfig::default().research_k
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: None,
            agent: AgentConfig::default(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            lexical_weight: default_lexical_weight(),
            semantic_weight: default_semantic_weight(),
            source_timeout_ms: default_source_timeout_ms(),
            per_source_limit: default_per_source_limit(),
            corpus_path: None,
            semantic_endpoint: None,
            semantic_api_key: None,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            relevance_k: default_relevance_k(),
            research_k: default_research_k(),
            format_long_answers: false,
        }
    }
}

impl LlmConfig {
    /// Configured key, or `GROQ_API_KEY` from the environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("GROQ_API_KEY").ok().filter(|key| !key.trim().is_empty()))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("DOCUBOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: Self = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.pipeline.max_iterations == 0 {
            return Err(config::ConfigError::Message(
                "pipeline.max_iterations must be at least 1".to_string(),
            ));
        }

        if self.pipeline.relevance_k == 0 {
            return Err(config::ConfigError::Message(
                "pipeline.relevance_k must be at least 1".to_string(),
            ));
        }

        if self.pipeline.research_k == 0 {
            return Err(config::ConfigError::Message(
                "pipeline.research_k must be at least 1".to_string(),
            ));
        }

        for (name, weight) in [
            ("retrieval.lexical_weight", self.retrieval.lexical_weight),
            ("retrieval.semantic_weight", self.retrieval.semantic_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(config::ConfigError::Message(format!(
                    "{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }

        Ok(())
    }

    pub fn fusion_config(&self) -> FusionConfig {
        FusionConfig::default()
            .with_source_timeout(std::time::Duration::from_millis(self.retrieval.source_timeout_ms))
            .with_per_source_limit(self.retrieval.per_source_limit)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_relevance_k(self.pipeline.relevance_k)
            .with_research_k(self.pipeline.research_k)
            .with_max_iterations(self.pipeline.max_iterations)
            .with_format_long_answers(self.pipeline.format_long_answers)
            .with_fusion(self.fusion_config())
    }
}
