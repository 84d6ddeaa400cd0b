//! DocuBot
//!
//! Verified question answering over a private document corpus:
//! - Hybrid retrieval fusing lexical and semantic rankings
//! - Relevance gating before any answer is drafted
//! - Bounded draft / verify loop with cited, grounded answers

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use anyhow::Context;
use api::state::AppState;
use domain::retrieval::WeightedSource;
use domain::{LlmProvider, RetrievalOrigin};
use infrastructure::{
    agents::{LlmAnswerVerifier, LlmDraftGenerator, LlmRelevanceClassifier},
    llm::{HttpClient, OpenAiCompatibleProvider},
    pipeline::PipelineOrchestrator,
    retrieval::{HttpSearchSource, LexicalSource},
};
use tracing::{info, warn};

/// Create the application state from the layered configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::load()?).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    config.validate()?;
    let provider = create_llm_provider(config)?;
    let sources = create_sources(config)?;

    if sources.is_empty() {
        warn!("No retrieval sources configured; set retrieval.corpus_path or retrieval.semantic_endpoint");
    }

    let pipeline = create_pipeline(provider, config);
    Ok(AppState::new(pipeline, sources))
}

/// Wire the three agents around one provider
pub fn create_pipeline(provider: Arc<dyn LlmProvider>, config: &AppConfig) -> PipelineOrchestrator {
    let agent = config.llm.agent.clone();
    let pipeline_config = config.pipeline_config();

    let classifier = LlmRelevanceClassifier::new(provider.clone(), agent.clone())
        .with_candidate_count(pipeline_config.relevance_k);
    let generator = LlmDraftGenerator::new(provider.clone(), agent.clone());
    let verifier = LlmAnswerVerifier::new(provider, agent);

    PipelineOrchestrator::new(
        Arc::new(classifier),
        Arc::new(generator),
        Arc::new(verifier),
        pipeline_config,
    )
}

fn create_llm_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let api_key = config
        .llm
        .resolve_api_key()
        .context("No LLM API key configured; set GROQ_API_KEY or DOCUBOT__LLM__API_KEY")?;

    let client = HttpClient::with_timeout(config.llm.agent.timeout())?;
    let provider = OpenAiCompatibleProvider::new(client, api_key, config.llm.base_url.clone());

    info!(
        base_url = %config.llm.base_url,
        model = %config.llm.agent.model,
        "Using OpenAI-compatible chat provider"
    );
    Ok(Arc::new(provider))
}

/// Lexical source from the corpus file, semantic source from the search endpoint
fn create_sources(config: &AppConfig) -> anyhow::Result<Vec<WeightedSource>> {
    let retrieval = &config.retrieval;
    let mut sources = Vec::new();

    if let Some(path) = &retrieval.corpus_path {
        let lexical = LexicalSource::from_path(path)
            .with_context(|| format!("Failed to load lexical corpus from {}", path))?;
        info!(path = %path, passages = lexical.len(), weight = retrieval.lexical_weight, "Lexical source ready");
        sources.push(WeightedSource {
            source: Arc::new(lexical),
            weight: retrieval.lexical_weight,
        });
    }

    if let Some(endpoint) = &retrieval.semantic_endpoint {
        let client = HttpClient::with_timeout(config.fusion_config().source_timeout())?.named("semantic");
        let mut semantic = HttpSearchSource::new(client, endpoint.clone())
            .with_name("semantic")
            .with_origin(RetrievalOrigin::Semantic);
        if let Some(key) = &retrieval.semantic_api_key {
            semantic = semantic.with_api_key(key);
        }
        info!(endpoint = %endpoint, weight = retrieval.semantic_weight, "Semantic source ready");
        sources.push(WeightedSource {
            source: Arc::new(semantic),
            weight: retrieval.semantic_weight,
        });
    }

    Ok(sources)
}
