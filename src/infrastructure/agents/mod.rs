//! LLM-backed pipeline stages

mod relevance;
mod research;
mod verifier;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::debug;

use crate::domain::{DomainError, LlmProvider, LlmRequest};

pub use relevance::LlmRelevanceClassifier;
pub use research::{EMPTY_DRAFT_FALLBACK, LlmDraftGenerator};
pub use verifier::LlmAnswerVerifier;

pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Model settings shared by every agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Deadline for one completion call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AgentConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Provider plus settings; issues one bounded completion per call
#[derive(Debug, Clone)]
struct ChatAgent {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
}

impl ChatAgent {
    fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// Completion text, trimmed; empty when the model returned nothing
    async fn complete(
        &self,
        operation: &'static str,
        system: &str,
        user: String,
        max_tokens: Option<u32>,
    ) -> Result<String, DomainError> {
        let request = LlmRequest::builder()
            .system(system)
            .user(user)
            .temperature(self.config.temperature)
            .max_tokens(max_tokens.unwrap_or(self.config.max_tokens))
            .build();

        let future = self.provider.chat(&self.config.model, request);
        let response = match timeout(self.config.timeout(), future).await {
            Ok(result) => result?,
            Err(_) => return Err(DomainError::timeout(operation, self.config.timeout_ms)),
        };

        debug!(
            operation,
            provider = self.provider.provider_name(),
            model = %self.config.model,
            "Completion received"
        );

        Ok(response.content().map(str::trim).unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;

    #[tokio::test]
    async fn test_complete_trims_text() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_response("  CAN_ANSWER \n"));
        let agent = ChatAgent::new(provider.clone(), AgentConfig::default());

        let text = agent.complete("classify", "system", "user".to_string(), Some(8)).await.unwrap();

        assert_eq!(text, "CAN_ANSWER");
        let request = &provider.requests()[0];
        assert_eq!(request.max_tokens, Some(8));
        assert_eq!(request.temperature, Some(0.1));
        assert_eq!(request.last_user_text(), Some("user"));
    }

    #[tokio::test]
    async fn test_complete_times_out() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_response("late").with_delay(Duration::from_millis(300)));
        let config = AgentConfig::default().with_timeout(Duration::from_millis(20));
        let agent = ChatAgent::new(provider, config);

        let err = agent.complete("draft", "system", "user".to_string(), None).await.unwrap_err();

        assert!(err.is_timeout());
        assert!(err.to_string().contains("draft"));
    }

    #[test]
    fn test_config_defaults() {
        let config = AgentConfig::default();

        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }
}
