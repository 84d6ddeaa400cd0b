use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{AgentConfig, ChatAgent};
use crate::domain::{AnswerVerifier, DomainError, LlmProvider, Passage, VerificationReport};

const SYSTEM_PROMPT: &str = "You check an answer against the passages it was written from.

Respond with exactly this block and nothing else:
Supported: YES or NO
Unsupported Claims: [claims in the answer that the passages do not back up]
Contradictions: [statements in the answer that the passages contradict]
Relevant: YES or NO
Confidence: HIGH, MEDIUM or LOW
Additional Details: one or two sentences

Write [] when a list is empty.";

/// Asks the model for the fixed label block and parses it
#[derive(Debug, Clone)]
pub struct LlmAnswerVerifier {
    agent: ChatAgent,
}

impl LlmAnswerVerifier {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self {
            agent: ChatAgent::new(provider, config),
        }
    }

    fn build_prompt(draft: &str, passages: &[Passage]) -> String {
        let evidence = passages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        format!("Answer:\n{}\n\nPassages:\n{}", draft, evidence)
    }
}

#[async_trait]
impl AnswerVerifier for LlmAnswerVerifier {
    async fn verify(&self, draft: &str, passages: &[Passage]) -> Result<VerificationReport, DomainError> {
        let prompt = Self::build_prompt(draft, passages);
        debug!(passages = passages.len(), "Verifying draft");

        let text = self.agent.complete("answer verification", SYSTEM_PROMPT, prompt, Some(512)).await?;

        if text.is_empty() {
            return Err(DomainError::parse("Verifier returned an empty response"));
        }

        let report = VerificationReport::parse(&text);
        info!(
            supported = %report.supported,
            relevant = %report.relevant,
            "Draft verified"
        );

        Ok(report)
    }
}
