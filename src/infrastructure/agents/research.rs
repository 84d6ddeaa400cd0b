use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{AgentConfig, ChatAgent};
use crate::domain::{DomainError, DraftGenerator, LlmProvider, Passage};

/// Draft used when the model returns an empty completion
pub const EMPTY_DRAFT_FALLBACK: &str = "I cannot answer this question.";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions about the user's own material.

Instructions:
- Answer the question using only the information you are given.
- If the information is not there, say you don't know or can't answer. Never make anything up.
- Be clear, concise, and factual.
- Don't mention \"context\", \"documents\", or \"provided information\" in your answer.
- Just give the answer naturally as if you know it.
- Never say things like \"based on the provided context\" or \"according to the documents\".";

/// Drafts answers from the fused passages, in fused order
#[derive(Debug, Clone)]
pub struct LlmDraftGenerator {
    agent: ChatAgent,
}

impl LlmDraftGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self {
            agent: ChatAgent::new(provider, config),
        }
    }

    fn build_prompt(question: &str, passages: &[Passage]) -> String {
        let context = passages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "Question: {}\n\nInformation:\n{}\n\nProvide your answer below:",
            question, context
        )
    }
}

#[async_trait]
impl DraftGenerator for LlmDraftGenerator {
    async fn draft(&self, question: &str, passages: &[Passage]) -> Result<String, DomainError> {
        let prompt = Self::build_prompt(question, passages);
        debug!(passages = passages.len(), context_chars = prompt.len(), "Drafting answer");

        let text = self.agent.complete("answer generation", SYSTEM_PROMPT, prompt, None).await?;

        if text.is_empty() {
            return Ok(EMPTY_DRAFT_FALLBACK.to_string());
        }
        Ok(text)
    }
}
