use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{AgentConfig, ChatAgent};
use crate::domain::{
    DomainError, HybridRetriever, LlmProvider, Passage, Relevance, RelevanceAssessment, RelevanceClassifier,
};

/// Candidates shown to the classifier are cut to this many characters
const CANDIDATE_PREVIEW_CHARS: usize = 600;

const SYSTEM_PROMPT: &str = "You decide whether a set of passages from a user's documents can answer a question.

Reply with exactly one label and nothing else:
- CAN_ANSWER: the passages contain enough information to answer the question fully.
- PARTIAL: the passages cover the topic but only answer part of the question.
- NOT_RELEVANT: the passages do not address the question.";

/// Classifies questions by showing the model a broad candidate set
#[derive(Debug, Clone)]
pub struct LlmRelevanceClassifier {
    agent: ChatAgent,
    candidate_count: usize,
}

impl LlmRelevanceClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self {
            agent: ChatAgent::new(provider, config),
            candidate_count: 20,
        }
    }

    pub fn with_candidate_count(mut self, k: usize) -> Self {
        self.candidate_count = k;
        self
    }

    fn build_prompt(question: &str, passages: &[Passage]) -> String {
        let numbered: Vec<String> = passages
            .iter()
            .enumerate()
            .map(|(i, p)| format!("[{}] {}", i + 1, preview(&p.content)))
            .collect();

        format!(
            "Question: {}\n\nPassages:\n{}\n\nLabel:",
            question,
            numbered.join("\n\n")
        )
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() <= CANDIDATE_PREVIEW_CHARS {
        return content.to_string();
    }
    let mut short: String = content.chars().take(CANDIDATE_PREVIEW_CHARS).collect();
    short.push_str("...");
    short
}

#[async_trait]
impl RelevanceClassifier for LlmRelevanceClassifier {
    async fn classify(
        &self,
        question: &str,
        retriever: &HybridRetriever,
    ) -> Result<RelevanceAssessment, DomainError> {
        let candidates = retriever.fuse(question, self.candidate_count).await;

        if candidates.is_empty() {
            if candidates.all_failed() {
                warn!("No retrieval source answered the relevance search");
            } else {
                info!("Relevance search found no candidates");
            }
            return Ok(RelevanceAssessment::new(Relevance::NotRelevant, candidates));
        }

        let prompt = Self::build_prompt(question, &candidates.passages);
        let text = self.agent.complete("relevance classification", SYSTEM_PROMPT, prompt, Some(16)).await?;

        if text.is_empty() {
            return Err(DomainError::parse("Relevance classifier returned an empty response"));
        }

        let relevance = Relevance::from_label(&text).ok_or_else(|| {
            DomainError::parse(format!("No relevance label in classifier response: {}", preview(&text)))
        })?;

        info!(relevance = %relevance, candidates = candidates.len(), "Question classified");

        Ok(RelevanceAssessment::new(relevance, candidates))
    }
}
