//! `/v1/ask` request and response bodies

use serde::{Deserialize, Serialize};

use crate::domain::PipelineAnswer;

#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Overrides the configured iteration bound
    #[serde(default)]
    pub max_iterations: Option<u32>,
    /// One weight per configured source, in configuration order
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
    #[serde(default)]
    pub include_diagnostics: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    #[serde(flatten)]
    pub answer: PipelineAnswer,
}

impl AskResponse {
    pub fn new(mut answer: PipelineAnswer, include_diagnostics: bool) -> Self {
        if !include_diagnostics {
            answer.diagnostics = None;
        }
        Self { answer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Relevance, Termination};

    #[test]
    fn test_ask_request_defaults() {
        let request: AskRequest = serde_json::from_str(r#"{"question": "How long do I knead?"}"#).unwrap();

        assert_eq!(request.question, "How long do I knead?");
        assert!(request.max_iterations.is_none());
        assert!(request.weights.is_none());
        assert!(!request.include_diagnostics);
    }

    #[test]
    fn test_response_drops_diagnostics_unless_asked() {
        let answer = PipelineAnswer::without_draft(uuid::Uuid::new_v4(), "no", Relevance::NotRelevant, Termination::Irrelevant)
            .with_diagnostics(Default::default());

        let json = serde_json::to_value(AskResponse::new(answer, false)).unwrap();

        assert!(json.get("diagnostics").is_none());
        assert_eq!(json["termination"], "irrelevant");
        assert_eq!(json["relevance"], "NOT_RELEVANT");
    }
}
