//! Relevance categories

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::retrieval::FusedResults;

static RELEVANCE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(can[ _]answer|partial|not[ _]relevant)\b").unwrap()
});

/// Whether the corpus can plausibly answer a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relevance {
    CanAnswer,
    Partial,
    NotRelevant,
}

impl Relevance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CanAnswer => "CAN_ANSWER",
            Self::Partial => "PARTIAL",
            Self::NotRelevant => "NOT_RELEVANT",
        }
    }

    /// `CanAnswer` and `Partial` both let the pipeline continue
    pub fn permits_answer(&self) -> bool {
        !matches!(self, Self::NotRelevant)
    }

    /// First relevance label found in a model response
    pub fn from_label(text: &str) -> Option<Self> {
        let found = RELEVANCE_LABEL.captures(text)?;
        let label = found[1].to_ascii_uppercase().replace(' ', "_");

        match label.as_str() {
            "CAN_ANSWER" => Some(Self::CanAnswer),
            "PARTIAL" => Some(Self::Partial),
            "NOT_RELEVANT" => Some(Self::NotRelevant),
            _ => None,
        }
    }
}

impl fmt::Display for Relevance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output together with the candidate set it was based on
#[derive(Debug, Clone)]
pub struct RelevanceAssessment {
    pub relevance: Relevance,
    pub candidates: FusedResults,
}

impl RelevanceAssessment {
    pub fn new(relevance: Relevance, candidates: FusedResults) -> Self {
        Self { relevance, candidates }
    }

    /// True when no source could be searched at all
    pub fn search_unavailable(&self) -> bool {
        self.candidates.is_empty() && self.candidates.all_failed()
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }
}
