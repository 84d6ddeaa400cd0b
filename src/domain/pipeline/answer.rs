//! Final answer, citations and answer formatting

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::relevance::Relevance;
use crate::domain::retrieval::{Passage, RetrievalDiagnostics, RetrievalOrigin};
use crate::domain::verification::VerificationReport;

/// Note appended to the verification notes when the budget runs out
pub const UNVERIFIED_NOTE: &str = "best-effort, unverified";

/// Longest excerpt shown in a citation, in characters
pub const CITATION_EXCERPT_CHARS: usize = 200;

const VAGUE_PHRASES: &[&str] = &[
    "i don't know",
    "i cannot answer",
    "the context doesn't",
    "not mentioned",
    "no information",
    "i don't have enough information",
];

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The classifier judged the question unrelated to the corpus
    Irrelevant,
    /// No passages could be retrieved
    SearchUnavailable,
    /// The last draft passed verification
    Verified,
    /// Every pass failed verification; the last draft is returned unverified
    BudgetExhausted,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Irrelevant => "irrelevant",
            Self::SearchUnavailable => "search_unavailable",
            Self::Verified => "verified",
            Self::BudgetExhausted => "budget_exhausted",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a citation points at a web page or an uploaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    Web,
    Document,
}

/// Display form of a passage used for the final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source_id: String,
    /// URL for web sources, file name otherwise
    pub document: String,
    pub kind: CitationKind,
    /// One-based page number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub excerpt: String,
    pub origin: RetrievalOrigin,
    pub score: f64,
}

impl Citation {
    pub fn from_passage(passage: &Passage) -> Self {
        let source = passage.source_id.trim();
        let is_web = source.starts_with("http://") || source.starts_with("https://");

        let document = if is_web {
            source.to_string()
        } else {
            Path::new(source)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| source.to_string())
        };

        Self {
            source_id: passage.source_id.clone(),
            document,
            kind: if is_web { CitationKind::Web } else { CitationKind::Document },
            page: passage.location.and_then(|l| l.page).map(|p| p + 1),
            excerpt: excerpt(&passage.content),
            origin: passage.origin,
            score: passage.fused_score,
        }
    }
}

fn excerpt(content: &str) -> String {
    if content.chars().count() <= CITATION_EXCERPT_CHARS {
        return content.to_string();
    }
    let mut short: String = content.chars().take(CITATION_EXCERPT_CHARS).collect();
    short.push_str("...");
    short
}

/// Result of a completed pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineAnswer {
    pub run_id: Uuid,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub verification: VerificationReport,
    pub verified: bool,
    /// Research passes performed
    pub iterations: u32,
    pub relevance: Relevance,
    pub termination: Termination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<RetrievalDiagnostics>,
    pub completed_at: DateTime<Utc>,
}

impl PipelineAnswer {
    /// Answer for a run that ended before any draft was made
    pub fn without_draft(
        run_id: Uuid,
        answer: impl Into<String>,
        relevance: Relevance,
        termination: Termination,
    ) -> Self {
        Self {
            run_id,
            answer: answer.into(),
            citations: Vec::new(),
            verification: VerificationReport::unknown(),
            verified: false,
            iterations: 0,
            relevance,
            termination,
            diagnostics: None,
            completed_at: Utc::now(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: RetrievalDiagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }
}

/// Render a long answer as bullet points
///
/// Applies to answers of more than 50 words and more than 3 sentences.
/// Sentences of 5 words or fewer are dropped, and answers admitting they
/// cannot answer are left as they are.
pub fn format_long_answer(answer: &str) -> String {
    let lowered = answer.to_lowercase();
    if VAGUE_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        return answer.to_string();
    }

    if answer.split_whitespace().count() <= 50 {
        return answer.to_string();
    }

    let sentences: Vec<&str> = answer
        .split(". ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.len() <= 3 {
        return answer.to_string();
    }

    let bullets: Vec<String> = sentences
        .into_iter()
        .filter(|s| s.split_whitespace().count() > 5)
        .map(|s| {
            if s.ends_with(['.', '!', '?']) {
                format!("• {}", s)
            } else {
                format!("• {}.", s)
            }
        })
        .collect();

    if bullets.is_empty() {
        return answer.to_string();
    }
    bullets.join("\n\n")
}
