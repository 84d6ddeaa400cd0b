//! Passage and fingerprint types

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Search strategy a passage came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalOrigin {
    /// Term-frequency search
    Lexical,
    /// Embedding-similarity search
    Semantic,
}

impl RetrievalOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Semantic => "semantic",
        }
    }
}

impl fmt::Display for RetrievalOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where inside the source document a passage sits
///
/// `page` is zero-based as produced by document extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl PassageLocation {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            offset: None,
        }
    }

    pub fn offset(offset: u64) -> Self {
        Self {
            page: None,
            offset: Some(offset),
        }
    }
}

/// A passage as returned by one retrieval source, best-first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub content: String,
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<PassageLocation>,
}

impl RetrievedPassage {
    pub fn new(content: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source_id: source_id.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: PassageLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.content, &self.source_id)
    }
}

/// Lowercase and collapse every whitespace run to a single space
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Identity of a passage for deduplication
///
/// Case and whitespace differences in either the content or the source id do
/// not change the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(content: &str, source_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalize_text(source_id).as_bytes());
        hasher.update([0x1f]);
        hasher.update(normalize_text(content).as_bytes());

        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A passage after fusion, carrying its citation metadata and fused score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<PassageLocation>,
    /// Strategy of the representative (highest scoring) hit
    pub origin: RetrievalOrigin,
    /// Zero-based rank within the representative source
    pub rank: usize,
    pub fused_score: f64,
    pub fingerprint: Fingerprint,
}

impl Passage {
    pub fn from_retrieved(
        retrieved: RetrievedPassage,
        origin: RetrievalOrigin,
        rank: usize,
        fused_score: f64,
    ) -> Self {
        let fingerprint = retrieved.fingerprint();
        Self {
            content: retrieved.content,
            source_id: retrieved.source_id,
            location: retrieved.location,
            origin,
            rank,
            fused_score,
            fingerprint,
        }
    }
}
