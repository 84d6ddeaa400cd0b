//! Verification report and its label parser

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A YES/NO judgment that may be missing from the verifier output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Yes,
    No,
    Unknown,
}

impl Verdict {
    fn from_token(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "YES" => Self::Yes,
            "NO" => Self::No,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// `**Supported:** YES`, `- supported: no`, `Supported : Yes.`
static LABEL_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\s\-\*#>]*\**\s*([A-Za-z][A-Za-z ]*?)\s*\**\s*:\s*\**\s*(.*?)\s*\**\s*$").unwrap()
});

static VERDICT_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?i)(yes|no)\b").unwrap());

/// Structured verdict on a draft answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub supported: Verdict,
    pub relevant: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    /// Verifier output exactly as received
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw: String,
}

impl Default for VerificationReport {
    fn default() -> Self {
        Self::unknown()
    }
}

impl VerificationReport {
    /// Report for a run that never reached verification
    pub fn unknown() -> Self {
        Self {
            supported: Verdict::Unknown,
            relevant: Verdict::Unknown,
            confidence: None,
            notes: Vec::new(),
            raw: String::new(),
        }
    }

    pub fn new(supported: Verdict, relevant: Verdict) -> Self {
        Self {
            supported,
            relevant,
            ..Self::unknown()
        }
    }

    pub fn with_confidence(mut self, confidence: impl Into<String>) -> Self {
        self.confidence = Some(confidence.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Parse the fixed label block produced by the verifier prompt
    ///
    /// Labels that are missing or carry anything other than YES/NO become
    /// `Verdict::Unknown`. The first occurrence of each label wins.
    pub fn parse(text: &str) -> Self {
        let mut supported = None;
        let mut relevant = None;
        let mut confidence = None;
        let mut unsupported_claims = None;
        let mut contradictions = None;
        let mut details = None;

        for line in text.lines() {
            let Some(caps) = LABEL_LINE.captures(line) else {
                continue;
            };
            let label = caps[1].trim().to_ascii_lowercase();
            let value = caps[2].trim().to_string();

            match label.as_str() {
                "supported" if supported.is_none() => supported = Some(parse_verdict(&value)),
                "relevant" if relevant.is_none() => relevant = Some(parse_verdict(&value)),
                "confidence" if confidence.is_none() => {
                    if !is_empty_value(&value) {
                        confidence = Some(value.trim_end_matches('.').to_ascii_uppercase());
                    }
                }
                "unsupported claims" if unsupported_claims.is_none() => unsupported_claims = Some(value),
                "contradictions" if contradictions.is_none() => contradictions = Some(value),
                "additional details" if details.is_none() => details = Some(value),
                _ => {}
            }
        }

        let notes = [
            ("Unsupported claims", unsupported_claims),
            ("Contradictions", contradictions),
            ("Additional details", details),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .filter(|v| !is_empty_value(v))
                .map(|v| format!("{}: {}", label, v))
        })
        .collect();

        Self {
            supported: supported.unwrap_or(Verdict::Unknown),
            relevant: relevant.unwrap_or(Verdict::Unknown),
            confidence,
            notes,
            raw: text.to_string(),
        }
    }

    /// Whether the orchestrator should draft again
    ///
    /// An answer that is not explicitly supported is retried; relevance only
    /// triggers a retry on an explicit NO.
    pub fn needs_retry(&self) -> bool {
        self.supported != Verdict::Yes || self.relevant == Verdict::No
    }

    pub fn passed(&self) -> bool {
        !self.needs_retry()
    }
}

fn parse_verdict(value: &str) -> Verdict {
    let cleaned = value.trim_matches(|c: char| c == '*' || c == '`' || c == '"' || c.is_whitespace());
    VERDICT_TOKEN
        .captures(cleaned)
        .map(|caps| Verdict::from_token(&caps[1]))
        .unwrap_or(Verdict::Unknown)
}

fn is_empty_value(value: &str) -> bool {
    let inner = value.trim().trim_start_matches('[').trim_end_matches(']').trim();
    inner.is_empty()
        || inner.eq_ignore_ascii_case("none")
        || inner.eq_ignore_ascii_case("n/a")
        || inner == "-"
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Supported: {}", self.supported)?;
        writeln!(f, "Relevant: {}", self.relevant)?;
        if let Some(ref confidence) = self.confidence {
            writeln!(f, "Confidence: {}", confidence)?;
        }
        for note in &self.notes {
            writeln!(f, "- {}", note)?;
        }
        Ok(())
    }
}
