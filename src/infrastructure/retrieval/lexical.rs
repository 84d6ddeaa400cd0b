//! In-memory BM25 keyword search
//!
//! Scores are computed with the standard Okapi BM25 weighting (k1 = 1.2,
//! b = 0.75). Terms are Unicode words, lower-cased. Documents that share no
//! term with the query are never returned.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use unicode_segmentation::UnicodeSegmentation;

use crate::domain::{DomainError, PassageLocation, RetrievalOrigin, RetrievalSource, RetrievedPassage};

const K1: f64 = 1.2;
const B: f64 = 0.75;

/// One searchable chunk of the corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub content: String,
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl CorpusEntry {
    pub fn new(content: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source_id: source_id.into(),
            page: None,
            offset: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    fn to_retrieved(&self) -> RetrievedPassage {
        let passage = RetrievedPassage::new(self.content.clone(), self.source_id.clone());
        if self.page.is_none() && self.offset.is_none() {
            return passage;
        }
        passage.with_location(PassageLocation {
            page: self.page,
            offset: self.offset,
        })
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// Load a corpus from a `.jsonl` file (one entry per line) or a JSON array
pub fn load_corpus(path: impl AsRef<Path>) -> Result<Vec<CorpusEntry>, DomainError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DomainError::configuration(format!("Failed to read corpus {}: {}", path.display(), e)))?;

    let is_jsonl = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"));

    let entries = if is_jsonl {
        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(number, line)| {
                serde_json::from_str::<CorpusEntry>(line).map_err(|e| {
                    DomainError::configuration(format!("{}:{}: invalid corpus entry: {}", path.display(), number + 1, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?
    } else {
        serde_json::from_str::<Vec<CorpusEntry>>(&raw)
            .map_err(|e| DomainError::configuration(format!("{}: invalid corpus: {}", path.display(), e)))?
    };

    info!(path = %path.display(), entries = entries.len(), "Loaded corpus");
    Ok(entries)
}

/// Term statistics for one document
#[derive(Debug, Clone)]
struct IndexedDocument {
    term_frequencies: HashMap<String, u32>,
    length: usize,
}

/// BM25 keyword search over an in-memory corpus
#[derive(Debug, Clone)]
pub struct LexicalSource {
    name: String,
    entries: Vec<CorpusEntry>,
    documents: Vec<IndexedDocument>,
    document_frequency: HashMap<String, usize>,
    average_length: f64,
}

impl LexicalSource {
    pub fn new(entries: Vec<CorpusEntry>) -> Self {
        let documents: Vec<IndexedDocument> = entries
            .iter()
            .map(|entry| {
                let terms = tokenize(&entry.content);
                let mut term_frequencies = HashMap::new();
                for term in &terms {
                    *term_frequencies.entry(term.clone()).or_insert(0) += 1;
                }
                IndexedDocument {
                    term_frequencies,
                    length: terms.len(),
                }
            })
            .collect();

        let mut document_frequency = HashMap::new();
        for doc in &documents {
            for term in doc.term_frequencies.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let total_length: usize = documents.iter().map(|d| d.length).sum();
        let average_length = if documents.is_empty() {
            0.0
        } else {
            total_length as f64 / documents.len() as f64
        };

        Self {
            name: "lexical".to_string(),
            entries,
            documents,
            document_frequency,
            average_length,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        Ok(Self::new(load_corpus(path)?))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.documents.len() as f64;
        let df = self.document_frequency.get(term).copied().unwrap_or(0) as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn score(&self, doc: &IndexedDocument, terms: &[(String, f64)]) -> f64 {
        let length_norm = if self.average_length > 0.0 {
            doc.length as f64 / self.average_length
        } else {
            0.0
        };

        terms
            .iter()
            .filter_map(|(term, idf)| {
                let tf = *doc.term_frequencies.get(term)? as f64;
                Some(idf * tf * (K1 + 1.0) / (tf + K1 * (1.0 - B + B * length_norm)))
            })
            .sum()
    }

    /// Ranked `(entry index, score)` pairs, best first
    fn rank(&self, query: &str, k: usize) -> Vec<(usize, f64)> {
        let mut seen = HashSet::new();
        let terms: Vec<(String, f64)> = tokenize(query)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .filter(|t| self.document_frequency.contains_key(t))
            .map(|t| {
                let idf = self.idf(&t);
                (t, idf)
            })
            .collect();

        if terms.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(index, doc)| (index, self.score(doc, &terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|(ia, sa), (ib, sb)| sb.total_cmp(sa).then_with(|| ia.cmp(ib)));
        scored.truncate(k);
        scored
    }
}

#[async_trait]
impl RetrievalSource for LexicalSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn origin(&self) -> RetrievalOrigin {
        RetrievalOrigin::Lexical
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, DomainError> {
        let ranked = self.rank(query, k);

        debug!(source = %self.name, hits = ranked.len(), "BM25 search complete");

        Ok(ranked
            .into_iter()
            .map(|(index, _)| self.entries[index].to_retrieved())
            .collect())
    }
}
