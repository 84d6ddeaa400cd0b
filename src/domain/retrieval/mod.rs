//! Retrieval domain
//!
//! Types shared by every search strategy and by the fusion step that merges
//! their rankings into a single deduplicated passage list.

mod diagnostics;
mod fusion;
mod hybrid;
mod passage;
mod source;

pub use diagnostics::{DIAGNOSTIC_TOP_N, RetrievalDiagnostics, ScoredSource, SourceDiagnostics};
pub use fusion::{DEFAULT_AGREEMENT_BONUS, FusedResults, FusionConfig, SourceHit, SourceReport, SourceStatus};
pub use hybrid::{HybridRetriever, WeightedSource};
pub use passage::{Fingerprint, Passage, PassageLocation, RetrievalOrigin, RetrievedPassage, normalize_text};
pub use source::RetrievalSource;

#[cfg(test)]
pub use source::mock::MockRetrievalSource;
