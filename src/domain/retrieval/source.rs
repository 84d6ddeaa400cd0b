//! Retrieval source trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::passage::{RetrievalOrigin, RetrievedPassage};
use crate::domain::DomainError;

/// A single search strategy over the corpus
///
/// Implementations are injected once and shared by concurrent runs; `search`
/// must be safe to call from several tasks at the same time.
#[async_trait]
pub trait RetrievalSource: Send + Sync + Debug {
    /// Name used in logs, metrics and diagnostics
    fn name(&self) -> &str;

    /// Strategy this source implements
    fn origin(&self) -> RetrievalOrigin;

    /// Return up to `k` passages, best first
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, DomainError>;
}

#[cfg(test)]
pub mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Mock retrieval source for testing
    #[derive(Debug)]
    pub struct MockRetrievalSource {
        name: String,
        origin: RetrievalOrigin,
        results: Vec<RetrievedPassage>,
        error: Option<String>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl MockRetrievalSource {
        pub fn new(name: impl Into<String>, origin: RetrievalOrigin) -> Self {
            Self {
                name: name.into(),
                origin,
                results: Vec::new(),
                error: None,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn lexical() -> Self {
            Self::new("lexical", RetrievalOrigin::Lexical)
        }

        pub fn semantic() -> Self {
            Self::new("semantic", RetrievalOrigin::Semantic)
        }

        pub fn with_results(mut self, results: Vec<RetrievedPassage>) -> Self {
            self.results = results;
            self
        }

        /// Shorthand for results given as `(content, source_id)` pairs
        pub fn with_passages(self, passages: &[(&str, &str)]) -> Self {
            let results = passages
                .iter()
                .map(|(content, source_id)| RetrievedPassage::new(*content, *source_id))
                .collect();
            self.with_results(results)
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RetrievalSource for MockRetrievalSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn origin(&self) -> RetrievalOrigin {
            self.origin
        }

        async fn search(&self, _query: &str, k: usize) -> Result<Vec<RetrievedPassage>, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(ref error) = self.error {
                return Err(DomainError::provider(self.name.clone(), error));
            }

            Ok(self.results.iter().take(k).cloned().collect())
        }
    }
}
