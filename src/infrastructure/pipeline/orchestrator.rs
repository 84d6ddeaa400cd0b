//! Pipeline orchestrator
//!
//! Drives one question through the bounded state machine:
//!
//! ```text
//! INIT -> CHECK_RELEVANCE -> IRRELEVANT -> END
//!                         -> RESEARCH -> VERIFY -> PASS -> END
//!                                               -> FAIL -> RESEARCH   (iteration < max)
//!                                               -> FAIL -> END        (iteration == max)
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::domain::pipeline::{UNVERIFIED_NOTE, format_long_answer};
use crate::domain::{
    AnswerVerifier, CancellationToken, Citation, DraftGenerator, HybridRetriever, IRRELEVANT_QUESTION_MESSAGE,
    PipelineAnswer, PipelineConfig, PipelineError, PipelineRequest, PipelineState, Relevance, RelevanceClassifier,
    RetrievalDiagnostics, SEARCH_UNAVAILABLE_MESSAGE, Termination,
};
use crate::infrastructure::observability::{record_pipeline_error, record_pipeline_run};

/// Sequences the relevance, research and verification stages
pub struct PipelineOrchestrator {
    classifier: Arc<dyn RelevanceClassifier>,
    generator: Arc<dyn DraftGenerator>,
    verifier: Arc<dyn AnswerVerifier>,
    config: PipelineConfig,
}

impl fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Race a stage against the cancellation token
async fn until_cancelled<F: Future>(token: &CancellationToken, stage: F) -> Result<F::Output, PipelineError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(PipelineError::Cancelled),
        output = stage => Ok(output),
    }
}

impl PipelineOrchestrator {
    pub fn new(
        classifier: Arc<dyn RelevanceClassifier>,
        generator: Arc<dyn DraftGenerator>,
        verifier: Arc<dyn AnswerVerifier>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            classifier,
            generator,
            verifier,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer a question; dropping the returned future abandons every in-flight call
    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineAnswer, PipelineError> {
        self.run_with_cancellation(request, &CancellationToken::new()).await
    }

    /// Answer a question, stopping with `PipelineError::Cancelled` once `token` fires
    pub async fn run_with_cancellation(
        &self,
        request: PipelineRequest,
        token: &CancellationToken,
    ) -> Result<PipelineAnswer, PipelineError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let span = info_span!("pipeline_run", run_id = %run_id);

        let result = self.execute(run_id, request, token).instrument(span).await;

        match &result {
            Ok(answer) => {
                info!(
                    run_id = %run_id,
                    termination = %answer.termination,
                    iterations = answer.iterations,
                    verified = answer.verified,
                    "Pipeline run finished"
                );
                record_pipeline_run(answer.termination, answer.iterations, started.elapsed());
            }
            Err(e) => {
                warn!(run_id = %run_id, stage = %e.stage(), error = %e, "Pipeline run failed");
                record_pipeline_error(e.stage(), started.elapsed());
            }
        }

        result
    }

    async fn execute(
        &self,
        run_id: Uuid,
        request: PipelineRequest,
        token: &CancellationToken,
    ) -> Result<PipelineAnswer, PipelineError> {
        request.validate()?;

        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let retriever = HybridRetriever::from_parts(request.sources, &request.weights, self.config.fusion.clone())
            .map_err(|e| PipelineError::invalid_request(e.to_string()))?;
        let mut state = PipelineState::new(request.question, request.max_iterations);

        info!(
            sources = retriever.sources().len(),
            max_iterations = state.max_iterations(),
            "Pipeline run started"
        );

        // CHECK_RELEVANCE
        let assessment = until_cancelled(token, self.classifier.classify(state.question(), &retriever))
            .await?
            .map_err(PipelineError::Classification)?;

        let relevance = assessment.relevance;
        let mut diagnostics = RetrievalDiagnostics::from_results(&assessment.candidates);
        state.set_relevance(relevance);

        if !relevance.permits_answer() {
            let (text, termination) = if assessment.search_unavailable() {
                (SEARCH_UNAVAILABLE_MESSAGE, Termination::SearchUnavailable)
            } else {
                (IRRELEVANT_QUESTION_MESSAGE, Termination::Irrelevant)
            };
            info!(termination = %termination, "Question cannot be answered from the corpus");
            return Ok(PipelineAnswer::without_draft(run_id, text, relevance, termination).with_diagnostics(diagnostics));
        }

        // RESEARCH -> VERIFY, bounded by max_iterations
        while state.begin_pass() {
            let iteration = state.iteration();

            let fused = until_cancelled(token, retriever.fuse(state.question(), self.config.research_k)).await?;
            diagnostics = RetrievalDiagnostics::from_results(&fused);

            if fused.is_empty() {
                warn!(iteration, failed_sources = fused.failed_sources(), "Research retrieval returned no passages");
                let mut answer = PipelineAnswer::without_draft(
                    run_id,
                    SEARCH_UNAVAILABLE_MESSAGE,
                    relevance,
                    Termination::SearchUnavailable,
                )
                .with_diagnostics(diagnostics);
                answer.iterations = iteration;
                return Ok(answer);
            }

            state.replace_passages(fused.into_passages());
            debug!(iteration, passages = state.passages().len(), "Research passages fetched");

            let draft = until_cancelled(token, self.generator.draft(state.question(), state.passages()))
                .await?
                .map_err(PipelineError::Generation)?;
            state.record_draft(draft);

            let report = until_cancelled(token, self.verifier.verify(state.draft_answer(), state.passages()))
                .await?
                .map_err(PipelineError::Verification)?;

            let passed = report.passed();
            info!(
                iteration,
                supported = %report.supported,
                relevant = %report.relevant,
                passed,
                "Draft verified"
            );
            state.record_verification(report);

            if passed {
                return Ok(self.finish(run_id, state, relevance, Termination::Verified, diagnostics));
            }

            if state.has_budget() {
                info!(iteration, "Verification failed, researching again");
            }
        }

        warn!(iterations = state.iteration(), "Iteration budget exhausted, returning unverified draft");
        Ok(self.finish(run_id, state, relevance, Termination::BudgetExhausted, diagnostics))
    }

    fn finish(
        &self,
        run_id: Uuid,
        mut state: PipelineState,
        relevance: Relevance,
        termination: Termination,
        diagnostics: RetrievalDiagnostics,
    ) -> PipelineAnswer {
        let verified = termination == Termination::Verified;

        let mut verification = state.take_verification().unwrap_or_default();
        let answer = if verified && self.config.format_long_answers {
            format_long_answer(state.draft_answer())
        } else {
            state.draft_answer().to_string()
        };
        if !verified {
            verification.notes.push(UNVERIFIED_NOTE.to_string());
        }

        PipelineAnswer {
            run_id,
            answer,
            citations: state.passages().iter().map(Citation::from_passage).collect(),
            verification,
            verified,
            iterations: state.iteration(),
            relevance,
            termination,
            diagnostics: Some(diagnostics),
            completed_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::llm::MockLlmProvider;
    use crate::domain::pipeline::{MockAnswerVerifier, MockDraftGenerator, MockRelevanceClassifier};
    use crate::domain::retrieval::MockRetrievalSource;
    use crate::domain::{
        DomainError, FusedResults, GENERATION_FAILED_MESSAGE, Passage, PipelineStage, RelevanceAssessment, Verdict,
        VerificationReport,
    };
    use crate::infrastructure::agents::{AgentConfig, LlmRelevanceClassifier};

    fn cooking_request(question: &str) -> PipelineRequest {
        PipelineRequest::new(question)
            .with_source(
                Arc::new(MockRetrievalSource::lexical().with_passages(&[
                    ("Knead the dough for ten minutes.", "bread.pdf"),
                    ("Whisk the eggs until fluffy.", "cakes.pdf"),
                ])),
                0.4,
            )
            .with_source(
                Arc::new(MockRetrievalSource::semantic().with_passages(&[("Bake the loaf at 220C.", "bread.pdf")])),
                0.6,
            )
    }

    fn classifier_returning(relevance: Relevance) -> MockRelevanceClassifier {
        let mut classifier = MockRelevanceClassifier::new();
        classifier
            .expect_classify()
            .times(1)
            .returning(move |_, _| Ok(RelevanceAssessment::new(relevance, FusedResults::empty())));
        classifier
    }

    fn verdict(supported: Verdict, relevant: Verdict) -> VerificationReport {
        VerificationReport::new(supported, relevant)
    }

    fn orchestrator(
        classifier: impl RelevanceClassifier + 'static,
        generator: impl DraftGenerator + 'static,
        verifier: impl AnswerVerifier + 'static,
    ) -> PipelineOrchestrator {
        PipelineOrchestrator::new(
            Arc::new(classifier),
            Arc::new(generator),
            Arc::new(verifier),
            PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_irrelevant_question_short_circuits() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_response("NOT_RELEVANT"));
        let classifier = LlmRelevanceClassifier::new(provider.clone(), AgentConfig::default());

        let mut generator = MockDraftGenerator::new();
        generator.expect_draft().times(0);
        let mut verifier = MockAnswerVerifier::new();
        verifier.expect_verify().times(0);

        let answer = orchestrator(classifier, generator, verifier)
            .run(cooking_request("What is the capital of Mars?"))
            .await
            .unwrap();

        assert_eq!(answer.relevance, Relevance::NotRelevant);
        assert_eq!(answer.answer, IRRELEVANT_QUESTION_MESSAGE);
        assert_eq!(answer.termination, Termination::Irrelevant);
        assert!(!answer.verified);
        assert!(answer.citations.is_empty());
        assert_eq!(answer.iterations, 0);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_verified_on_first_pass() {
        let mut generator = MockDraftGenerator::new();
        generator
            .expect_draft()
            .times(1)
            .returning(|_, passages| Ok(format!("Bake it at 220C ({} passages).", passages.len())));
        let mut verifier = MockAnswerVerifier::new();
        verifier
            .expect_verify()
            .times(1)
            .returning(|_, _| Ok(verdict(Verdict::Yes, Verdict::Yes)));

        let answer = orchestrator(classifier_returning(Relevance::CanAnswer), generator, verifier)
            .run(cooking_request("How hot should the oven be?"))
            .await
            .unwrap();

        assert!(answer.verified);
        assert_eq!(answer.termination, Termination::Verified);
        assert_eq!(answer.iterations, 1);
        assert_eq!(answer.answer, "Bake it at 220C (3 passages).");
        assert_eq!(answer.citations.len(), 3);
        assert_eq!(answer.citations[0].excerpt, "Bake the loaf at 220C.");
        assert!(answer.verification.notes.is_empty());
        assert!(answer.diagnostics.is_some());
    }

    #[tokio::test]
    async fn test_second_pass_passes_verification() {
        let drafts = AtomicUsize::new(0);
        let mut generator = MockDraftGenerator::new();
        generator.expect_draft().times(2).returning(move |_, _| {
            let n = drafts.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("draft {}", n))
        });

        let mut verifier = MockAnswerVerifier::new();
        let mut checks = 0;
        verifier.expect_verify().times(2).returning(move |draft, _| {
            checks += 1;
            if checks == 1 {
                assert_eq!(draft, "draft 1");
                Ok(verdict(Verdict::No, Verdict::Yes))
            } else {
                assert_eq!(draft, "draft 2");
                Ok(verdict(Verdict::Yes, Verdict::Yes))
            }
        });

        let answer = orchestrator(classifier_returning(Relevance::Partial), generator, verifier)
            .run(cooking_request("How long do I knead?"))
            .await
            .unwrap();

        assert_eq!(answer.iterations, 2);
        assert!(answer.verified);
        assert_eq!(answer.answer, "draft 2");
        assert_eq!(answer.relevance, Relevance::Partial);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let mut generator = MockDraftGenerator::new();
        generator
            .expect_draft()
            .times(3)
            .returning(|_, _| Ok("Bake for three hours.".to_string()));
        let mut verifier = MockAnswerVerifier::new();
        verifier
            .expect_verify()
            .times(3)
            .returning(|_, _| Ok(verdict(Verdict::No, Verdict::Yes).with_note("Unsupported claims: three hours")));

        let answer = orchestrator(classifier_returning(Relevance::CanAnswer), generator, verifier)
            .run(cooking_request("How long do I bake?").with_max_iterations(3))
            .await
            .unwrap();

        assert_eq!(answer.termination, Termination::BudgetExhausted);
        assert_eq!(answer.iterations, 3);
        assert!(!answer.verified);
        assert_eq!(answer.answer, "Bake for three hours.");
        assert_eq!(answer.verification.supported, Verdict::No);
        assert_eq!(answer.verification.notes.last().map(String::as_str), Some(UNVERIFIED_NOTE));
        assert!(!answer.citations.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_support_is_retried() {
        let mut generator = MockDraftGenerator::new();
        generator.expect_draft().times(2).returning(|_, _| Ok("draft".to_string()));
        let mut verifier = MockAnswerVerifier::new();
        verifier
            .expect_verify()
            .times(2)
            .returning(|_, _| Ok(verdict(Verdict::Unknown, Verdict::Unknown)));

        let answer = orchestrator(classifier_returning(Relevance::CanAnswer), generator, verifier)
            .run(cooking_request("q").with_max_iterations(2))
            .await
            .unwrap();

        assert_eq!(answer.termination, Termination::BudgetExhausted);
    }

    #[tokio::test]
    async fn test_single_iteration_budget() {
        let mut generator = MockDraftGenerator::new();
        generator.expect_draft().times(1).returning(|_, _| Ok("only draft".to_string()));
        let mut verifier = MockAnswerVerifier::new();
        verifier
            .expect_verify()
            .times(1)
            .returning(|_, _| Ok(verdict(Verdict::Yes, Verdict::No)));

        let answer = orchestrator(classifier_returning(Relevance::CanAnswer), generator, verifier)
            .run(cooking_request("q").with_max_iterations(1))
            .await
            .unwrap();

        assert_eq!(answer.iterations, 1);
        assert_eq!(answer.termination, Termination::BudgetExhausted);
    }

    #[tokio::test]
    async fn test_all_sources_failing_reports_search_unavailable() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_response("CAN_ANSWER"));
        let classifier = LlmRelevanceClassifier::new(provider.clone(), AgentConfig::default());
        let mut generator = MockDraftGenerator::new();
        generator.expect_draft().times(0);
        let mut verifier = MockAnswerVerifier::new();
        verifier.expect_verify().times(0);

        let request = PipelineRequest::new("How long do I knead?")
            .with_source(Arc::new(MockRetrievalSource::lexical().with_error("index offline")), 0.4)
            .with_source(Arc::new(MockRetrievalSource::semantic().with_error("index offline")), 0.6);

        let answer = orchestrator(classifier, generator, verifier).run(request).await.unwrap();

        assert_eq!(answer.termination, Termination::SearchUnavailable);
        assert_eq!(answer.answer, SEARCH_UNAVAILABLE_MESSAGE);
        assert_eq!(answer.relevance, Relevance::NotRelevant);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_research_ends_the_run() {
        let mut generator = MockDraftGenerator::new();
        generator.expect_draft().times(0);
        let mut verifier = MockAnswerVerifier::new();
        verifier.expect_verify().times(0);

        let request = PipelineRequest::new("q").with_source(Arc::new(MockRetrievalSource::lexical()), 1.0);

        let answer = orchestrator(classifier_returning(Relevance::CanAnswer), generator, verifier)
            .run(request)
            .await
            .unwrap();

        assert_eq!(answer.termination, Termination::SearchUnavailable);
        assert_eq!(answer.iterations, 1);
        assert!(!answer.verified);
    }

    #[tokio::test]
    async fn test_partial_source_failure_still_answers() {
        let mut generator = MockDraftGenerator::new();
        generator
            .expect_draft()
            .times(1)
            .returning(|_, passages: &[Passage]| Ok(passages[0].content.clone()));
        let mut verifier = MockAnswerVerifier::new();
        verifier
            .expect_verify()
            .times(1)
            .returning(|_, _| Ok(verdict(Verdict::Yes, Verdict::Yes)));

        let request = PipelineRequest::new("q")
            .with_source(Arc::new(MockRetrievalSource::lexical().with_error("down")), 0.4)
            .with_source(
                Arc::new(MockRetrievalSource::semantic().with_passages(&[("Proof overnight.", "bread.pdf")])),
                0.6,
            );

        let answer = orchestrator(classifier_returning(Relevance::CanAnswer), generator, verifier)
            .run(request)
            .await
            .unwrap();

        assert_eq!(answer.answer, "Proof overnight.");
        let diagnostics = answer.diagnostics.unwrap();
        assert!(!diagnostics.sources[0].status.is_ok());
    }

    #[tokio::test]
    async fn test_classification_failure_is_fatal() {
        let mut classifier = MockRelevanceClassifier::new();
        classifier
            .expect_classify()
            .times(1)
            .returning(|_, _| Err(DomainError::provider("groq", "503")));
        let mut generator = MockDraftGenerator::new();
        generator.expect_draft().times(0);
        let mut verifier = MockAnswerVerifier::new();
        verifier.expect_verify().times(0);

        let err = orchestrator(classifier, generator, verifier)
            .run(cooking_request("q"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), PipelineStage::Classification);
    }

    #[tokio::test]
    async fn test_generation_failure_is_fatal() {
        let mut generator = MockDraftGenerator::new();
        generator
            .expect_draft()
            .times(1)
            .returning(|_, _| Err(DomainError::timeout("answer generation", 30_000)));
        let mut verifier = MockAnswerVerifier::new();
        verifier.expect_verify().times(0);

        let err = orchestrator(classifier_returning(Relevance::CanAnswer), generator, verifier)
            .run(cooking_request("q"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), PipelineStage::Generation);
        assert_eq!(err.user_message(), GENERATION_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_verification_failure_is_fatal() {
        let mut generator = MockDraftGenerator::new();
        generator.expect_draft().times(1).returning(|_, _| Ok("draft".to_string()));
        let mut verifier = MockAnswerVerifier::new();
        verifier
            .expect_verify()
            .times(1)
            .returning(|_, _| Err(DomainError::parse("empty")));

        let err = orchestrator(classifier_returning(Relevance::CanAnswer), generator, verifier)
            .run(cooking_request("q"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), PipelineStage::Verification);
    }

    #[tokio::test]
    async fn test_weight_mismatch_calls_nothing() {
        let mut classifier = MockRelevanceClassifier::new();
        classifier.expect_classify().times(0);
        let mut generator = MockDraftGenerator::new();
        generator.expect_draft().times(0);
        let mut verifier = MockAnswerVerifier::new();
        verifier.expect_verify().times(0);

        let source = Arc::new(MockRetrievalSource::lexical().with_passages(&[("a", "b")]));
        let mut request = PipelineRequest::new("q").with_source(source.clone(), 0.5);
        request.weights.push(0.5);

        let err = orchestrator(classifier, generator, verifier).run(request).await.unwrap_err();

        assert_eq!(err.stage(), PipelineStage::Request);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mut classifier = MockRelevanceClassifier::new();
        classifier.expect_classify().times(0);
        let token = CancellationToken::new();
        token.cancel();

        let err = orchestrator(classifier, MockDraftGenerator::new(), MockAnswerVerifier::new())
            .run_with_cancellation(cooking_request("q"), &token)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled));
    }

    /// Generator that never finishes on its own
    struct StalledGenerator {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DraftGenerator for StalledGenerator {
        async fn draft(&self, _question: &str, _passages: &[Passage]) -> Result<String, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn test_cancellation_while_drafting() {
        let calls = Arc::new(AtomicUsize::new(0));
        let generator = StalledGenerator { calls: calls.clone() };
        let mut verifier = MockAnswerVerifier::new();
        verifier.expect_verify().times(0);

        let orchestrator = orchestrator(classifier_returning(Relevance::CanAnswer), generator, verifier);
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            orchestrator.run_with_cancellation(cooking_request("q"), &token),
        )
        .await
        .expect("cancellation should stop the run");

        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_long_answers_are_formatted_when_enabled() {
        let long = "Mix the flour with the water and the salt in a large bowl. \
            Knead the dough on a floured surface for ten whole minutes. \
            Leave the dough to rise in a warm place for about an hour. \
            Shape the loaf gently and bake it at two hundred and twenty degrees. \
            Let the bread cool completely on a rack before you slice it";
        let mut generator = MockDraftGenerator::new();
        generator.expect_draft().times(1).returning(move |_, _| Ok(long.to_string()));
        let mut verifier = MockAnswerVerifier::new();
        verifier
            .expect_verify()
            .times(1)
            .returning(|_, _| Ok(verdict(Verdict::Yes, Verdict::Yes)));

        let orchestrator = PipelineOrchestrator::new(
            Arc::new(classifier_returning(Relevance::CanAnswer)),
            Arc::new(generator),
            Arc::new(verifier),
            PipelineConfig::default().with_format_long_answers(true),
        );

        let answer = orchestrator.run(cooking_request("How do I make bread?")).await.unwrap();

        assert!(answer.answer.starts_with("• Mix the flour"));
        assert_eq!(answer.answer.split("\n\n").count(), 5);
    }
}
