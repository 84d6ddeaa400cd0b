//! Ask command - answers one question and prints the result
//!
//! Ctrl+C cancels the run instead of killing the process mid-request.

use std::fmt;

use clap::Args;
use tokio::signal;
use tracing::{info, warn};

use crate::domain::{CancellationToken, PipelineAnswer};

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    /// Question to answer
    pub question: String,

    /// Maximum research / verify passes
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// One fusion weight per configured source, comma separated
    #[arg(long, value_delimiter = ',')]
    pub weights: Option<Vec<f64>>,

    /// Print the answer as JSON
    #[arg(long)]
    pub json: bool,

    /// Include per-source retrieval diagnostics
    #[arg(long)]
    pub diagnostics: bool,
}

pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let state = crate::create_app_state_with_config(&config).await?;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, cancelling");
                trigger.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
        }
    });

    let request = state.request(args.question.clone(), args.weights.clone(), args.max_iterations);
    let mut answer = match state.pipeline.run_with_cancellation(request, &token).await {
        Ok(answer) => answer,
        Err(e) => anyhow::bail!("{}", e.user_message()),
    };

    if !args.diagnostics {
        answer.diagnostics = None;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print!("{}", AnswerView(&answer));
    }

    Ok(())
}

/// Human-readable rendering of an answer with its citations
pub struct AnswerView<'a>(pub &'a PipelineAnswer);

impl fmt::Display for AnswerView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let answer = self.0;
        writeln!(f, "{}", answer.answer)?;

        if !answer.citations.is_empty() {
            writeln!(f, "\nSources:")?;
            for (i, citation) in answer.citations.iter().enumerate() {
                let page = citation.page.map(|p| format!(", page {}", p)).unwrap_or_default();
                writeln!(
                    f,
                    "  [{}] {}{} ({}, {:.3})",
                    i + 1,
                    citation.document,
                    page,
                    citation.origin,
                    citation.score
                )?;
                writeln!(f, "      \"{}\"", citation.excerpt)?;
            }
        }

        let report = &answer.verification;
        write!(
            f,
            "\nSupported: {}  Relevant: {}",
            report.supported.as_str(),
            report.relevant.as_str()
        )?;
        if let Some(confidence) = &report.confidence {
            write!(f, "  Confidence: {}", confidence)?;
        }
        writeln!(f)?;

        let status = if answer.verified { "verified" } else { "unverified" };
        writeln!(
            f,
            "Status: {} ({}, {} iteration(s))",
            status, answer.termination, answer.iterations
        )?;
        for note in &report.notes {
            writeln!(f, "Note: {}", note)?;
        }

        if let Some(diagnostics) = &answer.diagnostics {
            writeln!(f, "\nRetrieval:\n{}", diagnostics)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::pipeline::UNVERIFIED_NOTE;
    use crate::domain::{
        Citation, CitationKind, IRRELEVANT_QUESTION_MESSAGE, Relevance, RetrievalOrigin, Termination, Verdict,
        VerificationReport,
    };

    #[test]
    fn test_render_irrelevant_answer() {
        let answer = PipelineAnswer::without_draft(
            Uuid::new_v4(),
            IRRELEVANT_QUESTION_MESSAGE,
            Relevance::NotRelevant,
            Termination::Irrelevant,
        );

        let text = AnswerView(&answer).to_string();

        assert!(text.starts_with(IRRELEVANT_QUESTION_MESSAGE));
        assert!(!text.contains("Sources:"));
        assert!(text.contains("Status: unverified (irrelevant, 0 iteration(s))"));
    }

    #[test]
    fn test_render_cited_answer() {
        let mut answer = PipelineAnswer::without_draft(
            Uuid::new_v4(),
            "Knead for ten minutes.",
            Relevance::CanAnswer,
            Termination::BudgetExhausted,
        );
        answer.iterations = 3;
        answer.citations.push(Citation {
            source_id: "docs/bread.pdf".to_string(),
            document: "bread.pdf".to_string(),
            kind: CitationKind::Document,
            page: Some(4),
            excerpt: "Knead the dough for ten minutes.".to_string(),
            origin: RetrievalOrigin::Lexical,
            score: 0.4,
        });
        answer.verification =
            VerificationReport::new(Verdict::No, Verdict::Yes).with_note(UNVERIFIED_NOTE);

        let text = AnswerView(&answer).to_string();

        assert!(text.contains("[1] bread.pdf, page 4 (lexical, 0.400)"));
        assert!(text.contains("Supported: NO  Relevant: YES"));
        assert!(text.contains("Note: best-effort, unverified"));
        assert!(text.contains("budget_exhausted, 3 iteration(s)"));
    }

    #[test]
    fn test_render_verified_answer_with_confidence() {
        let mut answer = PipelineAnswer::without_draft(
            Uuid::new_v4(),
            "Bake at 220C.",
            Relevance::CanAnswer,
            Termination::Verified,
        );
        answer.verified = true;
        answer.iterations = 1;
        answer.verification =
            VerificationReport::new(Verdict::Yes, Verdict::Yes).with_confidence("HIGH");

        let text = format!("{}", AnswerView(&answer));

        assert!(text.contains("Supported: YES  Relevant: YES  Confidence: HIGH\n"));
        assert!(text.contains("Status: verified (verified, 1 iteration(s))"));
        assert!(!text.contains("Note:"));
    }
}
