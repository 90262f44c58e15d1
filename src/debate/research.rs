use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{consult, log_stop, take_turn, DebateState, RoundRobin, StopReason};
use crate::agents::judge::{default_judgment, render_reports};
use crate::agents::{Agent, DebateJudge, Debater, Researcher};
use crate::config::DebateConfig;
use crate::constants;
use crate::error::WorkflowError;
use crate::llm::{ChatModel, Priority};
use crate::types::{AnalysisReport, DebateVerdict, Stance, Transcript};
use crate::workflow::WorkflowStage;

const STAGE: WorkflowStage = WorkflowStage::ResearchDebate;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResearchDebateOutcome {
    pub bull_thesis: String,
    pub bear_thesis: String,
    pub transcript: Transcript,
    pub verdict: DebateVerdict,
    pub stop_reason: StopReason,
    /// The judge reply was unusable and the report vote decided
    pub fallback_verdict: bool,
}

/// Bull vs bear: openings, alternating rebuttals, then the judge
pub struct ResearchDebateCoordinator {
    bull: Researcher,
    bear: Researcher,
    judge: DebateJudge,
    max_rounds: usize,
    early_stop: bool,
}

impl ResearchDebateCoordinator {
    pub fn new(config: &DebateConfig) -> Self {
        Self::with_rounds(config.research_rounds(), config.early_stop)
    }

    pub fn with_rounds(max_rounds: usize, early_stop: bool) -> Self {
        Self {
            bull: Researcher::bull(),
            bear: Researcher::bear(),
            judge: DebateJudge,
            max_rounds,
            early_stop,
        }
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    pub async fn conduct(
        &self,
        llm: &dyn ChatModel,
        symbol: &str,
        reports: &[AnalysisReport],
    ) -> Result<ResearchDebateOutcome, WorkflowError> {
        info!(
            "⚔️ [DEBATE] Research debate on {} ({} rounds)",
            symbol, self.max_rounds
        );

        let brief = format!(
            "Symbol: {}\nQuestion: Should the firm invest in {}?\n\nAnalyst reports:\n{}",
            symbol,
            symbol,
            render_reports(reports)
        );

        let bull_thesis = consult(&self.bull, llm, &self.bull.opening_prompt(&brief), STAGE).await?;
        let bear_thesis = consult(&self.bear, llm, &self.bear.opening_prompt(&brief), STAGE).await?;

        let mut transcript = Transcript::new();
        let mut rr = RoundRobin::new(&[Stance::Bull, Stance::Bear], self.max_rounds, self.early_stop);

        while let DebateState::Round { round, speaker } = rr.state() {
            // Each side answers the other's latest turn, or its thesis before one exists
            let (debater, opposing) = match speaker {
                Stance::Bear => (
                    &self.bear,
                    transcript
                        .last_by(Stance::Bull)
                        .map(|t| t.argument.as_str())
                        .unwrap_or(bull_thesis.as_str()),
                ),
                _ => (
                    &self.bull,
                    transcript
                        .last_by(Stance::Bear)
                        .map(|t| t.argument.as_str())
                        .unwrap_or(bear_thesis.as_str()),
                ),
            };
            let prompt = debater.rebuttal_prompt(&brief, opposing, round);
            let argument = take_turn(debater, llm, &prompt, round, STAGE, &mut transcript).await?;
            rr.advance(&argument);
        }

        let stop_reason = match rr.state() {
            DebateState::Done(reason) => reason,
            DebateState::Round { .. } => StopReason::MaxRounds,
        };
        log_stop(STAGE, stop_reason, transcript.len());

        let prompt = self
            .judge
            .build_prompt(symbol, reports, &bull_thesis, &bear_thesis, &transcript);
        let reply = self
            .judge
            .consult(llm, &prompt, Priority::High)
            .await
            .map_err(|e| WorkflowError::llm(STAGE, self.judge.name(), e))?;

        let (verdict, fallback_verdict) = match self.judge.parse_verdict(&reply) {
            Some(v) => (v, false),
            None => {
                let v = default_judgment(reports);
                warn!(
                    event = constants::events::DECISION_FALLBACK,
                    agent = self.judge.name(),
                    "⚠️ [DEBATE] Judge reply unusable, report vote gives {} ({:.2})",
                    v.decision,
                    v.confidence
                );
                (v, true)
            }
        };

        info!(
            "⚖️ [DEBATE] Verdict for {}: {} (confidence {:.2}, winner {:?})",
            symbol, verdict.decision, verdict.confidence, verdict.winner
        );

        Ok(ResearchDebateOutcome {
            bull_thesis,
            bear_thesis,
            transcript,
            verdict,
            stop_reason,
            fallback_verdict,
        })
    }
}
