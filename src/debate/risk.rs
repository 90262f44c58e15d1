use serde::{Deserialize, Serialize};
use tracing::info;

use super::{consult, log_stop, take_turn, DebateState, RoundRobin, StopReason};
use crate::agents::{Agent, Debater, PositionLimits, RiskAnalyst, RiskManager};
use crate::config::DebateConfig;
use crate::error::WorkflowError;
use crate::llm::{ChatModel, Priority};
use crate::types::{DebateVerdict, RiskAssessment, Stance, TradingDecision, Transcript};
use crate::workflow::WorkflowStage;

const STAGE: WorkflowStage = WorkflowStage::RiskDebate;

const ROTATION: [Stance; 3] = [Stance::Conservative, Stance::Aggressive, Stance::Neutral];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskDebateOutcome {
    pub openings: Vec<(Stance, String)>,
    pub transcript: Transcript,
    pub stop_reason: StopReason,
    pub assessment: RiskAssessment,
}

/// Conservative -> aggressive -> neutral, then the risk manager
pub struct RiskDebateCoordinator {
    conservative: RiskAnalyst,
    aggressive: RiskAnalyst,
    neutral: RiskAnalyst,
    manager: RiskManager,
    max_rounds: usize,
    early_stop: bool,
}

impl RiskDebateCoordinator {
    pub fn new(config: &DebateConfig) -> Self {
        Self::with_rounds(config.risk_rounds(), config.early_stop)
    }

    pub fn with_rounds(max_rounds: usize, early_stop: bool) -> Self {
        Self {
            conservative: RiskAnalyst::conservative(),
            aggressive: RiskAnalyst::aggressive(),
            neutral: RiskAnalyst::neutral(),
            manager: RiskManager,
            max_rounds,
            early_stop,
        }
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    fn seat(&self, stance: Stance) -> &RiskAnalyst {
        match stance {
            Stance::Conservative => &self.conservative,
            Stance::Aggressive => &self.aggressive,
            _ => &self.neutral,
        }
    }

    pub async fn conduct(
        &self,
        llm: &dyn ChatModel,
        symbol: &str,
        proposal: &TradingDecision,
        verdict: &DebateVerdict,
        limits: PositionLimits,
    ) -> Result<RiskDebateOutcome, WorkflowError> {
        info!(
            "🛡️ [RISK] Risk debate on {} {} ({} rounds)",
            proposal.recommendation, symbol, self.max_rounds
        );

        let brief = render_proposal(symbol, proposal, verdict);

        let conservative = consult(
            &self.conservative,
            llm,
            &self.conservative.opening_prompt(&brief),
            STAGE,
        )
        .await?;
        let aggressive = consult(
            &self.aggressive,
            llm,
            &self.aggressive.opening_prompt(&brief),
            STAGE,
        )
        .await?;
        let neutral_brief = format!(
            "{}\n\nConservative view:\n{}\n\nAggressive view:\n{}",
            brief, conservative, aggressive
        );
        let neutral = consult(
            &self.neutral,
            llm,
            &self.neutral.opening_prompt(&neutral_brief),
            STAGE,
        )
        .await?;

        let openings = vec![
            (Stance::Conservative, conservative),
            (Stance::Aggressive, aggressive),
            (Stance::Neutral, neutral),
        ];

        let mut transcript = Transcript::new();
        let mut rr = RoundRobin::new(&ROTATION, self.max_rounds, self.early_stop);

        while let DebateState::Round { round, speaker } = rr.state() {
            let opposing = opposing_views(speaker, round, &openings, &transcript);
            let debater = self.seat(speaker);
            let prompt = debater.rebuttal_prompt(&brief, &opposing, round);
            let argument = take_turn(debater, llm, &prompt, round, STAGE, &mut transcript).await?;
            rr.advance(&argument);
        }

        let stop_reason = match rr.state() {
            DebateState::Done(reason) => reason,
            DebateState::Round { .. } => StopReason::MaxRounds,
        };
        log_stop(STAGE, stop_reason, transcript.len());

        let prompt = self.manager.build_prompt(&brief, &openings, &transcript);
        let reply = self
            .manager
            .consult(llm, &prompt, Priority::High)
            .await
            .map_err(|e| WorkflowError::llm(STAGE, self.manager.name(), e))?;
        let assessment = self.manager.parse_assessment(&reply, proposal, limits);

        info!(
            "🛡️ [RISK] Assessment for {}: {:?} risk, {} at {:.1}%",
            symbol,
            assessment.risk_level,
            assessment.recommendation,
            assessment.position_size * 100.0
        );

        Ok(RiskDebateOutcome {
            openings,
            transcript,
            stop_reason,
            assessment,
        })
    }
}

/// Round 1 answers the other openings plus turns already taken; later rounds answer opponent turns only
fn opposing_views(
    speaker: Stance,
    round: usize,
    openings: &[(Stance, String)],
    transcript: &Transcript,
) -> String {
    let openings = openings
        .iter()
        .filter(|(stance, _)| round == 1 && *stance != speaker)
        .map(|(stance, text)| format!("[{} opening] {}", stance, text));
    openings
        .chain(
            transcript
                .opponents_of(speaker)
                .map(|t| format!("[{} round {}] {}", t.speaker, t.round, t.argument)),
        )
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_proposal(symbol: &str, proposal: &TradingDecision, verdict: &DebateVerdict) -> String {
    let price = |v: Option<f64>| v.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "n/a".to_string());
    format!(
        "Symbol: {}\n\
         Research verdict: {} (confidence {:.2})\n\
         Trader proposal: {} (confidence {:.2})\n\
         Target position: {:.1}% of portfolio, horizon {}\n\
         Target price: {}, stop loss: {}, take profit: {}\n\
         Trader reasoning: {}",
        symbol,
        verdict.decision,
        verdict.confidence,
        proposal.recommendation,
        proposal.confidence,
        proposal.position_size * 100.0,
        proposal.time_horizon,
        price(proposal.target_price),
        price(proposal.stop_loss),
        price(proposal.take_profit),
        proposal.reasoning
    )
}
