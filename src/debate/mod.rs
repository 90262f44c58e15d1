//! Round-robin debate machinery shared by the research and risk debates

pub mod research;
pub mod risk;


use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agents::{preview, Debater};
use crate::constants;
use crate::error::{LlmError, WorkflowError};
use crate::llm::{ChatModel, Priority};
use crate::types::{DebateTurn, Stance, Transcript};
use crate::workflow::WorkflowStage;

pub use research::{ResearchDebateCoordinator, ResearchDebateOutcome};
pub use risk::{RiskDebateCoordinator, RiskDebateOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "stance")]
pub enum StopReason {
    MaxRounds,
    Concession(Stance),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebateState {
    /// `speaker` takes the next turn of 1-based `round`
    Round { round: usize, speaker: Stance },
    Done(StopReason),
}

/// Rotation through a fixed speaker order for at most `max_rounds` rounds
#[derive(Clone, Debug)]
pub struct RoundRobin {
    rotation: Vec<Stance>,
    max_rounds: usize,
    early_stop: bool,
    seat: usize,
    state: DebateState,
}

impl RoundRobin {
    pub fn new(rotation: &[Stance], max_rounds: usize, early_stop: bool) -> Self {
        let state = match rotation.first() {
            Some(&speaker) if max_rounds > 0 => DebateState::Round { round: 1, speaker },
            _ => DebateState::Done(StopReason::MaxRounds),
        };
        Self {
            rotation: rotation.to_vec(),
            max_rounds,
            early_stop,
            seat: 0,
            state,
        }
    }

    pub fn state(&self) -> DebateState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, DebateState::Done(_))
    }

    /// Record the current speaker's argument and move to the next state
    pub fn advance(&mut self, argument: &str) -> DebateState {
        let DebateState::Round { round, speaker } = self.state else {
            return self.state;
        };

        if self.early_stop && detect_concession(argument) {
            self.state = DebateState::Done(StopReason::Concession(speaker));
            return self.state;
        }

        self.seat += 1;
        self.state = if self.seat < self.rotation.len() {
            DebateState::Round {
                round,
                speaker: self.rotation[self.seat],
            }
        } else if round < self.max_rounds {
            self.seat = 0;
            DebateState::Round {
                round: round + 1,
                speaker: self.rotation[0],
            }
        } else {
            DebateState::Done(StopReason::MaxRounds)
        };
        self.state
    }
}

/// True when the text contains one of the known concession phrases
pub fn detect_concession(text: &str) -> bool {
    let lower = text.to_lowercase();
    constants::debate::CONCESSION_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}

/// One turn: consult the debater and append its argument to the transcript
pub(crate) async fn take_turn<D: Debater>(
    debater: &D,
    llm: &dyn ChatModel,
    prompt: &str,
    round: usize,
    stage: WorkflowStage,
    transcript: &mut Transcript,
) -> Result<String, WorkflowError> {
    let argument = consult(debater, llm, prompt, stage).await?;
    info!(
        event = constants::events::DEBATE_TURN,
        stage = %stage,
        round,
        speaker = %debater.stance(),
        "🗣️ [DEBATE] Round {} {}: {}",
        round,
        debater.stance(),
        preview(&argument, constants::debate::TURN_PREVIEW_CHARS)
    );
    transcript.push(DebateTurn {
        round,
        speaker: debater.stance(),
        argument: argument.clone(),
        model: llm.model_name().to_string(),
        timestamp: chrono::Utc::now(),
    });
    Ok(argument)
}

/// Downstream debate calls always jump the queue
pub(crate) async fn consult<D: Debater>(
    debater: &D,
    llm: &dyn ChatModel,
    prompt: &str,
    stage: WorkflowStage,
) -> Result<String, WorkflowError> {
    debater
        .consult(llm, prompt, Priority::High)
        .await
        .map_err(|e: LlmError| WorkflowError::llm(stage, debater.name(), e))
}

pub(crate) fn log_stop(stage: WorkflowStage, reason: StopReason, turns: usize) {
    match reason {
        StopReason::Concession(stance) => info!(
            event = constants::events::DEBATE_EARLY_STOP,
            stage = %stage,
            turns,
            "🏁 [DEBATE] {} conceded after {} turns",
            stance,
            turns
        ),
        StopReason::MaxRounds => info!(
            "🏁 [DEBATE] {} finished after {} turns",
            stage, turns
        ),
    }
}
