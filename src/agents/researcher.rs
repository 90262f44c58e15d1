use super::{Agent, Debater};
use crate::types::{AgentRole, Stance};

const BULL_PROMPT: &str = r#"You are the Bull Researcher on an investment committee.
Read the analyst reports from an optimistic angle: find the growth drivers,
catalysts, competitive advantages and signs of undervaluation, and build the
strongest evidence-based case for buying. In rebuttals, answer the bear's
specific points with data instead of repeating your thesis. Concede only if the
bear's evidence is genuinely decisive.
Reply in plain prose, at most 250 words."#;

const BEAR_PROMPT: &str = r#"You are the Bear Researcher on an investment committee.
Read the analyst reports skeptically: find the valuation excesses, deteriorating
fundamentals, competitive threats and downside catalysts, and build the strongest
evidence-based case against buying. In rebuttals, answer the bull's specific
points with data instead of repeating your thesis. Concede only if the bull's
evidence is genuinely decisive.
Reply in plain prose, at most 250 words."#;

/// Bull or bear side of the research debate
#[derive(Clone, Copy, Debug)]
pub struct Researcher {
    stance: Stance,
}

impl Researcher {
    pub fn bull() -> Self {
        Self {
            stance: Stance::Bull,
        }
    }

    pub fn bear() -> Self {
        Self {
            stance: Stance::Bear,
        }
    }

    fn side(&self) -> &'static str {
        match self.stance {
            Stance::Bear => "bearish",
            _ => "bullish",
        }
    }
}

impl Agent for Researcher {
    fn name(&self) -> &str {
        match self.stance {
            Stance::Bear => "Bear-Researcher",
            _ => "Bull-Researcher",
        }
    }

    fn role(&self) -> AgentRole {
        match self.stance {
            Stance::Bear => AgentRole::BearResearcher,
            _ => AgentRole::BullResearcher,
        }
    }

    fn system_prompt(&self) -> &str {
        match self.stance {
            Stance::Bear => BEAR_PROMPT,
            _ => BULL_PROMPT,
        }
    }
}

impl Debater for Researcher {
    fn stance(&self) -> Stance {
        self.stance
    }

    fn opening_prompt(&self, brief: &str) -> String {
        format!(
            "{}\n\nAction: Present your opening {} thesis.",
            brief,
            self.side()
        )
    }

    fn rebuttal_prompt(&self, brief: &str, opposing: &str, round: usize) -> String {
        format!(
            "{}\n\nDebate round {}. Your opponent argued:\n\"\"\"\n{}\n\"\"\"\n\nAction: Rebut these points and strengthen the {} case.",
            brief,
            round,
            opposing,
            self.side()
        )
    }
}
