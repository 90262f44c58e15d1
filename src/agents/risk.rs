use tracing::warn;

use super::parse::{self, RiskReply};
use super::trader::{as_fraction, PositionLimits};
use super::{Agent, Debater};
use crate::constants;
use crate::types::{
    AgentRole, RiskAssessment, RiskLevel, Stance, TradingDecision, Transcript,
};

const CONSERVATIVE_PROMPT: &str = r#"You are the Conservative Risk Analyst.
Capital preservation comes first. Scrutinize the proposed trade for downside
scenarios, volatility, concentration and liquidity risk, and argue for smaller
positions, tighter stops or no trade when the risk/reward is not compelling.
Reply in plain prose, at most 200 words."#;

const AGGRESSIVE_PROMPT: &str = r#"You are the Aggressive Risk Analyst.
You look for asymmetric upside. Argue for conviction sizing when the evidence is
strong, point out the opportunity cost of excessive caution, and challenge risk
estimates that are overstated.
Reply in plain prose, at most 200 words."#;

const NEUTRAL_PROMPT: &str = r#"You are the Neutral Risk Analyst.
Weigh the conservative and aggressive views on their merits and propose a
balanced position size and protection levels that fit the evidence.
Reply in plain prose, at most 200 words."#;

const MANAGER_PROMPT: &str = r#"You are the Chief Risk Manager.
Review the trader's proposal and the risk team's debate, then issue the final
risk-adjusted instruction.

Output a single JSON object and nothing else:
{
    "risk_level": "LOW" | "MEDIUM" | "HIGH",
    "recommended_action": "BUY" | "SELL" | "HOLD",
    "position_size": 0.0 to 1.0,
    "stop_loss": 115.00,
    "take_profit": 140.00,
    "rationale": "...",
    "key_risks": ["..."]
}
"#;

/// One seat of the risk debate
#[derive(Clone, Copy, Debug)]
pub struct RiskAnalyst {
    stance: Stance,
}

impl RiskAnalyst {
    pub fn conservative() -> Self {
        Self {
            stance: Stance::Conservative,
        }
    }

    pub fn aggressive() -> Self {
        Self {
            stance: Stance::Aggressive,
        }
    }

    pub fn neutral() -> Self {
        Self {
            stance: Stance::Neutral,
        }
    }
}

impl Agent for RiskAnalyst {
    fn name(&self) -> &str {
        match self.stance {
            Stance::Conservative => "Conservative-Risk-Analyst",
            Stance::Aggressive => "Aggressive-Risk-Analyst",
            _ => "Neutral-Risk-Analyst",
        }
    }

    fn role(&self) -> AgentRole {
        match self.stance {
            Stance::Conservative => AgentRole::ConservativeAnalyst,
            Stance::Aggressive => AgentRole::AggressiveAnalyst,
            _ => AgentRole::NeutralAnalyst,
        }
    }

    fn system_prompt(&self) -> &str {
        match self.stance {
            Stance::Conservative => CONSERVATIVE_PROMPT,
            Stance::Aggressive => AGGRESSIVE_PROMPT,
            _ => NEUTRAL_PROMPT,
        }
    }
}

impl Debater for RiskAnalyst {
    fn stance(&self) -> Stance {
        self.stance
    }

    fn opening_prompt(&self, brief: &str) -> String {
        format!(
            "{}\n\nAction: Give your opening {} risk assessment of this trade.",
            brief, self.stance
        )
    }

    fn rebuttal_prompt(&self, brief: &str, opposing: &str, round: usize) -> String {
        format!(
            "{}\n\nRisk debate round {}. The other analysts argued:\n\"\"\"\n{}\n\"\"\"\n\nAction: Respond from the {} perspective.",
            brief, round, opposing, self.stance
        )
    }
}

pub struct RiskManager;

impl Agent for RiskManager {
    fn name(&self) -> &str {
        "Risk-Manager"
    }

    fn role(&self) -> AgentRole {
        AgentRole::RiskManager
    }

    fn system_prompt(&self) -> &str {
        MANAGER_PROMPT
    }
}

impl RiskManager {
    pub fn build_prompt(
        &self,
        brief: &str,
        openings: &[(Stance, String)],
        transcript: &Transcript,
    ) -> String {
        let openings = openings
            .iter()
            .map(|(stance, text)| format!("[{} opening]\n{}", stance, text))
            .collect::<Vec<_>>()
            .join("\n\n");
        let history = if transcript.is_empty() {
            "No rebuttal rounds were held.".to_string()
        } else {
            transcript.render()
        };
        format!(
            "{}\n\nOpening positions:\n{}\n\nRisk debate:\n{}\n\nAction: Issue the final risk assessment",
            brief, openings, history
        )
    }

    /// Assessment from the reply; unparseable output keeps the trader's proposal.
    /// An overruled action with no size is resized from `limits`.
    pub fn parse_assessment(
        &self,
        reply: &str,
        proposal: &TradingDecision,
        limits: PositionLimits,
    ) -> RiskAssessment {
        let carry = |recommendation| {
            limits.carry_over(recommendation, proposal.recommendation, proposal.position_size)
        };

        let Some(parsed) = parse::parse_reply::<RiskReply>(reply) else {
            let recommendation =
                parse::scan_recommendation(reply).unwrap_or(proposal.recommendation);
            warn!(
                event = constants::events::DECISION_FALLBACK,
                agent = self.name(),
                "⚠️ [RISK] Reply was not JSON, keeping proposal with scanned action {}",
                recommendation
            );
            return RiskAssessment {
                risk_level: RiskLevel::Medium,
                recommendation,
                position_size: carry(recommendation),
                stop_loss: proposal.stop_loss,
                take_profit: proposal.take_profit,
                rationale: reply.trim().to_string(),
                key_risks: Vec::new(),
            };
        };

        let price = |v: &Option<serde_json::Value>| v.as_ref().and_then(parse::as_f64);

        let recommendation =
            parse::as_recommendation(parsed.action.as_deref()).unwrap_or(proposal.recommendation);

        RiskAssessment {
            risk_level: parsed
                .risk_level
                .as_deref()
                .and_then(|l| l.parse().ok())
                .unwrap_or(RiskLevel::Medium),
            recommendation,
            position_size: parsed
                .position_size
                .as_ref()
                .and_then(parse::as_f64)
                .map(as_fraction)
                .unwrap_or_else(|| carry(recommendation)),
            stop_loss: price(&parsed.stop_loss).or(proposal.stop_loss),
            take_profit: price(&parsed.take_profit).or(proposal.take_profit),
            rationale: parsed.rationale.unwrap_or_default(),
            key_risks: parsed.key_risks,
        }
    }
}
