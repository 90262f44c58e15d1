use tracing::warn;

use super::judge::render_reports;
use super::parse::{self, FundManagerReply};
use super::trader::{as_fraction, PositionLimits};
use super::Agent;
use crate::constants;
use crate::types::{
    AgentRole, AnalysisReport, Decision, DebateVerdict, RiskAssessment, TradingDecision,
};

const SYSTEM_PROMPT: &str = r#"You are the Fund Manager with final authority over the portfolio.
You see every upstream artifact: analyst reports, the research verdict, the
trader's proposal and the risk manager's assessment. Resolve any disagreement
between them and issue the binding decision.

Output a single JSON object and nothing else:
{
    "final_recommendation": "BUY" | "SELL" | "HOLD",
    "confidence": 0.0 to 1.0,
    "position_size": 0.0 to 1.0,
    "decision_summary": "..."
}
"#;

pub struct FundManager;

impl Agent for FundManager {
    fn name(&self) -> &str {
        "Fund-Manager"
    }

    fn role(&self) -> AgentRole {
        AgentRole::FundManager
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }
}

impl FundManager {
    pub fn build_prompt(
        &self,
        symbol: &str,
        reports: &[AnalysisReport],
        verdict: &DebateVerdict,
        proposal: &TradingDecision,
        risk: &RiskAssessment,
    ) -> String {
        format!(
            "Symbol: {}\n\n\
             Analyst reports:\n{}\n\n\
             Research verdict: {} (confidence {:.2})\n{}\n\n\
             Trader proposal: {} (confidence {:.2}), target position {:.1}%\n{}\n\n\
             Risk assessment: {:?} risk, {} with position {:.1}%\n{}\n\n\
             Action: Issue the final decision",
            symbol,
            render_reports(reports),
            verdict.decision,
            verdict.confidence,
            verdict.reasoning,
            proposal.recommendation,
            proposal.confidence,
            proposal.position_size * 100.0,
            proposal.reasoning,
            risk.risk_level,
            risk.recommendation,
            risk.position_size * 100.0,
            risk.rationale
        )
    }

    /// Final decision; free text falls back to a scan, then to the risk assessment
    pub fn parse_decision(
        &self,
        reply: &str,
        proposal: &TradingDecision,
        risk: &RiskAssessment,
        limits: PositionLimits,
    ) -> Decision {
        let carry =
            |recommendation| limits.carry_over(recommendation, risk.recommendation, risk.position_size);

        let Some(parsed) = parse::parse_reply::<FundManagerReply>(reply) else {
            let recommendation = parse::scan_recommendation(reply).unwrap_or(risk.recommendation);
            let confidence =
                parse::scan_confidence(reply).unwrap_or(constants::decision::HEURISTIC_CONFIDENCE);
            warn!(
                event = constants::events::DECISION_FALLBACK,
                agent = self.name(),
                "⚠️ [FUND] Reply was not JSON, using text scan: {} ({:.2})",
                recommendation,
                confidence
            );
            return Decision {
                recommendation,
                confidence,
                rationale: reply.trim().to_string(),
                position_size: carry(recommendation),
            };
        };

        let recommendation = parse::as_recommendation(parsed.final_recommendation.as_deref())
            .unwrap_or(risk.recommendation);

        Decision {
            recommendation,
            confidence: parse::as_confidence(parsed.confidence.as_ref())
                .unwrap_or(proposal.confidence),
            rationale: parsed.decision_summary.unwrap_or_default(),
            position_size: parsed
                .position_size
                .as_ref()
                .and_then(parse::as_f64)
                .map(as_fraction)
                .unwrap_or_else(|| carry(recommendation)),
        }
    }
}
