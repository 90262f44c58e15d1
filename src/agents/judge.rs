use super::parse::{self, JudgeReply};
use super::Agent;
use crate::constants;
use crate::types::{
    AgentRole, AnalysisReport, DebateVerdict, DebateWinner, Recommendation, Transcript,
};

const SYSTEM_PROMPT: &str = r#"You are the Investment Committee Judge.
You have read the analyst reports and watched a bull and a bear researcher debate.
Weigh the quality and evidence of each side's arguments against the objective
analyst data, balance opportunity against risk, and issue a verdict.

Output a single JSON object and nothing else:
{
    "decision": "BUY" | "SELL" | "HOLD",
    "confidence": 0.0 to 1.0,
    "winner": "bull" | "bear" | "draw",
    "reasoning": "why this side was more convincing",
    "supporting_factors": ["..."],
    "risk_factors": ["..."]
}
"#;

pub struct DebateJudge;

impl Agent for DebateJudge {
    fn name(&self) -> &str {
        "Debate-Judge"
    }

    fn role(&self) -> AgentRole {
        AgentRole::DebateJudge
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }
}

impl DebateJudge {
    pub fn build_prompt(
        &self,
        symbol: &str,
        reports: &[AnalysisReport],
        bull_thesis: &str,
        bear_thesis: &str,
        transcript: &Transcript,
    ) -> String {
        let history = if transcript.is_empty() {
            "No rebuttal rounds were held.".to_string()
        } else {
            transcript.render()
        };
        format!(
            "Symbol: {}\n\nAnalyst reports:\n{}\n\nBull thesis:\n{}\n\nBear thesis:\n{}\n\nDebate:\n{}\n\nAction: Issue the verdict",
            symbol,
            render_reports(reports),
            bull_thesis,
            bear_thesis,
            history
        )
    }

    /// `None` when the reply carries no usable verdict
    pub fn parse_verdict(&self, reply: &str) -> Option<DebateVerdict> {
        let parsed: JudgeReply = parse::parse_reply(reply)?;
        let decision = parse::as_recommendation(parsed.decision.as_deref())?;
        let winner = parsed
            .winner
            .as_deref()
            .and_then(parse_winner)
            .unwrap_or(match decision {
                Recommendation::Buy => DebateWinner::Bull,
                Recommendation::Sell => DebateWinner::Bear,
                Recommendation::Hold => DebateWinner::Draw,
            });

        Some(DebateVerdict {
            decision,
            confidence: parse::as_confidence(parsed.confidence.as_ref())
                .unwrap_or(constants::decision::DEFAULT_CONFIDENCE),
            reasoning: parsed.reasoning.unwrap_or_default(),
            winner,
            supporting_factors: parsed.supporting_factors,
            risk_factors: parsed.risk_factors,
        })
    }
}

fn parse_winner(text: &str) -> Option<DebateWinner> {
    match text.trim().to_lowercase().as_str() {
        "bull" | "bulls" | "bullish" => Some(DebateWinner::Bull),
        "bear" | "bears" | "bearish" => Some(DebateWinner::Bear),
        "draw" | "tie" | "none" | "neutral" => Some(DebateWinner::Draw),
        _ => None,
    }
}

/// Confidence-weighted vote over the analyst reports
pub fn default_judgment(reports: &[AnalysisReport]) -> DebateVerdict {
    let mut buy = 0.0;
    let mut sell = 0.0;
    let mut total = 0.0;
    for report in reports {
        match report.recommendation {
            Recommendation::Buy => buy += report.confidence,
            Recommendation::Sell => sell += report.confidence,
            Recommendation::Hold => {}
        }
        total += report.confidence;
    }

    let average = if reports.is_empty() {
        constants::decision::DEFAULT_CONFIDENCE
    } else {
        total / reports.len() as f64
    };

    let (decision, winner) = if buy > sell {
        (Recommendation::Buy, DebateWinner::Bull)
    } else if sell > buy {
        (Recommendation::Sell, DebateWinner::Bear)
    } else {
        (Recommendation::Hold, DebateWinner::Draw)
    };

    DebateVerdict {
        decision,
        confidence: average.min(constants::decision::FALLBACK_CONFIDENCE_CAP),
        reasoning: format!(
            "Vote over analyst reports: buy weight {:.2}, sell weight {:.2}",
            buy, sell
        ),
        winner,
        supporting_factors: vec!["Consolidated analyst reports".to_string()],
        risk_factors: vec!["Market volatility".to_string()],
    }
}

pub(crate) fn render_reports(reports: &[AnalysisReport]) -> String {
    if reports.is_empty() {
        return "none".to_string();
    }
    reports
        .iter()
        .map(|r| format!("{}\n{}", r.summary_line(), r.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
