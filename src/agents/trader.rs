use tracing::warn;

use super::judge::render_reports;
use super::parse::{self, TraderReply};
use super::Agent;
use crate::constants;
use crate::data::MarketData;
use crate::types::{AgentRole, AnalysisReport, DebateVerdict, Recommendation, TradingDecision};

const SYSTEM_PROMPT: &str = r#"You are a professional equity Trader.
Combine the analyst reports with the investment committee's debate verdict and
the current position into one concrete trade for today. Be data driven, keep risk
controlled, and remember position_size is the TARGET fraction of the portfolio
after the trade, not the change.

Output a single JSON object and nothing else:
{
    "recommendation": "BUY" | "SELL" | "HOLD",
    "confidence": 0.0 to 1.0,
    "target_price": 123.45,
    "acceptable_price_min": 120.00,
    "acceptable_price_max": 125.00,
    "stop_loss": 115.00,
    "take_profit": 140.00,
    "position_size": 0.0 to 1.0,
    "time_horizon": "short" | "medium" | "long",
    "reasoning": "...",
    "risk_factors": ["..."]
}
"#;

pub struct Trader;

impl Agent for Trader {
    fn name(&self) -> &str {
        "Trader"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Trader
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }
}

/// Inputs quoted to the trader
pub struct TradeContext<'a> {
    pub symbol: &'a str,
    pub market: &'a MarketData,
    pub reports: &'a [AnalysisReport],
    pub verdict: &'a DebateVerdict,
    pub current_position: f64,
    pub max_position_size: f64,
}

impl TradeContext<'_> {
    pub fn limits(&self) -> PositionLimits {
        PositionLimits {
            current: self.current_position,
            max: self.max_position_size,
        }
    }
}

/// Current holding and the ceiling a target position may reach
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionLimits {
    pub current: f64,
    pub max: f64,
}

impl PositionLimits {
    /// Target size implied by a recommendation that names no size
    pub fn default_for(&self, recommendation: Recommendation) -> f64 {
        match recommendation {
            Recommendation::Buy => self.max,
            Recommendation::Hold => self.current,
            Recommendation::Sell => 0.0,
        }
    }

    /// Unsized downstream call: keep the upstream target only if the action is unchanged
    pub fn carry_over(
        &self,
        recommendation: Recommendation,
        upstream: Recommendation,
        upstream_size: f64,
    ) -> f64 {
        if recommendation == upstream {
            upstream_size
        } else {
            self.default_for(recommendation)
        }
    }
}

impl Trader {
    pub fn build_prompt(&self, ctx: &TradeContext<'_>) -> String {
        let average_cost = match ctx.market.average_cost {
            _ if ctx.current_position <= 0.0 => "no position held".to_string(),
            Some(cost) if cost > 0.0 => format!("{:.2}", cost),
            _ => "not provided".to_string(),
        };

        format!(
            "Symbol: {}\n\
             Current price: {:.2} ({:+.2}% today)\n\
             Current position: {:.1}% of portfolio (average cost: {})\n\
             Maximum allowed position: {:.1}% of portfolio\n\n\
             Analyst reports:\n{}\n\n\
             Debate verdict: {} (confidence {:.2}, winner {:?})\n{}\n\n\
             Action: Decide today's trade",
            ctx.symbol,
            ctx.market.price.current,
            ctx.market.price.change_pct(),
            ctx.current_position * 100.0,
            average_cost,
            ctx.max_position_size * 100.0,
            render_reports(ctx.reports),
            ctx.verdict.decision,
            ctx.verdict.confidence,
            ctx.verdict.winner,
            ctx.verdict.reasoning
        )
    }

    /// Decision from the reply; free text falls back to a keyword scan
    pub fn parse_decision(&self, ctx: &TradeContext<'_>, reply: &str) -> TradingDecision {
        let Some(parsed) = parse::parse_reply::<TraderReply>(reply) else {
            let recommendation =
                parse::scan_recommendation(reply).unwrap_or(ctx.verdict.decision);
            let confidence =
                parse::scan_confidence(reply).unwrap_or(constants::decision::HEURISTIC_CONFIDENCE);
            warn!(
                event = constants::events::DECISION_FALLBACK,
                agent = self.name(),
                "⚠️ [TRADER] Reply was not JSON, using text scan: {} ({:.2})",
                recommendation,
                confidence
            );
            return TradingDecision {
                symbol: ctx.symbol.to_string(),
                recommendation,
                confidence,
                target_price: None,
                acceptable_price_min: None,
                acceptable_price_max: None,
                stop_loss: None,
                take_profit: None,
                position_size: ctx.limits().default_for(recommendation),
                time_horizon: "medium".to_string(),
                reasoning: reply.trim().to_string(),
                risk_factors: Vec::new(),
            };
        };

        let recommendation = parse::as_recommendation(parsed.recommendation.as_deref())
            .unwrap_or(ctx.verdict.decision);
        let price = |v: &Option<serde_json::Value>| v.as_ref().and_then(parse::as_f64);

        TradingDecision {
            symbol: ctx.symbol.to_string(),
            recommendation,
            confidence: parse::as_confidence(parsed.confidence.as_ref())
                .unwrap_or(constants::decision::DEFAULT_CONFIDENCE),
            target_price: price(&parsed.target_price),
            acceptable_price_min: price(&parsed.acceptable_price_min),
            acceptable_price_max: price(&parsed.acceptable_price_max),
            stop_loss: price(&parsed.stop_loss),
            take_profit: price(&parsed.take_profit),
            position_size: parsed
                .position_size
                .as_ref()
                .and_then(parse::as_f64)
                .map(as_fraction)
                .unwrap_or_else(|| ctx.limits().default_for(recommendation)),
            time_horizon: parsed.time_horizon.unwrap_or_else(|| "medium".to_string()),
            reasoning: parsed.reasoning.unwrap_or_default(),
            risk_factors: parsed.risk_factors,
        }
    }
}

/// Read 1 < v <= 100 as a percentage
pub(crate) fn as_fraction(value: f64) -> f64 {
    if value > 1.0 && value <= 100.0 {
        value / 100.0
    } else {
        value
    }
}
