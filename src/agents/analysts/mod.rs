pub mod fundamental;
pub mod news;
pub mod sentiment;
pub mod technical;

use chrono::Utc;
use tracing::{info, warn};

use super::parse::{self, AnalystReply};
use super::Agent;
use crate::constants;
use crate::data::MarketData;
use crate::error::LlmError;
use crate::llm::{ChatModel, Priority};
use crate::types::{AgentRole, AnalysisReport, AnalystKind, Recommendation};

pub use fundamental::FundamentalAnalyst;
pub use news::NewsAnalyst;
pub use sentiment::SentimentAnalyst;
pub use technical::TechnicalAnalyst;

/// JSON contract appended to every analyst system prompt
pub(crate) const REPORT_FORMAT: &str = r#"
Output a single JSON object and nothing else:
{
    "summary": "2-4 sentence analysis",
    "recommendation": "BUY" | "SELL" | "HOLD",
    "confidence": 0.0 to 1.0,
    "key_findings": ["..."],
    "risk_factors": ["..."]
}
"#;

/// An analyst turns market data into one report
pub trait Analyst: Agent {
    fn kind(&self) -> AnalystKind;

    fn build_prompt(&self, symbol: &str, market: &MarketData) -> String;
}

/// Run the analyst for `kind`. Analysts always send normal priority.
pub async fn analyze(
    kind: AnalystKind,
    llm: &dyn ChatModel,
    symbol: &str,
    market: &MarketData,
) -> Result<AnalysisReport, LlmError> {
    match kind {
        AnalystKind::Fundamental => run(&FundamentalAnalyst, llm, symbol, market).await,
        AnalystKind::Technical => run(&TechnicalAnalyst, llm, symbol, market).await,
        AnalystKind::Sentiment => run(&SentimentAnalyst, llm, symbol, market).await,
        AnalystKind::News => run(&NewsAnalyst, llm, symbol, market).await,
    }
}

/// Agent name of the analyst for `kind`
pub fn agent_name(kind: AnalystKind) -> String {
    match kind {
        AnalystKind::Fundamental => FundamentalAnalyst.name().to_string(),
        AnalystKind::Technical => TechnicalAnalyst.name().to_string(),
        AnalystKind::Sentiment => SentimentAnalyst.name().to_string(),
        AnalystKind::News => NewsAnalyst.name().to_string(),
    }
}

async fn run<A: Analyst>(
    analyst: &A,
    llm: &dyn ChatModel,
    symbol: &str,
    market: &MarketData,
) -> Result<AnalysisReport, LlmError> {
    let prompt = analyst.build_prompt(symbol, market);
    let reply = analyst.consult(llm, &prompt, Priority::Normal).await?;
    let report = build_report(analyst.role(), symbol, &reply);
    info!(
        event = constants::events::ANALYST_COMPLETED,
        analyst = %analyst.kind(),
        recommendation = %report.recommendation,
        confidence = report.confidence,
        "📊 [ANALYST] {} finished {}: {} ({:.2})",
        analyst.name(),
        symbol,
        report.recommendation,
        report.confidence
    );
    Ok(report)
}

/// Report from a reply, falling back to a text scan when it is not JSON
pub fn build_report(role: AgentRole, symbol: &str, reply: &str) -> AnalysisReport {
    match parse::parse_reply::<AnalystReply>(reply) {
        Some(parsed) => {
            let recommendation = parse::as_recommendation(parsed.recommendation.as_deref())
                .unwrap_or(Recommendation::Hold);
            let confidence = parse::as_confidence(parsed.confidence.as_ref())
                .unwrap_or(constants::decision::DEFAULT_CONFIDENCE);
            AnalysisReport {
                role,
                symbol: symbol.to_string(),
                content: parsed
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| reply.trim().to_string()),
                recommendation,
                confidence,
                key_findings: parsed.key_findings,
                risk_factors: parsed.risk_factors,
                created_at: Utc::now(),
            }
        }
        None => {
            let (recommendation, confidence) = parse::scan_decision(reply);
            warn!(
                event = constants::events::DECISION_FALLBACK,
                agent = %role,
                "⚠️ [ANALYST] {} reply was not JSON, using text scan: {} ({:.2})",
                role,
                recommendation,
                confidence
            );
            AnalysisReport {
                role,
                symbol: symbol.to_string(),
                content: reply.trim().to_string(),
                recommendation,
                confidence,
                key_findings: Vec::new(),
                risk_factors: Vec::new(),
                created_at: Utc::now(),
            }
        }
    }
}

pub(crate) fn fmt_opt(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "N/A".to_string())
}
