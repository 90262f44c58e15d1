use std::sync::LazyLock;

use super::{Analyst, REPORT_FORMAT};
use crate::agents::Agent;
use crate::data::MarketData;
use crate::types::{AgentRole, AnalystKind};

static SYSTEM_PROMPT: LazyLock<String> = LazyLock::new(|| {
    format!(
        r#"You are a Technical Analyst.
You will be provided with precomputed indicators and recent daily bars.
Read trend from the moving averages, momentum from RSI and MACD, and stretch from
the Bollinger bands. Identify support and resistance from the bars and state
whether the setup favors entering, exiting or waiting.
{}"#,
        REPORT_FORMAT
    )
});

/// Bars quoted verbatim in the prompt
const RECENT_BARS: usize = 10;

pub struct TechnicalAnalyst;

impl Agent for TechnicalAnalyst {
    fn name(&self) -> &str {
        "Technical-Analyst"
    }

    fn role(&self) -> AgentRole {
        AgentRole::TechnicalAnalyst
    }

    fn system_prompt(&self) -> &str {
        &SYSTEM_PROMPT
    }
}

impl Analyst for TechnicalAnalyst {
    fn kind(&self) -> AnalystKind {
        AnalystKind::Technical
    }

    fn build_prompt(&self, symbol: &str, market: &MarketData) -> String {
        let bars = market
            .recent_bars(RECENT_BARS)
            .iter()
            .map(|b| {
                format!(
                    "{} | O {:.2} H {:.2} L {:.2} C {:.2} V {}",
                    b.date, b.open, b.high, b.low, b.close, b.volume
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Symbol: {}\nDays of history: {}\n\nIndicators:\n{}\n\nRecent bars:\n{}\n\nAction: Produce the technical analysis report",
            symbol,
            market.history.len(),
            market.technicals().render(),
            if bars.is_empty() { "none".to_string() } else { bars }
        )
    }
}
