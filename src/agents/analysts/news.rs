use std::sync::LazyLock;

use super::{Analyst, REPORT_FORMAT};
use crate::agents::Agent;
use crate::data::MarketData;
use crate::types::{AgentRole, AnalystKind};

static SYSTEM_PROMPT: LazyLock<String> = LazyLock::new(|| {
    format!(
        r#"You are a News Analyst covering equities.
Weigh each headline by materiality and recency: earnings, guidance, regulation and
capital returns matter more than commentary. Separate company-specific news from
general market noise.
{}"#,
        REPORT_FORMAT
    )
});

pub struct NewsAnalyst;

impl Agent for NewsAnalyst {
    fn name(&self) -> &str {
        "News-Analyst"
    }

    fn role(&self) -> AgentRole {
        AgentRole::NewsAnalyst
    }

    fn system_prompt(&self) -> &str {
        &SYSTEM_PROMPT
    }
}

impl Analyst for NewsAnalyst {
    fn kind(&self) -> AnalystKind {
        AnalystKind::News
    }

    fn build_prompt(&self, symbol: &str, market: &MarketData) -> String {
        let headlines = if market.news.is_empty() {
            "No recent news available.".to_string()
        } else {
            market
                .news
                .iter()
                .map(|n| {
                    let tone = n
                        .sentiment
                        .map(|s| format!(" (tone {:+.2})", s))
                        .unwrap_or_default();
                    format!(
                        "- [{}] {}: {}{}",
                        n.published_at.format("%Y-%m-%d %H:%M"),
                        n.source,
                        n.headline,
                        tone
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "Symbol: {}\nRecent headlines:\n{}\nAction: Produce the news analysis report",
            symbol, headlines
        )
    }
}
