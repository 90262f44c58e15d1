use std::sync::LazyLock;

use super::{Analyst, REPORT_FORMAT};
use crate::agents::Agent;
use crate::data::MarketData;
use crate::types::{AgentRole, AnalystKind};

static SYSTEM_PROMPT: LazyLock<String> = LazyLock::new(|| {
    format!(
        r#"You are a Market Sentiment Analyst.
You read retail and institutional mood from social media activity and market-wide
fear gauges (VIX, put/call ratio, fear & greed index). Extreme optimism is a
contrarian warning, extreme fear can be an opportunity.
{}"#,
        REPORT_FORMAT
    )
});

pub struct SentimentAnalyst;

impl Agent for SentimentAnalyst {
    fn name(&self) -> &str {
        "Sentiment-Analyst"
    }

    fn role(&self) -> AgentRole {
        AgentRole::SentimentAnalyst
    }

    fn system_prompt(&self) -> &str {
        &SYSTEM_PROMPT
    }
}

impl Analyst for SentimentAnalyst {
    fn kind(&self) -> AnalystKind {
        AnalystKind::Sentiment
    }

    fn build_prompt(&self, symbol: &str, market: &MarketData) -> String {
        let s = &market.sentiment;
        format!(
            "Symbol: {}\n\
             Reddit posts (7d): {}\n\
             Twitter mentions (7d): {}\n\
             Positive ratio: {:.0}%\n\
             VIX: {:.2}\n\
             Put/Call ratio: {:.2}\n\
             Fear & Greed index: {}/100\n\
             Action: Produce the sentiment analysis report",
            symbol,
            s.reddit_posts,
            s.twitter_mentions,
            s.positive_ratio * 100.0,
            s.vix,
            s.put_call_ratio,
            s.fear_greed_index
        )
    }
}
