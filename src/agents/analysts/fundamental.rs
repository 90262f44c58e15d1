use std::sync::LazyLock;

use super::{fmt_opt, Analyst, REPORT_FORMAT};
use crate::agents::Agent;
use crate::data::MarketData;
use crate::types::{AgentRole, AnalystKind};

static SYSTEM_PROMPT: LazyLock<String> = LazyLock::new(|| {
    format!(
        r#"You are a Fundamental Analyst at an equity research desk.
You judge a company's intrinsic value from its valuation multiples, balance sheet
strength, profitability and growth. Compare multiples with what is typical for the
sector, call out leverage and margin risks, and say whether the current price leaves
a margin of safety.
{}"#,
        REPORT_FORMAT
    )
});

pub struct FundamentalAnalyst;

impl Agent for FundamentalAnalyst {
    fn name(&self) -> &str {
        "Fundamental-Analyst"
    }

    fn role(&self) -> AgentRole {
        AgentRole::FundamentalAnalyst
    }

    fn system_prompt(&self) -> &str {
        &SYSTEM_PROMPT
    }
}

impl Analyst for FundamentalAnalyst {
    fn kind(&self) -> AnalystKind {
        AnalystKind::Fundamental
    }

    fn build_prompt(&self, symbol: &str, market: &MarketData) -> String {
        let f = &market.fundamentals;
        format!(
            "Symbol: {symbol}\n\
             Company: {name} ({sector} / {industry})\n\
             Current price: {price:.2}\n\
             Market cap: {cap}\n\
             P/E: {pe}  Forward P/E: {fpe}  P/B: {pb}\n\
             Debt/Equity: {de}  ROE: {roe}  Revenue growth: {growth}\n\
             52-week range: {low} - {high}\n\
             Action: Produce the fundamental analysis report",
            symbol = symbol,
            name = market.company.name,
            sector = market.company.sector,
            industry = market.company.industry,
            price = market.price.current,
            cap = fmt_opt(f.market_cap),
            pe = fmt_opt(f.pe_ratio),
            fpe = fmt_opt(f.forward_pe),
            pb = fmt_opt(f.price_to_book),
            de = fmt_opt(f.debt_to_equity),
            roe = fmt_opt(f.roe),
            growth = fmt_opt(f.revenue_growth),
            low = fmt_opt(f.week_52_low),
            high = fmt_opt(f.week_52_high),
        )
    }
}
