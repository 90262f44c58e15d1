use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::indicators::TechnicalSnapshot;
use crate::error::WorkflowError;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub name: String,
    pub sector: String,
    pub industry: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceSnapshot {
    pub current: f64,
    pub previous_close: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub volume: u64,
}

impl PriceSnapshot {
    pub fn change_pct(&self) -> f64 {
        if self.previous_close == 0.0 {
            0.0
        } else {
            (self.current - self.previous_close) / self.previous_close * 100.0
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fundamentals {
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub roe: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub market_cap: Option<f64>,
    pub week_52_high: Option<f64>,
    pub week_52_low: Option<f64>,
    pub avg_volume: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    #[serde(default)]
    pub source: String,
    pub published_at: DateTime<Utc>,
    /// -1 (very negative) to 1 (very positive), when known
    #[serde(default)]
    pub sentiment: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentSnapshot {
    pub reddit_posts: u32,
    pub twitter_mentions: u32,
    pub positive_ratio: f64,
    pub vix: f64,
    pub put_call_ratio: f64,
    pub fear_greed_index: u32,
}

impl Default for SentimentSnapshot {
    fn default() -> Self {
        Self {
            reddit_posts: 150,
            twitter_mentions: 300,
            positive_ratio: 0.65,
            vix: 18.5,
            put_call_ratio: 0.8,
            fear_greed_index: 70,
        }
    }
}

/// Everything the analysts are shown about one symbol
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketData {
    pub symbol: String,
    pub company: CompanyProfile,
    pub price: PriceSnapshot,
    pub fundamentals: Fundamentals,
    pub history: Vec<PriceBar>,
    pub news: Vec<NewsItem>,
    pub sentiment: SentimentSnapshot,
    /// Average cost of the held position, if any
    pub average_cost: Option<f64>,
}

impl MarketData {
    pub fn from_file(path: &Path) -> Result<Self, WorkflowError> {
        let content = fs::read_to_string(path)?;
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        Ok(serde_json::from_str(content)?)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.history.iter().map(|b| b.close).collect()
    }

    pub fn technicals(&self) -> TechnicalSnapshot {
        TechnicalSnapshot::compute(&self.closes())
    }

    /// Most recent bars, oldest first
    pub fn recent_bars(&self, n: usize) -> &[PriceBar] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }
}

const SECTORS: &[(&str, &str)] = &[
    ("Technology", "Consumer Electronics"),
    ("Technology", "Software - Infrastructure"),
    ("Communication Services", "Internet Content & Information"),
    ("Consumer Cyclical", "Auto Manufacturers"),
    ("Financial Services", "Banks - Diversified"),
    ("Healthcare", "Drug Manufacturers"),
];

const HEADLINES: &[(&str, f64)] = &[
    ("{} beats quarterly earnings expectations", 0.7),
    ("{} announces expanded share buyback program", 0.5),
    ("Analysts raise price target on {}", 0.4),
    ("{} unveils new product line at annual event", 0.3),
    ("{} faces regulatory scrutiny over market practices", -0.5),
    ("Supply chain concerns weigh on {}", -0.4),
    ("{} guidance disappoints investors", -0.6),
    ("{} trades flat as market awaits Fed decision", 0.0),
];

/// Deterministic mock market data
pub struct MockMarketData;

impl MockMarketData {
    /// `days` of history ending today
    pub fn generate(symbol: &str, days: usize, seed: u64) -> MarketData {
        Self::generate_at(symbol, days, seed, Utc::now().date_naive())
    }

    /// Seeded random walk ending on `end`; equal inputs give equal output
    pub fn generate_at(symbol: &str, days: usize, seed: u64, end: NaiveDate) -> MarketData {
        let mut rng = StdRng::seed_from_u64(seed);
        let symbol = symbol.trim().to_uppercase();

        let (sector, industry) = SECTORS[rng.gen_range(0..SECTORS.len())];
        let start_price: f64 = rng.gen_range(40.0..400.0);
        let drift: f64 = rng.gen_range(-0.001..0.0015);
        let volatility: f64 = rng.gen_range(0.01..0.03);

        let mut history = Vec::with_capacity(days);
        let mut close = start_price;
        for i in 0..days {
            let offset = (days - 1 - i) as i64;
            let date = end - Duration::days(offset);
            let open = close;
            let ret = drift + volatility * rng.gen_range(-1.0..1.0);
            close = (open * (1.0 + ret)).max(1.0);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            history.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume: rng.gen_range(1_000_000..50_000_000),
            });
        }

        let (current, previous_close, day_high, day_low, volume) = match history.as_slice() {
            [.., prev, last] => (last.close, prev.close, last.high, last.low, last.volume),
            [last] => (last.close, last.open, last.high, last.low, last.volume),
            [] => (start_price, start_price, start_price, start_price, 0),
        };

        let year = &history[history.len().saturating_sub(252)..];
        let week_52_high = year.iter().map(|b| b.high).fold(None, |m: Option<f64>, h| {
            Some(m.map_or(h, |m| m.max(h)))
        });
        let week_52_low = year.iter().map(|b| b.low).fold(None, |m: Option<f64>, l| {
            Some(m.map_or(l, |m| m.min(l)))
        });
        let avg_volume = if history.is_empty() {
            None
        } else {
            Some(history.iter().map(|b| b.volume).sum::<u64>() / history.len() as u64)
        };

        let fundamentals = Fundamentals {
            pe_ratio: Some(round2(rng.gen_range(8.0..45.0))),
            forward_pe: Some(round2(rng.gen_range(8.0..40.0))),
            price_to_book: Some(round2(rng.gen_range(1.0..15.0))),
            debt_to_equity: Some(round2(rng.gen_range(0.0..2.0))),
            roe: Some(round2(rng.gen_range(-0.05..0.4))),
            revenue_growth: Some(round2(rng.gen_range(-0.1..0.3))),
            market_cap: Some((current * rng.gen_range(1.0e8..1.5e10)).round()),
            week_52_high,
            week_52_low,
            avg_volume,
        };

        let news_count = rng.gen_range(3..=6);
        let end_ts = Utc
            .from_utc_datetime(&end.and_hms_opt(16, 0, 0).unwrap_or_default());
        let news = (0..news_count)
            .map(|i| {
                let (template, tone) = HEADLINES[rng.gen_range(0..HEADLINES.len())];
                NewsItem {
                    headline: template.replace("{}", &symbol),
                    source: ["Reuters", "Bloomberg", "MarketWatch", "CNBC"][i % 4].to_string(),
                    published_at: end_ts - Duration::hours(rng.gen_range(1..168)),
                    sentiment: Some(round2((tone + rng.gen_range(-0.2..0.2)).clamp(-1.0, 1.0))),
                }
            })
            .collect();

        let sentiment = SentimentSnapshot {
            reddit_posts: rng.gen_range(50..400),
            twitter_mentions: rng.gen_range(100..1200),
            positive_ratio: round2(rng.gen_range(0.3..0.8)),
            vix: round2(rng.gen_range(12.0..35.0)),
            put_call_ratio: round2(rng.gen_range(0.5..1.4)),
            fear_greed_index: rng.gen_range(10..=90),
        };

        MarketData {
            company: CompanyProfile {
                name: format!("{} Inc.", symbol),
                sector: sector.to_string(),
                industry: industry.to_string(),
            },
            price: PriceSnapshot {
                current,
                previous_close,
                day_high,
                day_low,
                volume,
            },
            symbol,
            fundamentals,
            history,
            news,
            sentiment,
            average_cost: None,
        }
    }

    /// Stable per-symbol seed (FNV-1a)
    pub fn seed_for(symbol: &str) -> u64 {
        symbol
            .trim()
            .to_uppercase()
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |hash, b| {
                (hash ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
            })
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
