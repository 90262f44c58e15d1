pub mod indicators;
pub mod market;

#[cfg(test)]
mod market_tests;

pub use indicators::TechnicalSnapshot;
pub use market::{MarketData, MockMarketData, NewsItem, PriceBar, SentimentSnapshot};
