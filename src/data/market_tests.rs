//! Unit tests for market data loading and the mock generator.

#[cfg(test)]
mod market_tests {
    use crate::data::market::{MarketData, MockMarketData};
    use chrono::NaiveDate;
    use std::io::Write;

    fn end_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    // ============= Mock Generator Tests =============

    #[test]
    fn test_same_seed_same_data() {
        let a = MockMarketData::generate_at("AAPL", 60, 7, end_date());
        let b = MockMarketData::generate_at("AAPL", 60, 7, end_date());
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_different_seed_different_walk() {
        let a = MockMarketData::generate_at("AAPL", 60, 1, end_date());
        let b = MockMarketData::generate_at("AAPL", 60, 2, end_date());
        assert_ne!(a.closes(), b.closes());
    }

    #[test]
    fn test_history_shape() {
        let data = MockMarketData::generate_at("msft", 30, 42, end_date());
        assert_eq!(data.symbol, "MSFT");
        assert_eq!(data.history.len(), 30);
        assert_eq!(data.history.last().unwrap().date, end_date());
        for bar in &data.history {
            assert!(bar.high >= bar.open.max(bar.close));
            assert!(bar.low <= bar.open.min(bar.close));
            assert!(bar.close > 0.0);
        }
        for pair in data.history.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
        assert_eq!(data.price.current, data.history.last().unwrap().close);
        assert!(!data.news.is_empty());
        assert!(data.news.iter().all(|n| n.headline.contains("MSFT")));
    }

    #[test]
    fn test_zero_days_is_valid() {
        let data = MockMarketData::generate_at("TSLA", 0, 3, end_date());
        assert!(data.history.is_empty());
        assert!(data.technicals().last_close.is_none());
        assert!(data.price.current > 0.0);
    }

    #[test]
    fn test_seed_for_is_stable_and_case_insensitive() {
        assert_eq!(MockMarketData::seed_for("aapl"), MockMarketData::seed_for("AAPL"));
        assert_ne!(MockMarketData::seed_for("AAPL"), MockMarketData::seed_for("MSFT"));
    }

    // ============= Helpers Tests =============

    #[test]
    fn test_recent_bars() {
        let data = MockMarketData::generate_at("NVDA", 10, 5, end_date());
        assert_eq!(data.recent_bars(3).len(), 3);
        assert_eq!(data.recent_bars(50).len(), 10);
        assert_eq!(data.recent_bars(3)[2].date, end_date());
    }

    #[test]
    fn test_change_pct() {
        let mut data = MarketData::default();
        data.price.current = 110.0;
        data.price.previous_close = 100.0;
        assert!((data.price.change_pct() - 10.0).abs() < 1e-9);
        data.price.previous_close = 0.0;
        assert_eq!(data.price.change_pct(), 0.0);
    }

    // ============= File Loading Tests =============

    #[test]
    fn test_from_file_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "\u{feff}{{\"symbol\": \"AAPL\", \"price\": {{\"current\": 190.5}}, \"average_cost\": 150.0}}"
        )
        .unwrap();

        let data = MarketData::from_file(file.path()).unwrap();
        assert_eq!(data.symbol, "AAPL");
        assert_eq!(data.price.current, 190.5);
        assert_eq!(data.average_cost, Some(150.0));
        assert!(data.history.is_empty());
        assert_eq!(data.sentiment.reddit_posts, 150);
    }

    #[test]
    fn test_from_file_missing_is_error() {
        assert!(MarketData::from_file(std::path::Path::new("/nonexistent/market.json")).is_err());
    }
}
