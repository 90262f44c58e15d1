//! Multi-symbol analysis with bounded parallelism

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::constants;
use crate::data::{MarketData, MockMarketData};
use crate::services::reporting::{BatchEntry, BatchReport};
use crate::workflow::{normalize_symbol, RunOptions, WorkflowOrchestrator};

pub struct BatchAnalyzer {
    orchestrator: Arc<WorkflowOrchestrator>,
    max_workers: usize,
    options: RunOptions,
    positions: HashMap<String, f64>,
    market: HashMap<String, MarketData>,
}

impl BatchAnalyzer {
    pub fn new(orchestrator: Arc<WorkflowOrchestrator>) -> Self {
        let options = RunOptions::from_config(orchestrator.config());
        Self {
            orchestrator,
            max_workers: constants::batch::DEFAULT_MAX_WORKERS,
            options,
            positions: HashMap::new(),
            market: HashMap::new(),
        }
    }

    /// At least one worker is always kept
    pub fn with_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Current position per symbol (fraction of portfolio)
    pub fn with_positions(mut self, positions: HashMap<String, f64>) -> Self {
        self.positions = positions
            .into_iter()
            .map(|(symbol, size)| (symbol.trim().to_uppercase(), size))
            .collect();
        self
    }

    /// Caller-supplied data for a symbol; others get mocked data
    pub fn with_market_data(mut self, data: MarketData) -> Self {
        self.market.insert(data.symbol.trim().to_uppercase(), data);
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub async fn run(&self, symbols: &[String]) -> BatchReport {
        let started_at = Utc::now();

        let mut unique: Vec<String> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let key = symbol.trim().to_uppercase();
            if !unique.contains(&key) {
                unique.push(key);
            }
        }

        info!(
            event = constants::events::BATCH_STARTED,
            symbols = unique.len(),
            workers = self.max_workers,
            mode = %self.options.mode,
            "📦 [BATCH] Analyzing {} symbols with {} workers",
            unique.len(),
            self.max_workers
        );

        let entries: Vec<BatchEntry> = stream::iter(unique)
            .map(|symbol| self.analyze_one(symbol))
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        let report = BatchReport::new(entries, started_at, Utc::now());
        let summary = report.summary();
        info!(
            event = constants::events::BATCH_COMPLETED,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "📦 [BATCH] Done: {} ok, {} failed",
            summary.succeeded,
            summary.failed
        );
        report
    }

    async fn analyze_one(&self, symbol: String) -> BatchEntry {
        let options = self
            .options
            .clone()
            .with_position(self.positions.get(&symbol).copied().unwrap_or(0.0));

        let outcome = match self.market.get(&symbol) {
            Some(data) => self.orchestrator.run_with(&symbol, data, options).await,
            None => match normalize_symbol(&symbol) {
                Ok(normalized) => {
                    let data = MockMarketData::generate(
                        &normalized,
                        constants::batch::MOCK_HISTORY_DAYS,
                        MockMarketData::seed_for(&normalized),
                    );
                    self.orchestrator.run_with(&normalized, &data, options).await
                }
                Err(e) => Err(e),
            },
        };

        let outcome = outcome.map_err(|e| {
            warn!(
                event = constants::events::BATCH_SYMBOL_FAILED,
                symbol = %symbol,
                "⚠️ [BATCH] {} failed: {}",
                symbol,
                e
            );
            e.to_string()
        });

        BatchEntry { symbol, outcome }
    }
}
