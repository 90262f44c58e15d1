//! Application-wide constants and magic numbers
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make the workflow easier to tune.

/// LLM transport defaults
pub mod llm {
    pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
    pub const DEEPSEEK_MODEL: &str = "deepseek-chat";
    pub const DEEPSEEK_MAX_TOKENS: u32 = 8192;

    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    pub const OPENAI_MODEL: &str = "gpt-4o";
    pub const OPENAI_MAX_TOKENS: u32 = 4000;

    /// Per-request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Max in-flight completions across all sessions
    pub const DEFAULT_MAX_CONCURRENT: usize = 3;

    /// Capacity of each priority channel
    pub const DEFAULT_QUEUE_SIZE: usize = 64;

    /// Exponential backoff base between retries
    pub const RETRY_BASE_DELAY_MS: u64 = 4_000;

    /// Upper bound for a single backoff sleep
    pub const RETRY_MAX_DELAY_MS: u64 = 10_000;
}

/// Debate defaults and heuristics
pub mod debate {
    pub const DEFAULT_MAX_ROUNDS: usize = 3;

    pub const DEFAULT_CONSENSUS_THRESHOLD: f64 = 0.6;

    /// Phrases that count as one side conceding (matched lowercase)
    pub const CONCESSION_PHRASES: &[&str] = &[
        "i concede",
        "i must concede",
        "i agree with my opponent",
        "i agree with the opposing view",
        "i withdraw my",
        "i change my position",
        "we have reached consensus",
        "consensus has been reached",
    ];

    /// How much of each turn is echoed to the log
    pub const TURN_PREVIEW_CHARS: usize = 200;
}

/// Decision aggregation constants
pub mod decision {
    /// Confidence assumed when a reply carries none
    pub const DEFAULT_CONFIDENCE: f64 = 0.5;

    /// Ceiling for the report-vote fallback verdict
    pub const FALLBACK_CONFIDENCE_CAP: f64 = 0.8;

    /// Confidence attached to a decision recovered from free text only
    pub const HEURISTIC_CONFIDENCE: f64 = 0.3;
}

/// Trading defaults
pub mod trading {
    pub const DEFAULT_SYMBOLS: &[&str] = &["AAPL", "GOOGL", "MSFT"];
    pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

    /// Largest target position as a fraction of the portfolio
    pub const DEFAULT_MAX_POSITION_SIZE: f64 = 0.1;
    pub const DEFAULT_STOP_LOSS_PCT: f64 = 0.05;
    pub const DEFAULT_TAKE_PROFIT_PCT: f64 = 0.15;
    pub const DEFAULT_RISK_FREE_RATE: f64 = 0.03;
}

/// Batch analysis defaults
pub mod batch {
    /// Parallel workflows (kept low to avoid provider rate limits)
    pub const DEFAULT_MAX_WORKERS: usize = 3;

    /// Days of mocked price history per symbol
    pub const MOCK_HISTORY_DAYS: usize = 120;
}

/// HTTP server defaults
pub mod server {
    pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
}

/// Logging event names for structured logging
pub mod events {
    pub const WORKFLOW_STARTED: &str = "workflow_started";
    pub const WORKFLOW_COMPLETED: &str = "workflow_completed";
    pub const WORKFLOW_FAILED: &str = "workflow_failed";
    pub const STAGE_COMPLETED: &str = "stage_completed";
    pub const ANALYST_COMPLETED: &str = "analyst_completed";
    pub const DEBATE_TURN: &str = "debate_turn";
    pub const DEBATE_EARLY_STOP: &str = "debate_early_stop";
    pub const DECISION_FALLBACK: &str = "decision_fallback";
    pub const POSITION_CAPPED: &str = "position_capped";
    pub const LLM_RETRY: &str = "llm_retry";
    pub const BATCH_STARTED: &str = "batch_started";
    pub const BATCH_SYMBOL_FAILED: &str = "batch_symbol_failed";
    pub const BATCH_COMPLETED: &str = "batch_completed";
    pub const REPORT_EXPORTED: &str = "report_exported";
    pub const HTTP_REQUEST: &str = "http_request";
}
