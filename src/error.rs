//! Custom error types for the agent workflow
//!
//! Provides structured, typed errors instead of generic Box<dyn Error>

use thiserror::Error;

use crate::workflow::WorkflowStage;

/// Errors raised while talking to the chat-completion endpoint
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM API error: {0}")]
    Api(#[from] async_openai::error::OpenAIError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("LLM returned no choices (model: {model})")]
    EmptyResponse { model: String },

    #[error("LLM queue is closed")]
    QueueClosed,

    #[error("LLM request was cancelled")]
    Cancelled,

    /// Error surfaced by a non-OpenAI backend (test doubles, proxies)
    #[error("LLM backend error: {0}")]
    Backend(String),
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level workflow errors
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("No analysts selected")]
    NoAnalysts,

    #[error("LLM call failed during {stage} ({agent}): {source}")]
    Llm {
        stage: WorkflowStage,
        agent: String,
        #[source]
        source: LlmError,
    },

    #[error("LLM client setup failed: {0}")]
    Client(#[from] LlmError),

    #[error("Workflow ended before {0} was produced")]
    Incomplete(&'static str),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),
}

impl WorkflowError {
    /// Wraps an LLM failure with the stage and agent that issued the call
    pub fn llm(stage: WorkflowStage, agent: impl Into<String>, source: LlmError) -> Self {
        WorkflowError::Llm {
            stage,
            agent: agent.into(),
            source,
        }
    }

    /// Stage of the failing LLM call, if this is an LLM failure
    pub fn stage(&self) -> Option<WorkflowStage> {
        match self {
            WorkflowError::Llm { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// True for caller mistakes (bad symbol, empty analyst list)
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            WorkflowError::InvalidSymbol(_) | WorkflowError::NoAnalysts
        )
    }
}

/// Helper to check whether an upstream error message looks like a rate limit
pub fn is_rate_limit_error(error: &str) -> bool {
    let lower = error.to_lowercase();
    lower.contains("429") || lower.contains("rate limit") || lower.contains("rate_limit")
}
