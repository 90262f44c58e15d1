//! Trading Agents - multi-agent LLM trading firm simulation
//!
//! Analyst, researcher, trader, risk and fund-manager agents debate over
//! supplied or mocked market data and settle on a BUY / SELL / HOLD decision.

pub mod agents;
pub mod api;
pub mod config;
pub mod constants;
pub mod data;
pub mod debate;
pub mod error;
pub mod llm;
pub mod services;
pub mod state;
pub mod types;
pub mod workflow;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{ConfigError, LlmError, WorkflowError};
pub use llm::{ChatModel, ChatRequest, Priority};
pub use types::{Decision, Recommendation, WorkflowMode};
pub use workflow::{create_orchestrator, RunOptions, WorkflowOrchestrator, WorkflowResult};

#[cfg(test)]
mod workflow_tests;
