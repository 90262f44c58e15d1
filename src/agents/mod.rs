pub mod analysts;
pub mod fund_manager;
pub mod judge;
pub mod parse;
pub mod researcher;
pub mod risk;
pub mod trader;

#[cfg(test)]
mod agents_tests;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::LlmError;
use crate::llm::{ChatModel, ChatRequest, Priority};
use crate::types::{AgentRole, Stance};

pub use analysts::Analyst;
pub use fund_manager::FundManager;
pub use judge::DebateJudge;
pub use researcher::Researcher;
pub use risk::{RiskAnalyst, RiskManager};
pub use trader::{PositionLimits, Trader};

#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;
    fn role(&self) -> AgentRole;
    fn system_prompt(&self) -> &str;

    /// One completion with this agent's system prompt
    async fn consult(
        &self,
        llm: &dyn ChatModel,
        prompt: &str,
        priority: Priority,
    ) -> Result<String, LlmError> {
        info!(
            "🤖 [AGENT] Sending {} priority request to {}...",
            priority,
            self.name()
        );
        let request = ChatRequest::new(self.name(), self.system_prompt(), prompt, priority);
        let response = llm.complete(request).await?;
        debug!("🤖 [AGENT] Response from {}: {}", self.name(), response);
        Ok(response)
    }
}

/// A debate participant
pub trait Debater: Agent {
    fn stance(&self) -> Stance;

    /// Opening thesis from the shared brief
    fn opening_prompt(&self, brief: &str) -> String;

    /// Rebuttal against the opposing arguments seen so far
    fn rebuttal_prompt(&self, brief: &str, opposing: &str, round: usize) -> String;
}

/// First `max` characters of `text`, on a char boundary
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
