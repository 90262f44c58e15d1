//! In-process chat model that answers from a fixed script.
//! Used to drive the workflow offline.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{ChatModel, ChatRequest};
use crate::error::LlmError;

struct Rule {
    agent: Option<String>,
    needle: Option<String>,
    reply: Result<String, String>,
}

impl Rule {
    fn matches(&self, request: &ChatRequest) -> bool {
        self.agent.as_deref().map_or(true, |a| a == request.agent)
            && self
                .needle
                .as_deref()
                .map_or(true, |n| request.user_prompt.contains(n))
    }
}

/// The most recently added matching rule wins; unmatched requests get the default reply
pub struct ScriptedModel {
    name: String,
    rules: Vec<Rule>,
    default_reply: String,
    calls: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            name: "scripted".to_string(),
            rules: Vec::new(),
            default_reply: default_reply.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Always answer `agent` with `reply`
    pub fn reply(self, agent: &str, reply: impl Into<String>) -> Self {
        self.rule(Some(agent), None, Ok(reply.into()))
    }

    /// Answer `agent` with `reply` when its prompt contains `needle`
    pub fn reply_when(self, agent: &str, needle: &str, reply: impl Into<String>) -> Self {
        self.rule(Some(agent), Some(needle), Ok(reply.into()))
    }

    /// Fail every request from `agent`
    pub fn fail(self, agent: &str, message: impl Into<String>) -> Self {
        self.rule(Some(agent), None, Err(message.into()))
    }

    /// Fail every request whose prompt contains `needle`
    pub fn fail_when(self, needle: &str, message: impl Into<String>) -> Self {
        self.rule(None, Some(needle), Err(message.into()))
    }

    fn rule(mut self, agent: Option<&str>, needle: Option<&str>, reply: Result<String, String>) -> Self {
        self.rules.push(Rule {
            agent: agent.map(str::to_string),
            needle: needle.map(str::to_string),
            reply,
        });
        self
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn calls_for(&self, agent: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.agent == agent)
            .count()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let reply = self
            .rules
            .iter()
            .rev()
            .find(|r| r.matches(&request))
            .map(|r| r.reply.clone())
            .unwrap_or_else(|| Ok(self.default_reply.clone()));

        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        reply.map_err(LlmError::Backend)
    }
}
