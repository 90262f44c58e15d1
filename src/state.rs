//! Per-run session state
//!
//! Owned by a single run and filled in serially as stages complete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use crate::constants;
use crate::debate::{ResearchDebateOutcome, RiskDebateOutcome};
use crate::error::WorkflowError;
use crate::types::{AnalysisReport, Decision, TradingDecision, WorkflowMode};
use crate::workflow::WorkflowStage;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: WorkflowStage,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Handle returned by `begin_stage`, consumed by `complete_stage`
pub struct StageTimer {
    stage: WorkflowStage,
    started_at: DateTime<Utc>,
    clock: Instant,
}

/// Everything a finished run produced
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub session_id: String,
    pub symbol: String,
    pub mode: WorkflowMode,
    pub reports: Vec<AnalysisReport>,
    pub research_debate: ResearchDebateOutcome,
    pub trading_decision: TradingDecision,
    pub risk_debate: Option<RiskDebateOutcome>,
    pub final_decision: Decision,
    pub stages: Vec<StageRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl WorkflowResult {
    pub fn to_json_pretty(&self) -> Result<String, WorkflowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

pub struct SessionState {
    session_id: String,
    symbol: String,
    mode: WorkflowMode,
    started_at: DateTime<Utc>,
    stages: Vec<StageRecord>,
    reports: Vec<AnalysisReport>,
    research: Option<ResearchDebateOutcome>,
    trading: Option<TradingDecision>,
    risk: Option<RiskDebateOutcome>,
    final_decision: Option<Decision>,
}

impl SessionState {
    pub fn new(symbol: &str, mode: WorkflowMode) -> Self {
        let started_at = Utc::now();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let session_id = format!(
            "session_{}_{}_{}",
            started_at.format("%Y%m%d_%H%M%S"),
            symbol,
            &suffix[..8]
        );
        Self {
            session_id,
            symbol: symbol.to_string(),
            mode,
            started_at,
            stages: Vec::new(),
            reports: Vec::new(),
            research: None,
            trading: None,
            risk: None,
            final_decision: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn reports(&self) -> &[AnalysisReport] {
        &self.reports
    }

    pub fn stages(&self) -> &[StageRecord] {
        &self.stages
    }

    pub fn begin_stage(&self, stage: WorkflowStage) -> StageTimer {
        info!("▶️ [STATE] {} entering {}", self.session_id, stage);
        StageTimer {
            stage,
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    pub fn complete_stage(&mut self, timer: StageTimer) {
        let duration_ms = timer.clock.elapsed().as_millis() as u64;
        info!(
            event = constants::events::STAGE_COMPLETED,
            session = %self.session_id,
            stage = %timer.stage,
            duration_ms,
            "✅ [STATE] {} completed in {}ms",
            timer.stage,
            duration_ms
        );
        self.stages.push(StageRecord {
            stage: timer.stage,
            started_at: timer.started_at,
            finished_at: Utc::now(),
            duration_ms,
        });
    }

    pub fn add_report(&mut self, report: AnalysisReport) {
        self.reports.push(report);
    }

    pub fn set_research(&mut self, outcome: ResearchDebateOutcome) {
        self.research = Some(outcome);
    }

    pub fn research(&self) -> Option<&ResearchDebateOutcome> {
        self.research.as_ref()
    }

    pub fn set_trading(&mut self, decision: TradingDecision) {
        self.trading = Some(decision);
    }

    pub fn trading(&self) -> Option<&TradingDecision> {
        self.trading.as_ref()
    }

    pub fn set_risk(&mut self, outcome: RiskDebateOutcome) {
        self.risk = Some(outcome);
    }

    pub fn risk(&self) -> Option<&RiskDebateOutcome> {
        self.risk.as_ref()
    }

    pub fn set_final(&mut self, decision: Decision) {
        self.final_decision = Some(decision);
    }

    pub fn finish(self) -> Result<WorkflowResult, WorkflowError> {
        let research_debate = self
            .research
            .ok_or(WorkflowError::Incomplete("research debate"))?;
        let trading_decision = self
            .trading
            .ok_or(WorkflowError::Incomplete("trading decision"))?;
        let final_decision = self
            .final_decision
            .ok_or(WorkflowError::Incomplete("final decision"))?;
        if self.mode == WorkflowMode::Full && self.risk.is_none() {
            return Err(WorkflowError::Incomplete("risk assessment"));
        }

        Ok(WorkflowResult {
            session_id: self.session_id,
            symbol: self.symbol,
            mode: self.mode,
            reports: self.reports,
            research_debate,
            trading_decision,
            risk_debate: self.risk,
            final_decision,
            stages: self.stages,
            started_at: self.started_at,
            finished_at: Utc::now(),
        })
    }
}
