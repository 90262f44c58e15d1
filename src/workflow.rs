//! Workflow orchestration
//!
//! analysts -> research debate -> trader, and in full mode
//! -> risk debate -> fund manager.

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::agents::analysts;
use crate::agents::trader::TradeContext;
use crate::agents::{Agent, FundManager, PositionLimits, Trader};
use crate::config::AppConfig;
use crate::constants;
use crate::data::MarketData;
use crate::debate::{ResearchDebateCoordinator, RiskDebateCoordinator};
use crate::error::WorkflowError;
use crate::llm::{ChatModel, LlmClient, LlmQueue, Priority};
use crate::state::SessionState;
use crate::types::{clamp_confidence, AnalysisReport, AnalystKind, Decision, WorkflowMode};

pub use crate::state::WorkflowResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Analysis,
    ResearchDebate,
    Trading,
    RiskDebate,
    FundManager,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowStage::Analysis => "analysis",
            WorkflowStage::ResearchDebate => "research_debate",
            WorkflowStage::Trading => "trading",
            WorkflowStage::RiskDebate => "risk_debate",
            WorkflowStage::FundManager => "fund_manager",
        };
        f.write_str(s)
    }
}

/// Per-run knobs; defaults come from the config
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub mode: WorkflowMode,
    pub analysts: Vec<AnalystKind>,
    /// Current position as a fraction of the portfolio
    pub current_position: f64,
}

impl RunOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            mode: config.workflow.mode,
            analysts: config.workflow.analysts.clone(),
            current_position: 0.0,
        }
    }

    pub fn with_mode(mut self, mode: WorkflowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_analysts(mut self, analysts: Vec<AnalystKind>) -> Self {
        self.analysts = analysts;
        self
    }

    pub fn with_position(mut self, current_position: f64) -> Self {
        self.current_position = current_position;
        self
    }
}

/// Trimmed, uppercased ticker; rejects empty or odd characters
pub fn normalize_symbol(symbol: &str) -> Result<String, WorkflowError> {
    let normalized = symbol.trim().to_uppercase();
    let valid = !normalized.is_empty()
        && normalized.len() <= 16
        && normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '/'));
    if valid {
        Ok(normalized)
    } else {
        Err(WorkflowError::InvalidSymbol(symbol.to_string()))
    }
}

/// Selection with duplicates removed, first occurrence kept
pub fn dedup_analysts(analysts: &[AnalystKind]) -> Vec<AnalystKind> {
    let mut unique = Vec::with_capacity(analysts.len());
    for kind in analysts {
        if !unique.contains(kind) {
            unique.push(*kind);
        }
    }
    unique
}

/// Build the production client, wrap it in the priority queue and return an orchestrator.
/// Must be called inside a tokio runtime.
pub fn create_orchestrator(config: AppConfig) -> Result<WorkflowOrchestrator, WorkflowError> {
    let settings = config.llm_settings();
    if settings.api_key.is_empty() {
        warn!(
            "⚠️ No API key configured for provider {}; requests will be rejected upstream",
            settings.provider
        );
    }
    let client = LlmClient::new(&settings, &config.llm)?;
    let queue = LlmQueue::new(
        Arc::new(client),
        config.llm.max_concurrent,
        config.llm.queue_size,
    );
    Ok(WorkflowOrchestrator::new(Arc::new(queue), config))
}

pub struct WorkflowOrchestrator {
    llm: Arc<dyn ChatModel>,
    config: Arc<AppConfig>,
    research: ResearchDebateCoordinator,
    risk: RiskDebateCoordinator,
}

impl WorkflowOrchestrator {
    pub fn new(llm: Arc<dyn ChatModel>, config: AppConfig) -> Self {
        let research = ResearchDebateCoordinator::new(&config.debate);
        let risk = RiskDebateCoordinator::new(&config.debate);
        Self {
            llm,
            config: Arc::new(config),
            research,
            risk,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    pub async fn run(&self, symbol: &str, market: &MarketData) -> Result<WorkflowResult, WorkflowError> {
        self.run_with(symbol, market, RunOptions::from_config(&self.config))
            .await
    }

    pub async fn run_with(
        &self,
        symbol: &str,
        market: &MarketData,
        options: RunOptions,
    ) -> Result<WorkflowResult, WorkflowError> {
        let symbol = normalize_symbol(symbol)?;
        let analysts = dedup_analysts(&options.analysts);
        if analysts.is_empty() {
            return Err(WorkflowError::NoAnalysts);
        }

        info!(
            event = constants::events::WORKFLOW_STARTED,
            symbol = %symbol,
            mode = %options.mode,
            analysts = analysts.len(),
            "🚀 [WORKFLOW] Starting {} analysis of {} with {} analysts",
            options.mode,
            symbol,
            analysts.len()
        );

        match self.execute(&symbol, market, &analysts, &options).await {
            Ok(result) => {
                info!(
                    event = constants::events::WORKFLOW_COMPLETED,
                    session = %result.session_id,
                    symbol = %symbol,
                    recommendation = %result.final_decision.recommendation,
                    confidence = result.final_decision.confidence,
                    "🏁 [WORKFLOW] {} -> {} (confidence {:.2}, position {:.1}%)",
                    symbol,
                    result.final_decision.recommendation,
                    result.final_decision.confidence,
                    result.final_decision.position_size * 100.0
                );
                Ok(result)
            }
            Err(e) => {
                error!(
                    event = constants::events::WORKFLOW_FAILED,
                    symbol = %symbol,
                    stage = ?e.stage(),
                    "❌ [WORKFLOW] {} failed: {}",
                    symbol,
                    e
                );
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        symbol: &str,
        market: &MarketData,
        analysts: &[AnalystKind],
        options: &RunOptions,
    ) -> Result<WorkflowResult, WorkflowError> {
        let llm = self.llm.as_ref();
        let trading = &self.config.trading;
        let mut state = SessionState::new(symbol, options.mode);
        let current_position = trading.cap_position(options.current_position);
        let limits = PositionLimits {
            current: current_position,
            max: trading.max_position_size,
        };

        // Analysts
        let timer = state.begin_stage(WorkflowStage::Analysis);
        for report in self.run_analysts(symbol, market, analysts).await? {
            state.add_report(report);
        }
        state.complete_stage(timer);

        // Research debate
        let timer = state.begin_stage(WorkflowStage::ResearchDebate);
        let research = self.research.conduct(llm, symbol, state.reports()).await?;
        state.set_research(research);
        state.complete_stage(timer);

        // Trader
        let timer = state.begin_stage(WorkflowStage::Trading);
        let verdict = &state
            .research()
            .ok_or(WorkflowError::Incomplete("research debate"))?
            .verdict;
        let ctx = TradeContext {
            symbol,
            market,
            reports: state.reports(),
            verdict,
            current_position,
            max_position_size: trading.max_position_size,
        };
        let trader = Trader;
        let reply = trader
            .consult(llm, &trader.build_prompt(&ctx), Priority::High)
            .await
            .map_err(|e| WorkflowError::llm(WorkflowStage::Trading, trader.name(), e))?;
        let mut decision = trader.parse_decision(&ctx, &reply);
        decision.position_size = self.cap(WorkflowStage::Trading, decision.position_size);
        let (stop_loss, take_profit) =
            trading.default_levels(decision.recommendation, market.price.current);
        decision.stop_loss = decision.stop_loss.or(stop_loss);
        decision.take_profit = decision.take_profit.or(take_profit);
        state.set_trading(decision);
        state.complete_stage(timer);

        let trading_decision = state
            .trading()
            .ok_or(WorkflowError::Incomplete("trading decision"))?
            .clone();

        let final_decision = match options.mode {
            WorkflowMode::Quick => Decision {
                recommendation: trading_decision.recommendation,
                confidence: trading_decision.confidence,
                rationale: trading_decision.reasoning.clone(),
                position_size: trading_decision.position_size,
            },
            WorkflowMode::Full => {
                let verdict = state
                    .research()
                    .ok_or(WorkflowError::Incomplete("research debate"))?
                    .verdict
                    .clone();

                // Risk team
                let timer = state.begin_stage(WorkflowStage::RiskDebate);
                let mut risk = self
                    .risk
                    .conduct(llm, symbol, &trading_decision, &verdict, limits)
                    .await?;
                risk.assessment.position_size =
                    self.cap(WorkflowStage::RiskDebate, risk.assessment.position_size);
                state.set_risk(risk);
                state.complete_stage(timer);

                // Fund manager
                let timer = state.begin_stage(WorkflowStage::FundManager);
                let assessment = &state
                    .risk()
                    .ok_or(WorkflowError::Incomplete("risk assessment"))?
                    .assessment;
                let manager = FundManager;
                let prompt = manager.build_prompt(
                    symbol,
                    state.reports(),
                    &verdict,
                    &trading_decision,
                    assessment,
                );
                let reply = manager
                    .consult(llm, &prompt, Priority::High)
                    .await
                    .map_err(|e| WorkflowError::llm(WorkflowStage::FundManager, manager.name(), e))?;
                let mut decision = manager.parse_decision(&reply, &trading_decision, assessment, limits);
                decision.position_size = self.cap(WorkflowStage::FundManager, decision.position_size);
                state.complete_stage(timer);
                decision
            }
        };

        state.set_final(Decision {
            confidence: clamp_confidence(final_decision.confidence),
            ..final_decision
        });
        state.finish()
    }

    async fn run_analysts(
        &self,
        symbol: &str,
        market: &MarketData,
        analysts: &[AnalystKind],
    ) -> Result<Vec<AnalysisReport>, WorkflowError> {
        let llm = self.llm.as_ref();
        let run_one = |kind: AnalystKind| async move {
            analysts::analyze(kind, llm, symbol, market)
                .await
                .map_err(|e| WorkflowError::llm(WorkflowStage::Analysis, analysts::agent_name(kind), e))
        };

        if self.config.workflow.parallel_analysts {
            // try_join_all keeps input order
            try_join_all(analysts.iter().copied().map(run_one)).await
        } else {
            let mut reports = Vec::with_capacity(analysts.len());
            for &kind in analysts {
                reports.push(run_one(kind).await?);
            }
            Ok(reports)
        }
    }

    fn cap(&self, stage: WorkflowStage, size: f64) -> f64 {
        let capped = self.config.trading.cap_position(size);
        if capped != size {
            warn!(
                event = constants::events::POSITION_CAPPED,
                stage = %stage,
                requested = size,
                capped,
                "⚠️ [RISK] Position {:.4} outside [0, {}], set to {:.4}",
                size,
                self.config.trading.max_position_size,
                capped
            );
        }
        capped
    }
}
