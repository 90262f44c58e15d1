//! Unit tests for the workflow orchestrator - stage sequencing, caps and error tagging.

#[cfg(test)]
mod workflow_tests {
    use crate::config::AppConfig;
    use crate::data::{MarketData, MockMarketData};
    use crate::error::WorkflowError;
    use crate::llm::ScriptedModel;
    use crate::types::*;
    use crate::workflow::*;
    use std::sync::Arc;

    const ANALYST_NAMES: [&str; 4] = [
        "Fundamental-Analyst",
        "Technical-Analyst",
        "Sentiment-Analyst",
        "News-Analyst",
    ];

    fn scripted() -> ScriptedModel {
        let analyst = r#"{"content": "fine", "recommendation": "BUY", "confidence": 0.7}"#;
        let mut llm = ScriptedModel::new("No comment.")
            .reply("Bull-Researcher", "Upside is large")
            .reply("Bear-Researcher", "Downside is real")
            .reply(
                "Debate-Judge",
                r#"{"decision": "BUY", "confidence": 0.65, "winner": "bull", "reasoning": "growth"}"#,
            )
            .reply(
                "Trader",
                r#"{"recommendation": "BUY", "confidence": 0.72, "position_size": 0.06, "reasoning": "enter"}"#,
            )
            .reply(
                "Risk-Manager",
                r#"{"risk_level": "MEDIUM", "action": "BUY", "position_size": 0.05, "rationale": "ok"}"#,
            )
            .reply(
                "Fund-Manager",
                r#"{"final_recommendation": "BUY", "confidence": 0.68, "position_size": 0.05, "decision_summary": "approved"}"#,
            );
        for name in ANALYST_NAMES {
            llm = llm.reply(name, analyst);
        }
        llm
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.debate.max_rounds = 1;
        config
    }

    fn market() -> MarketData {
        MockMarketData::generate("AMD", 60, 42)
    }

    fn orchestrator(llm: Arc<ScriptedModel>, config: AppConfig) -> WorkflowOrchestrator {
        WorkflowOrchestrator::new(llm, config)
    }

    fn assert_failed_at(err: WorkflowError, expected_stage: WorkflowStage, expected_agent: &str) {
        match err {
            WorkflowError::Llm { stage, agent, .. } => {
                assert_eq!(stage, expected_stage);
                assert_eq!(agent, expected_agent);
            }
            other => panic!("expected an LLM error, got {other}"),
        }
    }

    // ============= Symbol and Option Tests =============

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_symbol("brk.b").unwrap(), "BRK.B");
        assert_eq!(normalize_symbol("^gspc").unwrap(), "^GSPC");
        assert!(normalize_symbol("").is_err());
        assert!(normalize_symbol("AA PL").is_err());
        assert!(normalize_symbol("THISISAVERYLONGSYMBOL").is_err());
    }

    #[test]
    fn test_dedup_analysts_keeps_first_occurrence() {
        let unique = dedup_analysts(&[
            AnalystKind::News,
            AnalystKind::Technical,
            AnalystKind::News,
        ]);
        assert_eq!(unique, vec![AnalystKind::News, AnalystKind::Technical]);
    }

    #[test]
    fn test_workflow_stage_display() {
        assert_eq!(WorkflowStage::ResearchDebate.to_string(), "research_debate");
        assert_eq!(
            serde_json::to_string(&WorkflowStage::FundManager).unwrap(),
            "\"fund_manager\""
        );
    }

    // ============= Quick Mode Tests =============

    #[tokio::test]
    async fn test_quick_run_calls_each_analyst_once() {
        let llm = Arc::new(scripted());
        let orch = orchestrator(llm.clone(), config());

        let result = orch.run("amd", &market()).await.unwrap();

        for name in ANALYST_NAMES {
            assert_eq!(llm.calls_for(name), 1, "{name} should run once");
        }
        assert_eq!(llm.calls_for("Trader"), 1);
        assert_eq!(llm.calls_for("Risk-Manager"), 0);
        assert_eq!(llm.calls_for("Fund-Manager"), 0);

        assert_eq!(result.symbol, "AMD");
        assert_eq!(result.mode, WorkflowMode::Quick);
        assert_eq!(result.reports.len(), 4);
        assert_eq!(result.research_debate.transcript.len(), 2);
        assert!(result.risk_debate.is_none());
        assert_eq!(result.stages.len(), 3);
        assert!(result.session_id.starts_with("session_"));
        assert!(result.session_id.contains("_AMD_"));

        // Quick mode: the trader decides
        assert_eq!(result.final_decision.recommendation, Recommendation::Buy);
        assert_eq!(result.final_decision.confidence, 0.72);
        assert_eq!(result.final_decision.position_size, 0.06);
    }

    #[tokio::test]
    async fn test_duplicate_analysts_collapse() {
        let llm = Arc::new(scripted());
        let orch = orchestrator(llm.clone(), config());
        let options = RunOptions::from_config(orch.config()).with_analysts(vec![
            AnalystKind::Technical,
            AnalystKind::Technical,
            AnalystKind::News,
        ]);

        let result = orch.run_with("AMD", &market(), options).await.unwrap();
        assert_eq!(result.reports.len(), 2);
        assert_eq!(llm.calls_for("Technical-Analyst"), 1);
        assert_eq!(llm.calls_for("Fundamental-Analyst"), 0);
        assert_eq!(result.reports[0].role, AgentRole::TechnicalAnalyst);
        assert_eq!(result.reports[1].role, AgentRole::NewsAnalyst);
    }

    #[tokio::test]
    async fn test_parallel_analysts_keep_selection_order() {
        let llm = Arc::new(scripted());
        let mut config = config();
        config.workflow.parallel_analysts = true;
        let orch = orchestrator(llm.clone(), config);

        let result = orch.run("AMD", &market()).await.unwrap();
        let roles: Vec<AgentRole> = result.reports.iter().map(|r| r.role).collect();
        let expected: Vec<AgentRole> = AnalystKind::ALL.iter().map(|k| k.role()).collect();
        assert_eq!(roles, expected);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_before_llm() {
        let llm = Arc::new(scripted());
        let orch = orchestrator(llm.clone(), config());

        let err = orch.run("not a symbol!", &market()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidSymbol(_)));
        assert!(err.is_invalid_input());

        let options = RunOptions::from_config(orch.config()).with_analysts(vec![]);
        let err = orch.run_with("AMD", &market(), options).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NoAnalysts));

        assert!(llm.requests().is_empty());
    }

    // ============= Position Cap Tests =============

    #[tokio::test]
    async fn test_trader_position_is_capped() {
        let llm = Arc::new(scripted().reply(
            "Trader",
            r#"{"recommendation": "BUY", "confidence": 0.9, "position_size": 0.9}"#,
        ));
        let orch = orchestrator(llm, config());

        let result = orch.run("AMD", &market()).await.unwrap();
        assert_eq!(result.trading_decision.position_size, 0.1);
        assert_eq!(result.final_decision.position_size, 0.1);
    }

    #[tokio::test]
    async fn test_hold_fallback_keeps_capped_current_position() {
        let llm = Arc::new(scripted().reply("Trader", "I would simply hold."));
        let orch = orchestrator(llm, config());
        let options = RunOptions::from_config(orch.config()).with_position(0.5);

        let result = orch.run_with("AMD", &market(), options).await.unwrap();
        assert_eq!(result.final_decision.recommendation, Recommendation::Hold);
        assert_eq!(result.final_decision.position_size, 0.1);
    }

    // ============= Malformed Reply Tests =============

    #[tokio::test]
    async fn test_malformed_replies_degrade_to_heuristics() {
        let llm = Arc::new(ScriptedModel::new("{ this is not json at all"));
        let mut config = config();
        config.workflow.mode = WorkflowMode::Full;
        let orch = orchestrator(llm, config);

        let result = orch.run("AMD", &market()).await.unwrap();
        assert!(result.research_debate.fallback_verdict);
        assert!(Recommendation::ALL.contains(&result.final_decision.recommendation));
        assert!((0.0..=1.0).contains(&result.final_decision.confidence));
        assert!(result.final_decision.position_size <= 0.1);
    }

    // ============= Full Mode Tests =============

    #[tokio::test]
    async fn test_full_run_includes_risk_and_fund_manager() {
        let llm = Arc::new(scripted());
        let orch = orchestrator(llm.clone(), config());
        let options = RunOptions::from_config(orch.config()).with_mode(WorkflowMode::Full);

        let result = orch.run_with("AMD", &market(), options).await.unwrap();

        let risk = result.risk_debate.as_ref().unwrap();
        assert_eq!(risk.transcript.len(), 3);
        assert_eq!(risk.assessment.position_size, 0.05);
        assert_eq!(result.stages.len(), 5);
        assert_eq!(result.stages[3].stage, WorkflowStage::RiskDebate);
        assert_eq!(llm.calls_for("Fund-Manager"), 1);

        assert_eq!(result.final_decision.rationale, "approved");
        assert_eq!(result.final_decision.confidence, 0.68);
        assert!(result.to_json_pretty().unwrap().contains("\"final_decision\""));
    }

    #[tokio::test]
    async fn test_full_run_caps_risk_and_fund_positions() {
        let llm = Arc::new(
            scripted()
                .reply("Risk-Manager", r#"{"risk_level": "LOW", "action": "BUY", "position_size": 0.4}"#)
                .reply("Fund-Manager", r#"{"final_recommendation": "BUY", "position_size": 35}"#),
        );
        let mut config = config();
        config.workflow.mode = WorkflowMode::Full;
        let orch = orchestrator(llm, config);

        let result = orch.run("AMD", &market()).await.unwrap();
        assert_eq!(result.risk_debate.unwrap().assessment.position_size, 0.1);
        assert_eq!(result.final_decision.position_size, 0.1);
    }

    #[tokio::test]
    async fn test_full_run_unsized_sell_reversal_exits_position() {
        let llm = Arc::new(
            scripted()
                .reply("Risk-Manager", r#"{"risk_level": "HIGH", "action": "SELL"}"#)
                .reply("Fund-Manager", "After review the final recommendation is SELL."),
        );
        let mut config = config();
        config.workflow.mode = WorkflowMode::Full;
        let orch = orchestrator(llm, config);

        let result = orch.run("AMD", &market()).await.unwrap();
        assert_eq!(result.trading_decision.recommendation, Recommendation::Buy);
        assert_eq!(result.trading_decision.position_size, 0.06);

        let risk = result.risk_debate.as_ref().unwrap();
        assert_eq!(risk.assessment.recommendation, Recommendation::Sell);
        assert_eq!(risk.assessment.position_size, 0.0);
        assert_eq!(result.final_decision.recommendation, Recommendation::Sell);
        assert_eq!(result.final_decision.position_size, 0.0);
    }

    #[tokio::test]
    async fn test_full_run_unsized_hold_reversal_keeps_current_position() {
        let llm = Arc::new(
            scripted()
                .reply("Risk-Manager", r#"{"risk_level": "MEDIUM", "action": "HOLD"}"#)
                .reply("Fund-Manager", r#"{"final_recommendation": "HOLD", "confidence": 0.5}"#),
        );
        let orch = orchestrator(llm, config());
        let options = RunOptions::from_config(orch.config())
            .with_mode(WorkflowMode::Full)
            .with_position(0.03);

        let result = orch.run_with("AMD", &market(), options).await.unwrap();
        assert_eq!(result.risk_debate.unwrap().assessment.position_size, 0.03);
        assert_eq!(result.final_decision.recommendation, Recommendation::Hold);
        assert_eq!(result.final_decision.position_size, 0.03);
    }

    // ============= Default Level Tests =============

    #[tokio::test]
    async fn test_buy_without_levels_gets_configured_defaults() {
        let llm = Arc::new(scripted());
        let orch = orchestrator(llm, config());
        let market = market();

        let result = orch.run("AMD", &market).await.unwrap();
        let price = market.price.current;
        let stop = result.trading_decision.stop_loss.unwrap();
        let take = result.trading_decision.take_profit.unwrap();
        assert!((stop - price * 0.95).abs() < 1e-9);
        assert!((take - price * 1.15).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_trader_levels_are_kept() {
        let llm = Arc::new(scripted().reply(
            "Trader",
            r#"{"recommendation": "BUY", "confidence": 0.7, "stop_loss": 12.5, "take_profit": 99}"#,
        ));
        let orch = orchestrator(llm, config());

        let result = orch.run("AMD", &market()).await.unwrap();
        assert_eq!(result.trading_decision.stop_loss, Some(12.5));
        assert_eq!(result.trading_decision.take_profit, Some(99.0));
    }

    // ============= Error Propagation Tests =============

    #[tokio::test]
    async fn test_llm_error_tagged_with_stage() {
        let cases = [
            ("Sentiment-Analyst", WorkflowStage::Analysis),
            ("Debate-Judge", WorkflowStage::ResearchDebate),
            ("Trader", WorkflowStage::Trading),
            ("Neutral-Risk-Analyst", WorkflowStage::RiskDebate),
            ("Fund-Manager", WorkflowStage::FundManager),
        ];

        for (agent, stage) in cases {
            let llm = Arc::new(scripted().fail(agent, "connection reset"));
            let mut config = config();
            config.workflow.mode = WorkflowMode::Full;
            let orch = orchestrator(llm, config);

            let err = orch.run("AMD", &market()).await.unwrap_err();
            assert_eq!(err.stage(), Some(stage));
            assert_failed_at(err, stage, agent);
        }
    }
}
