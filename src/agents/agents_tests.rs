//! Unit tests for agent prompts and reply handling.

#[cfg(test)]
mod agents_tests {
    use crate::agents::analysts::{self, build_report};
    use crate::agents::judge::default_judgment;
    use crate::agents::trader::{as_fraction, TradeContext};
    use crate::agents::*;
    use crate::data::MockMarketData;
    use crate::llm::{Priority, ScriptedModel};
    use crate::types::*;
    use chrono::Utc;

    fn report(recommendation: Recommendation, confidence: f64) -> AnalysisReport {
        AnalysisReport {
            role: AgentRole::TechnicalAnalyst,
            symbol: "INTC".to_string(),
            content: "content".to_string(),
            recommendation,
            confidence,
            key_findings: vec![],
            risk_factors: vec![],
            created_at: Utc::now(),
        }
    }

    fn verdict(decision: Recommendation) -> DebateVerdict {
        DebateVerdict {
            decision,
            confidence: 0.6,
            reasoning: "committee view".to_string(),
            winner: DebateWinner::Draw,
            supporting_factors: vec![],
            risk_factors: vec![],
        }
    }

    fn proposal() -> TradingDecision {
        TradingDecision {
            symbol: "INTC".to_string(),
            recommendation: Recommendation::Buy,
            confidence: 0.66,
            target_price: None,
            acceptable_price_min: None,
            acceptable_price_max: None,
            stop_loss: None,
            take_profit: None,
            position_size: 0.07,
            time_horizon: "short".to_string(),
            reasoning: "breakout".to_string(),
            risk_factors: vec![],
        }
    }

    fn limits() -> PositionLimits {
        PositionLimits {
            current: 0.02,
            max: 0.1,
        }
    }

    fn assessment() -> RiskAssessment {
        RiskAssessment {
            risk_level: RiskLevel::Medium,
            recommendation: Recommendation::Hold,
            position_size: 0.03,
            stop_loss: None,
            take_profit: None,
            rationale: "size down".to_string(),
            key_risks: vec![],
        }
    }

    // ============= Analyst Tests =============

    #[test]
    fn test_build_report_from_json() {
        let reply = r#"{"content": "Margins expanding", "recommendation": "BUY", "confidence": 0.82,
                        "key_findings": ["margin"], "risk_factors": ["capex"]}"#;
        let report = build_report(AgentRole::FundamentalAnalyst, "INTC", reply);
        assert_eq!(report.recommendation, Recommendation::Buy);
        assert_eq!(report.confidence, 0.82);
        assert_eq!(report.content, "Margins expanding");
        assert_eq!(report.risk_factors, vec!["capex".to_string()]);
    }

    #[test]
    fn test_build_report_falls_back_on_free_text() {
        let reply = "Momentum is fading. Recommendation: SELL, confidence 65%";
        let report = build_report(AgentRole::TechnicalAnalyst, "INTC", reply);
        assert_eq!(report.recommendation, Recommendation::Sell);
        assert!((report.confidence - 0.65).abs() < 1e-9);
        assert_eq!(report.content, reply);
        assert!(report.key_findings.is_empty());
    }

    #[test]
    fn test_build_report_json_without_recommendation_holds() {
        let report = build_report(AgentRole::NewsAnalyst, "INTC", r#"{"content": "quiet week"}"#);
        assert_eq!(report.recommendation, Recommendation::Hold);
        assert_eq!(report.confidence, 0.5);
    }

    #[tokio::test]
    async fn test_analyze_sends_normal_priority_with_market_data() {
        let market = MockMarketData::generate("INTC", 60, 7);
        let llm = ScriptedModel::new(r#"{"recommendation": "HOLD", "confidence": 0.5}"#);

        for kind in AnalystKind::ALL {
            let report = analysts::analyze(kind, &llm, "INTC", &market).await.unwrap();
            assert_eq!(report.role, kind.role());
            assert_eq!(report.symbol, "INTC");
        }

        let requests = llm.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests.iter().all(|r| r.priority == Priority::Normal));
        assert!(requests.iter().all(|r| r.user_prompt.contains("INTC")));

        let technical = requests
            .iter()
            .find(|r| r.agent == "Technical-Analyst")
            .unwrap();
        assert!(technical.user_prompt.contains("RSI"));
    }

    // ============= Judge Tests =============

    #[test]
    fn test_judge_parse_verdict_derives_winner() {
        let judge = DebateJudge;
        let verdict = judge
            .parse_verdict(r#"{"decision": "sell", "confidence": "70%", "reasoning": "debt"}"#)
            .unwrap();
        assert_eq!(verdict.decision, Recommendation::Sell);
        assert_eq!(verdict.winner, DebateWinner::Bear);
        assert!((verdict.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_judge_parse_verdict_rejects_unusable_reply() {
        let judge = DebateJudge;
        assert!(judge.parse_verdict("Bull wins").is_none());
        assert!(judge.parse_verdict(r#"{"decision": "maybe"}"#).is_none());
    }

    #[test]
    fn test_default_judgment_vote() {
        let verdict = default_judgment(&[
            report(Recommendation::Buy, 0.9),
            report(Recommendation::Buy, 0.9),
            report(Recommendation::Sell, 0.9),
        ]);
        assert_eq!(verdict.decision, Recommendation::Buy);
        assert_eq!(verdict.winner, DebateWinner::Bull);
        // Average 0.9 capped
        assert_eq!(verdict.confidence, 0.8);
    }

    #[test]
    fn test_default_judgment_tie_and_empty() {
        let tie = default_judgment(&[report(Recommendation::Buy, 0.5), report(Recommendation::Sell, 0.5)]);
        assert_eq!(tie.decision, Recommendation::Hold);
        assert_eq!(tie.winner, DebateWinner::Draw);

        let empty = default_judgment(&[]);
        assert_eq!(empty.decision, Recommendation::Hold);
        assert_eq!(empty.confidence, 0.5);
    }

    // ============= Trader Tests =============

    #[test]
    fn test_trader_parse_decision_json() {
        let market = MockMarketData::generate("INTC", 30, 1);
        let verdict = verdict(Recommendation::Hold);
        let ctx = TradeContext {
            symbol: "INTC",
            market: &market,
            reports: &[],
            verdict: &verdict,
            current_position: 0.02,
            max_position_size: 0.1,
        };
        let reply = r#"{"recommendation": "BUY", "confidence": 0.75, "target_price": "$42.10",
                        "stop_loss": 38, "position_size": "8%", "time_horizon": "short"}"#;
        let decision = Trader.parse_decision(&ctx, reply);

        assert_eq!(decision.recommendation, Recommendation::Buy);
        assert_eq!(decision.target_price, Some(42.1));
        assert_eq!(decision.stop_loss, Some(38.0));
        assert!((decision.position_size - 0.08).abs() < 1e-9);
        assert_eq!(decision.time_horizon, "short");
    }

    #[test]
    fn test_trader_fallback_uses_verdict_and_default_position() {
        let market = MockMarketData::generate("INTC", 30, 1);
        let verdict = verdict(Recommendation::Buy);
        let ctx = TradeContext {
            symbol: "INTC",
            market: &market,
            reports: &[],
            verdict: &verdict,
            current_position: 0.02,
            max_position_size: 0.1,
        };

        let decision = Trader.parse_decision(&ctx, "Let us wait and see.");
        // "wait" alone is not a keyword the scanner picks up
        assert_eq!(decision.recommendation, Recommendation::Buy);
        assert_eq!(decision.position_size, 0.1);
        assert_eq!(decision.confidence, 0.3);

        let decision = Trader.parse_decision(&ctx, "I would hold here");
        assert_eq!(decision.recommendation, Recommendation::Hold);
        assert_eq!(decision.position_size, 0.02);
    }

    #[test]
    fn test_trader_prompt_mentions_limits() {
        let market = MockMarketData::generate("INTC", 30, 1);
        let verdict = verdict(Recommendation::Hold);
        let ctx = TradeContext {
            symbol: "INTC",
            market: &market,
            reports: &[],
            verdict: &verdict,
            current_position: 0.0,
            max_position_size: 0.1,
        };
        let prompt = Trader.build_prompt(&ctx);
        assert!(prompt.contains("Symbol: INTC"));
        assert!(prompt.contains("Maximum allowed position: 10.0%"));
        assert!(prompt.contains("no position held"));
    }

    #[test]
    fn test_as_fraction() {
        assert_eq!(as_fraction(0.25), 0.25);
        assert_eq!(as_fraction(25.0), 0.25);
        assert_eq!(as_fraction(1.0), 1.0);
        assert_eq!(as_fraction(250.0), 250.0);
    }

    // ============= Risk Manager Tests =============

    #[test]
    fn test_risk_manager_percent_position() {
        let assessment = RiskManager.parse_assessment(
            r#"{"risk_level": "low", "action": "buy", "position_size": 5, "stop_loss": 36.5}"#,
            &proposal(),
            limits(),
        );
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert_eq!(assessment.recommendation, Recommendation::Buy);
        assert_eq!(assessment.position_size, 0.05);
        assert_eq!(assessment.stop_loss, Some(36.5));
    }

    #[test]
    fn test_risk_manager_unsized_reversal_is_resized() {
        let json = RiskManager.parse_assessment(
            r#"{"risk_level": "HIGH", "action": "SELL"}"#,
            &proposal(),
            limits(),
        );
        assert_eq!(json.recommendation, Recommendation::Sell);
        assert_eq!(json.position_size, 0.0);

        let text = RiskManager.parse_assessment("Too risky, we should hold.", &proposal(), limits());
        assert_eq!(text.recommendation, Recommendation::Hold);
        assert_eq!(text.position_size, 0.02);

        let agree = RiskManager.parse_assessment(r#"{"action": "BUY"}"#, &proposal(), limits());
        assert_eq!(agree.position_size, 0.07);
    }

    #[test]
    fn test_position_limits_default_and_carry_over() {
        let limits = limits();
        assert_eq!(limits.default_for(Recommendation::Buy), 0.1);
        assert_eq!(limits.default_for(Recommendation::Hold), 0.02);
        assert_eq!(limits.default_for(Recommendation::Sell), 0.0);
        assert_eq!(
            limits.carry_over(Recommendation::Buy, Recommendation::Buy, 0.05),
            0.05
        );
        assert_eq!(
            limits.carry_over(Recommendation::Sell, Recommendation::Buy, 0.05),
            0.0
        );
    }

    // ============= Fund Manager Tests =============

    #[test]
    fn test_fund_manager_parse_json() {
        let decision = FundManager.parse_decision(
            r#"{"final_recommendation": "SELL", "confidence": 0.55, "position_size": 0.0,
                "decision_summary": "exit"}"#,
            &proposal(),
            &assessment(),
            limits(),
        );
        assert_eq!(decision.recommendation, Recommendation::Sell);
        assert_eq!(decision.confidence, 0.55);
        assert_eq!(decision.position_size, 0.0);
        assert_eq!(decision.rationale, "exit");
    }

    #[test]
    fn test_fund_manager_partial_json_inherits_upstream() {
        let decision = FundManager.parse_decision(
            r#"{"rationale": "agree"}"#,
            &proposal(),
            &assessment(),
            limits(),
        );
        assert_eq!(decision.recommendation, Recommendation::Hold);
        assert_eq!(decision.confidence, 0.66);
        assert_eq!(decision.position_size, 0.03);
    }

    #[test]
    fn test_fund_manager_free_text_fallback() {
        let decision = FundManager.parse_decision(
            "Final recommendation: BUY. Confidence 80%.",
            &proposal(),
            &assessment(),
            limits(),
        );
        assert_eq!(decision.recommendation, Recommendation::Buy);
        assert!((decision.confidence - 0.8).abs() < 1e-9);
        // Overrules the risk HOLD without a size: BUY targets the ceiling
        assert_eq!(decision.position_size, 0.1);
    }

    #[test]
    fn test_fund_manager_unsized_reversal_is_resized() {
        let sell = FundManager.parse_decision(
            r#"{"final_recommendation": "SELL", "confidence": 0.6}"#,
            &proposal(),
            &assessment(),
            limits(),
        );
        assert_eq!(sell.recommendation, Recommendation::Sell);
        assert_eq!(sell.position_size, 0.0);

        let mut buy_risk = assessment();
        buy_risk.recommendation = Recommendation::Buy;
        let hold = FundManager.parse_decision("We hold for now.", &proposal(), &buy_risk, limits());
        assert_eq!(hold.recommendation, Recommendation::Hold);
        assert_eq!(hold.position_size, 0.02);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("héllo wörld", 5), "héllo...");
        assert_eq!(preview("short", 10), "short");
    }
}
