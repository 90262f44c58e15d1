//! Unit tests for the reporting module - batch summaries, exports and the console table.

#[cfg(test)]
mod reporting_tests {
    use crate::config::AppConfig;
    use crate::llm::ScriptedModel;
    use crate::services::batch::BatchAnalyzer;
    use crate::services::reporting::*;
    use crate::workflow::WorkflowOrchestrator;
    use chrono::Utc;
    use std::sync::Arc;

    async fn sample_report() -> BatchReport {
        let llm = ScriptedModel::new(r#"{"recommendation": "HOLD", "confidence": 0.5}"#)
            .reply_when(
                "Trader",
                "Symbol: QQQ",
                r#"{"recommendation": "BUY", "confidence": 0.8, "position_size": 0.05}"#,
            )
            .reply_when(
                "Trader",
                "Symbol: IWM",
                r#"{"recommendation": "SELL", "confidence": 0.6}"#,
            )
            .fail_when("Symbol: XLE", "quota exceeded");
        let mut config = AppConfig::default();
        config.debate.max_rounds = 0;
        let orchestrator = Arc::new(WorkflowOrchestrator::new(Arc::new(llm), config));

        let symbols: Vec<String> = ["XLE", "IWM", "QQQ", "DIA"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        BatchAnalyzer::new(orchestrator).run(&symbols).await
    }

    fn failed(symbol: &str) -> BatchEntry {
        BatchEntry {
            symbol: symbol.to_string(),
            outcome: Err(format!("{symbol} failed")),
        }
    }

    // ============= BatchSummary Tests =============

    #[test]
    fn test_batch_summary_default() {
        let summary = BatchSummary::default();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.average_confidence, 0.0);
        assert!(summary.failures.is_empty());
    }

    #[tokio::test]
    async fn test_batch_summary_counts() {
        let report = sample_report().await;
        let summary = report.summary();

        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.buys, 1);
        assert_eq!(summary.holds, 1);
        assert_eq!(summary.sells, 1);
        assert!((summary.average_confidence - (0.8 + 0.5 + 0.6) / 3.0).abs() < 1e-9);
        assert!(summary.failures["XLE"].contains("quota exceeded"));
    }

    // ============= Row Tests =============

    #[tokio::test]
    async fn test_rows_rank_successes_only() {
        let report = sample_report().await;
        let rows = report.rows();

        let ranked: Vec<(Option<usize>, &str)> =
            rows.iter().map(|r| (r.rank, r.symbol.as_str())).collect();
        assert_eq!(
            ranked,
            vec![
                (Some(1), "QQQ"),
                (Some(2), "DIA"),
                (Some(3), "IWM"),
                (None, "XLE")
            ]
        );
        assert_eq!(rows[0].status, "ok");
        assert_eq!(rows[0].position_size, Some(0.05));
        assert!(rows[0].session_id.is_some());
        assert_eq!(rows[3].status, "error");
        assert!(rows[3].error.is_some());
        // Quick mode carries no risk level
        assert!(rows[0].risk_level.is_none());
    }

    #[test]
    fn test_rank_entries_failures_keep_order() {
        let mut entries = vec![failed("B"), failed("A"), failed("C")];
        rank_entries(&mut entries);
        let order: Vec<&str> = entries.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
    }

    // ============= Export Tests =============

    #[tokio::test]
    async fn test_export_csv() {
        let report = sample_report().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("batch.csv");

        report.export(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "rank,symbol,status,recommendation,confidence,position_size,risk_level,session_id,duration_ms,error"
        );
        assert!(lines.next().unwrap().starts_with("1,QQQ,ok,BUY,0.8,0.05,"));
        assert_eq!(content.lines().count(), 5);
        assert!(content.contains("XLE,error"));
    }

    #[tokio::test]
    async fn test_export_json() {
        let report = sample_report().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");

        report.export(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["total"], 4);
        assert_eq!(value["rows"].as_array().unwrap().len(), 4);
        assert_eq!(value["results"].as_array().unwrap().len(), 3);
        assert_eq!(value["rows"][0]["recommendation"], "BUY");
    }

    // ============= Console Table Tests =============

    #[tokio::test]
    async fn test_render_table() {
        let report = sample_report().await;
        let table = report.render_table();

        for symbol in ["QQQ", "DIA", "IWM", "XLE"] {
            assert!(table.contains(symbol));
        }
        assert!(table.contains("FAILED"));
        assert!(table.contains("80%"));
        assert!(table.contains("4 analyzed: 3 ok, 1 failed"));
    }

    #[test]
    fn test_empty_report() {
        let report = BatchReport::new(Vec::new(), Utc::now(), Utc::now());
        assert!(report.rows().is_empty());
        assert_eq!(report.summary().total, 0);
        assert!(report.render_table().contains("0 analyzed"));
    }
}
