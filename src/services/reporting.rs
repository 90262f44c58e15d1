use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    constants,
    error::WorkflowError,
    types::{Recommendation, RiskLevel},
    workflow::WorkflowResult,
};

/// One symbol's outcome inside a batch
#[derive(Clone, Debug)]
pub struct BatchEntry {
    pub symbol: String,
    pub outcome: Result<WorkflowResult, String>,
}

impl BatchEntry {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn recommendation(&self) -> Option<Recommendation> {
        self.outcome
            .as_ref()
            .ok()
            .map(|r| r.final_decision.recommendation)
    }

    pub fn confidence(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(|r| r.final_decision.confidence)
    }
}

/// Flat export row, one per symbol
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchRow {
    pub rank: Option<usize>,
    pub symbol: String,

    /// "ok" | "error"
    pub status: String,

    pub recommendation: Option<Recommendation>,
    pub confidence: Option<f64>,
    pub position_size: Option<f64>,

    /// Only present for full-mode runs
    pub risk_level: Option<RiskLevel>,

    pub session_id: Option<String>,
    pub duration_ms: Option<i64>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,

    pub buys: u64,
    pub holds: u64,
    pub sells: u64,

    /// Mean final confidence over successful runs
    pub average_confidence: f64,

    /// Symbol -> error message for failed runs
    pub failures: HashMap<String, String>,
}

#[derive(Serialize)]
struct BatchExport<'a> {
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    summary: BatchSummary,
    rows: Vec<BatchRow>,
    results: Vec<&'a WorkflowResult>,
}

/// Ranked outcome of a batch: successes BUY -> HOLD -> SELL by confidence,
/// then failures in submission order.
#[derive(Clone, Debug)]
pub struct BatchReport {
    entries: Vec<BatchEntry>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn new(
        mut entries: Vec<BatchEntry>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        rank_entries(&mut entries);
        Self {
            entries,
            started_at,
            finished_at,
        }
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn successes(&self) -> impl Iterator<Item = &WorkflowResult> {
        self.entries.iter().filter_map(|e| e.outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            Err(msg) => Some((e.symbol.as_str(), msg.as_str())),
            Ok(_) => None,
        })
    }

    pub fn summary(&self) -> BatchSummary {
        let mut s = BatchSummary::default();
        let mut confidence_sum = 0.0;

        for entry in &self.entries {
            s.total += 1;
            match &entry.outcome {
                Ok(result) => {
                    s.succeeded += 1;
                    confidence_sum += result.final_decision.confidence;
                    match result.final_decision.recommendation {
                        Recommendation::Buy => s.buys += 1,
                        Recommendation::Hold => s.holds += 1,
                        Recommendation::Sell => s.sells += 1,
                    }
                }
                Err(msg) => {
                    s.failed += 1;
                    s.failures.insert(entry.symbol.clone(), msg.clone());
                }
            }
        }

        if s.succeeded > 0 {
            s.average_confidence = confidence_sum / s.succeeded as f64;
        }
        s
    }

    pub fn rows(&self) -> Vec<BatchRow> {
        let mut rank = 0;
        self.entries
            .iter()
            .map(|entry| match &entry.outcome {
                Ok(result) => {
                    rank += 1;
                    BatchRow {
                        rank: Some(rank),
                        symbol: entry.symbol.clone(),
                        status: "ok".to_string(),
                        recommendation: Some(result.final_decision.recommendation),
                        confidence: Some(result.final_decision.confidence),
                        position_size: Some(result.final_decision.position_size),
                        risk_level: result.risk_debate.as_ref().map(|r| r.assessment.risk_level),
                        session_id: Some(result.session_id.clone()),
                        duration_ms: Some(result.duration_ms()),
                        error: None,
                    }
                }
                Err(msg) => BatchRow {
                    rank: None,
                    symbol: entry.symbol.clone(),
                    status: "error".to_string(),
                    recommendation: None,
                    confidence: None,
                    position_size: None,
                    risk_level: None,
                    session_id: None,
                    duration_ms: None,
                    error: Some(msg.clone()),
                },
            })
            .collect()
    }

    /// Write the report as CSV when `path` ends in `.csv`, JSON otherwise
    pub fn export(&self, path: &Path) -> Result<PathBuf, WorkflowError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        if is_csv {
            self.write_csv(path)?;
        } else {
            self.write_json(path)?;
        }

        info!(
            event = constants::events::REPORT_EXPORTED,
            path = %path.display(),
            rows = self.entries.len(),
            "💾 [REPORT] Batch results written to {}",
            path.display()
        );
        Ok(path.to_path_buf())
    }

    fn write_json(&self, path: &Path) -> Result<(), WorkflowError> {
        let export = BatchExport {
            started_at: self.started_at,
            finished_at: self.finished_at,
            summary: self.summary(),
            rows: self.rows(),
            results: self.successes().collect(),
        };
        std::fs::write(path, serde_json::to_vec_pretty(&export)?)?;
        Ok(())
    }

    fn write_csv(&self, path: &Path) -> Result<(), WorkflowError> {
        let mut wtr = csv::Writer::from_path(path)?;
        for row in self.rows() {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Console summary table
    pub fn render_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                "#",
                "Symbol",
                "Decision",
                "Confidence",
                "Position",
                "Risk",
                "Notes",
            ]);

        for row in self.rows() {
            let dash = || "-".to_string();
            table.add_row(vec![
                row.rank.map(|r| r.to_string()).unwrap_or_else(dash),
                row.symbol.clone(),
                row.recommendation
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "FAILED".to_string()),
                row.confidence
                    .map(|c| format!("{:.0}%", c * 100.0))
                    .unwrap_or_else(dash),
                row.position_size
                    .map(|p| format!("{:.1}%", p * 100.0))
                    .unwrap_or_else(dash),
                row.risk_level
                    .map(|r| format!("{:?}", r).to_uppercase())
                    .unwrap_or_else(dash),
                row.error.unwrap_or_default(),
            ]);
        }

        let s = self.summary();
        format!(
            "{}\n{} analyzed: {} ok, {} failed | BUY {} / HOLD {} / SELL {} | avg confidence {:.0}%",
            table,
            s.total,
            s.succeeded,
            s.failed,
            s.buys,
            s.holds,
            s.sells,
            s.average_confidence * 100.0
        )
    }
}

/// Stable sort; failures keep their relative order at the end
pub fn rank_entries(entries: &mut [BatchEntry]) {
    entries.sort_by(|a, b| match (&a.outcome, &b.outcome) {
        (Ok(x), Ok(y)) => x
            .final_decision
            .recommendation
            .rank()
            .cmp(&y.final_decision.recommendation.rank())
            .then_with(|| {
                y.final_decision
                    .confidence
                    .total_cmp(&x.final_decision.confidence)
            }),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => std::cmp::Ordering::Equal,
    });
}
