//! Reply parsing for agent outputs
//!
//! Agents are asked for a JSON object. When the reply is not one, the
//! scanners below recover a recommendation and a confidence from free text.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::LazyLock;

use crate::constants;
use crate::types::{clamp_confidence, Recommendation};

/// Slice from the first `{` to the last `}`
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Parse the JSON object embedded in a reply
pub fn parse_reply<T: DeserializeOwned>(text: &str) -> Option<T> {
    let json = extract_json(text)?;
    serde_json::from_str(json).ok()
}

/// Number from a JSON value, accepting strings like "85%" or "$190.5"
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            let percent = trimmed.ends_with('%');
            let digits = trimmed.trim_end_matches('%').trim_start_matches('$').replace(',', "");
            let v: f64 = digits.trim().parse().ok()?;
            Some(if percent { v / 100.0 } else { v })
        }
        _ => None,
    }
}

pub fn as_confidence(value: Option<&Value>) -> Option<f64> {
    value.and_then(as_f64).map(clamp_confidence)
}

pub fn as_recommendation(value: Option<&str>) -> Option<Recommendation> {
    let text = value?;
    text.parse().ok().or_else(|| scan_recommendation(text))
}

static RECOMMENDATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(strong\s+buy|strong\s+sell|buy|sell|hold)\b")
        .expect("RECOMMENDATION_RE regex should compile")
});

static CONFIDENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)confidence[^0-9]{0,20}([0-9]+(?:\.[0-9]+)?)\s*(%)?")
        .expect("CONFIDENCE_RE regex should compile")
});

/// Find BUY / SELL / HOLD in free text, preferring what follows "recommendation"
pub fn scan_recommendation(text: &str) -> Option<Recommendation> {
    let lower = text.to_lowercase();
    let focus = ["final recommendation", "recommendation", "decision"]
        .iter()
        .find_map(|marker| lower.rfind(marker).map(|i| &lower[i..]));

    let first_match = |haystack: &str| {
        RECOMMENDATION_RE
            .find_iter(haystack)
            .find_map(|m| m.as_str().parse::<Recommendation>().ok())
    };

    focus.and_then(|f| first_match(f)).or_else(|| first_match(text))
}

/// Confidence figure following the word "confidence"
pub fn scan_confidence(text: &str) -> Option<f64> {
    let caps = CONFIDENCE_RE.captures(text)?;
    let raw: f64 = caps.get(1)?.as_str().parse().ok()?;
    let value = if caps.get(2).is_some() { raw / 100.0 } else { raw };
    Some(clamp_confidence(value))
}

/// Heuristic decision for a reply that carries no usable JSON
pub fn scan_decision(text: &str) -> (Recommendation, f64) {
    match scan_recommendation(text) {
        Some(rec) => (
            rec,
            scan_confidence(text).unwrap_or(constants::decision::HEURISTIC_CONFIDENCE),
        ),
        None => (Recommendation::Hold, constants::decision::HEURISTIC_CONFIDENCE),
    }
}

/// List of strings, tolerating a bare string or non-string items
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        other => vec![other.to_string()],
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalystReply {
    #[serde(default, alias = "analysis", alias = "summary")]
    pub content: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default, alias = "confidence_score")]
    pub confidence: Option<Value>,
    #[serde(default, deserialize_with = "string_list")]
    pub key_findings: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JudgeReply {
    #[serde(default, alias = "recommendation")]
    pub decision: Option<String>,
    #[serde(default, alias = "confidence_score")]
    pub confidence: Option<Value>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub supporting_factors: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TraderReply {
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default, alias = "confidence_score")]
    pub confidence: Option<Value>,
    #[serde(default)]
    pub target_price: Option<Value>,
    #[serde(default, alias = "acceptable_min")]
    pub acceptable_price_min: Option<Value>,
    #[serde(default, alias = "acceptable_max")]
    pub acceptable_price_max: Option<Value>,
    #[serde(default)]
    pub stop_loss: Option<Value>,
    #[serde(default)]
    pub take_profit: Option<Value>,
    #[serde(default)]
    pub position_size: Option<Value>,
    #[serde(default)]
    pub time_horizon: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RiskReply {
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default, alias = "recommended_action", alias = "recommendation")]
    pub action: Option<String>,
    #[serde(default, alias = "position_adjustment")]
    pub position_size: Option<Value>,
    #[serde(default)]
    pub stop_loss: Option<Value>,
    #[serde(default)]
    pub take_profit: Option<Value>,
    #[serde(default, alias = "decision_rationale", alias = "reasoning")]
    pub rationale: Option<String>,
    #[serde(default, alias = "key_risk_factors", deserialize_with = "string_list")]
    pub key_risks: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FundManagerReply {
    #[serde(default, alias = "recommendation", alias = "decision")]
    pub final_recommendation: Option<String>,
    #[serde(default, alias = "confidence_score")]
    pub confidence: Option<Value>,
    #[serde(default)]
    pub position_size: Option<Value>,
    #[serde(default, alias = "rationale", alias = "reasoning")]
    pub decision_summary: Option<String>,
}
