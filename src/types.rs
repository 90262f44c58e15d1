use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants;

/// Trade recommendation. Every decision in the pipeline resolves to one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl Recommendation {
    pub const ALL: [Recommendation; 3] =
        [Recommendation::Buy, Recommendation::Sell, Recommendation::Hold];

    /// Sort key for ranking: BUY before HOLD before SELL
    pub fn rank(&self) -> u8 {
        match self {
            Recommendation::Buy => 0,
            Recommendation::Hold => 1,
            Recommendation::Sell => 2,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Recommendation::Buy => "BUY",
            Recommendation::Sell => "SELL",
            Recommendation::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRecommendation(pub String);

impl fmt::Display for UnknownRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown recommendation {:?}", self.0)
    }
}

impl std::error::Error for UnknownRecommendation {}

impl FromStr for Recommendation {
    type Err = UnknownRecommendation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .to_lowercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        match normalized.as_str() {
            "buy" | "strong buy" | "long" | "accumulate" | "overweight" => Ok(Recommendation::Buy),
            "sell" | "strong sell" | "short" | "reduce" | "underweight" => Ok(Recommendation::Sell),
            "hold" | "neutral" | "wait" | "no trade" => Ok(Recommendation::Hold),
            _ => Err(UnknownRecommendation(s.to_string())),
        }
    }
}

/// Clamp a model-reported confidence into [0, 1].
/// Values in (1, 100] are read as percentages; NaN becomes the default.
pub fn clamp_confidence(value: f64) -> f64 {
    if !value.is_finite() {
        return constants::decision::DEFAULT_CONFIDENCE;
    }
    let v = if value > 1.0 && value <= 100.0 {
        value / 100.0
    } else {
        value
    };
    v.clamp(0.0, 1.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    FundamentalAnalyst,
    TechnicalAnalyst,
    SentimentAnalyst,
    NewsAnalyst,
    BullResearcher,
    BearResearcher,
    DebateJudge,
    Trader,
    ConservativeAnalyst,
    AggressiveAnalyst,
    NeutralAnalyst,
    RiskManager,
    FundManager,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentRole::FundamentalAnalyst => "fundamental_analyst",
            AgentRole::TechnicalAnalyst => "technical_analyst",
            AgentRole::SentimentAnalyst => "sentiment_analyst",
            AgentRole::NewsAnalyst => "news_analyst",
            AgentRole::BullResearcher => "bull_researcher",
            AgentRole::BearResearcher => "bear_researcher",
            AgentRole::DebateJudge => "debate_judge",
            AgentRole::Trader => "trader",
            AgentRole::ConservativeAnalyst => "conservative_analyst",
            AgentRole::AggressiveAnalyst => "aggressive_analyst",
            AgentRole::NeutralAnalyst => "neutral_analyst",
            AgentRole::RiskManager => "risk_manager",
            AgentRole::FundManager => "fund_manager",
        };
        f.write_str(s)
    }
}

/// The analyst team members
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalystKind {
    Fundamental,
    Technical,
    Sentiment,
    News,
}

impl AnalystKind {
    pub const ALL: [AnalystKind; 4] = [
        AnalystKind::Fundamental,
        AnalystKind::Technical,
        AnalystKind::Sentiment,
        AnalystKind::News,
    ];

    pub fn role(&self) -> AgentRole {
        match self {
            AnalystKind::Fundamental => AgentRole::FundamentalAnalyst,
            AnalystKind::Technical => AgentRole::TechnicalAnalyst,
            AnalystKind::Sentiment => AgentRole::SentimentAnalyst,
            AnalystKind::News => AgentRole::NewsAnalyst,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalystKind::Fundamental => "fundamental",
            AnalystKind::Technical => "technical",
            AnalystKind::Sentiment => "sentiment",
            AnalystKind::News => "news",
        }
    }
}

impl FromStr for AnalystKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fundamental" => Ok(AnalystKind::Fundamental),
            "technical" => Ok(AnalystKind::Technical),
            "sentiment" => Ok(AnalystKind::Sentiment),
            "news" => Ok(AnalystKind::News),
            other => Err(format!(
                "unknown analyst {:?} (expected fundamental | technical | sentiment | news)",
                other
            )),
        }
    }
}

impl fmt::Display for AnalystKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pipeline the orchestrator runs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowMode {
    /// analysts -> research debate -> trader
    #[default]
    Quick,
    /// quick + risk debate + fund manager
    Full,
}

impl FromStr for WorkflowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quick" => Ok(WorkflowMode::Quick),
            "full" => Ok(WorkflowMode::Full),
            other => Err(format!("unknown mode {:?} (expected quick | full)", other)),
        }
    }
}

impl fmt::Display for WorkflowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowMode::Quick => f.write_str("quick"),
            WorkflowMode::Full => f.write_str("full"),
        }
    }
}

/// One analyst's report. Produced once per analyst per run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub role: AgentRole,
    pub symbol: String,
    pub content: String,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub key_findings: Vec<String>,
    pub risk_factors: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl AnalysisReport {
    /// Short line used when quoting the report to downstream agents
    pub fn summary_line(&self) -> String {
        let findings = if self.key_findings.is_empty() {
            String::new()
        } else {
            format!(" | findings: {}", self.key_findings.iter().take(3).cloned().collect::<Vec<_>>().join("; "))
        };
        format!(
            "[{}] {} (confidence {:.2}){}",
            self.role, self.recommendation, self.confidence, findings
        )
    }
}

/// Debate participant tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Bull,
    Bear,
    Conservative,
    Aggressive,
    Neutral,
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stance::Bull => "bull",
            Stance::Bear => "bear",
            Stance::Conservative => "conservative",
            Stance::Aggressive => "aggressive",
            Stance::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DebateTurn {
    /// 1-based
    pub round: usize,
    pub speaker: Stance,
    pub argument: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only, ordered list of debate turns
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<DebateTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: DebateTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[DebateTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent turn by `speaker`
    pub fn last_by(&self, speaker: Stance) -> Option<&DebateTurn> {
        self.turns.iter().rev().find(|t| t.speaker == speaker)
    }

    /// Every turn not spoken by `speaker`, oldest first
    pub fn opponents_of(&self, speaker: Stance) -> impl Iterator<Item = &DebateTurn> {
        self.turns.iter().filter(move |t| t.speaker != speaker)
    }

    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("Round {} - {}: {}", t.round, t.speaker, t.argument))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebateWinner {
    Bull,
    Bear,
    Draw,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DebateVerdict {
    pub decision: Recommendation,
    pub confidence: f64,
    pub reasoning: String,
    pub winner: DebateWinner,
    pub supporting_factors: Vec<String>,
    pub risk_factors: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TradingDecision {
    pub symbol: String,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub target_price: Option<f64>,
    pub acceptable_price_min: Option<f64>,
    pub acceptable_price_max: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    /// Target position as a fraction of the portfolio
    pub position_size: f64,
    pub time_horizon: String,
    pub reasoning: String,
    pub risk_factors: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" | "moderate" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level {:?}", other)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub recommendation: Recommendation,
    pub position_size: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub rationale: String,
    pub key_risks: Vec<String>,
}

/// Terminal output of a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Decision {
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub rationale: String,
    pub position_size: f64,
}
