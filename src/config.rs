use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::constants;
use crate::error::ConfigError;
use crate::types::{AnalystKind, Recommendation, WorkflowMode};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    #[default]
    DeepSeek,
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "deepseek" => Ok(Provider::DeepSeek),
            other => Err(ConfigError::Invalid {
                field: "provider",
                reason: format!("unknown provider {:?} (expected openai | deepseek)", other),
            }),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::DeepSeek => write!(f, "deepseek"),
        }
    }
}

/// One provider section. Unset fields fall back to that provider's defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: None,
            max_tokens: None,
            temperature: 0.0,
            timeout_secs: constants::llm::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Fully resolved settings for the active provider
#[derive(Clone, Debug, PartialEq)]
pub struct LlmSettings {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    pub max_rounds: usize,
    /// Overrides `max_rounds` for the bull/bear debate
    pub research_team_max_rounds: Option<usize>,
    /// Overrides `max_rounds` for the risk team debate
    pub risk_team_max_rounds: Option<usize>,
    /// Informational; not enforced by the judge
    pub min_consensus_threshold: f64,
    /// Stop a debate as soon as one side concedes
    pub early_stop: bool,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: constants::debate::DEFAULT_MAX_ROUNDS,
            research_team_max_rounds: None,
            risk_team_max_rounds: None,
            min_consensus_threshold: constants::debate::DEFAULT_CONSENSUS_THRESHOLD,
            early_stop: false,
        }
    }
}

impl DebateConfig {
    pub fn research_rounds(&self) -> usize {
        self.research_team_max_rounds.unwrap_or(self.max_rounds)
    }

    pub fn risk_rounds(&self) -> usize {
        self.risk_team_max_rounds.unwrap_or(self.max_rounds)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub symbols: Vec<String>,
    pub initial_capital: f64,
    pub max_position_size: f64,
    /// Distance of the default stop below entry when the trader names none
    pub stop_loss_pct: f64,
    /// Distance of the default take-profit above entry when the trader names none
    pub take_profit_pct: f64,
    /// Informational; not used by any stage
    pub risk_free_rate: f64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbols: constants::trading::DEFAULT_SYMBOLS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            initial_capital: constants::trading::DEFAULT_INITIAL_CAPITAL,
            max_position_size: constants::trading::DEFAULT_MAX_POSITION_SIZE,
            stop_loss_pct: constants::trading::DEFAULT_STOP_LOSS_PCT,
            take_profit_pct: constants::trading::DEFAULT_TAKE_PROFIT_PCT,
            risk_free_rate: constants::trading::DEFAULT_RISK_FREE_RATE,
        }
    }
}

impl TradingConfig {
    /// Clamp a target position into [0, max_position_size]
    pub fn cap_position(&self, size: f64) -> f64 {
        if !size.is_finite() {
            return 0.0;
        }
        size.clamp(0.0, self.max_position_size)
    }

    /// Stop loss and take profit around `price` for a new long position.
    /// SELL and HOLD carry no default levels.
    pub fn default_levels(
        &self,
        recommendation: Recommendation,
        price: f64,
    ) -> (Option<f64>, Option<f64>) {
        if recommendation != Recommendation::Buy || !(price.is_finite() && price > 0.0) {
            return (None, None);
        }
        (
            Some(price * (1.0 - self.stop_loss_pct)),
            Some(price * (1.0 + self.take_profit_pct)),
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub mode: WorkflowMode,
    pub analysts: Vec<AnalystKind>,
    pub parallel_analysts: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            mode: WorkflowMode::default(),
            analysts: AnalystKind::ALL.to_vec(),
            parallel_analysts: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmRuntimeConfig {
    pub max_concurrent: usize,
    pub queue_size: usize,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for LlmRuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent: constants::llm::DEFAULT_MAX_CONCURRENT,
            queue_size: constants::llm::DEFAULT_QUEUE_SIZE,
            max_retries: 0,
            retry_base_delay_ms: constants::llm::RETRY_BASE_DELAY_MS,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: Provider,
    pub openai: ProviderConfig,
    pub deepseek: ProviderConfig,
    pub debate: DebateConfig,
    pub trading: TradingConfig,
    pub workflow: WorkflowConfig,
    pub llm: LlmRuntimeConfig,
}

impl AppConfig {
    /// Load from `path` (JSON, or YAML by extension) when it exists, otherwise
    /// start from defaults. Environment variables are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => {
                info!("Loading configuration from {}", p.display());
                Self::from_file(p)?
            }
            Some(p) => {
                warn!("⚠️ Config file {} not found, using defaults", p.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        if is_yaml {
            Self::from_yaml_str(content)
        } else {
            Self::from_json_str(content)
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply environment overrides through `lookup` (empty values are ignored)
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LLM_PROVIDER") {
            self.provider = v.parse()?;
        }

        if let Some(v) = get("DEEPSEEK_API_KEY") {
            self.deepseek.api_key = Some(v);
        }
        if let Some(v) = get("DEEPSEEK_BASE_URL") {
            self.deepseek.base_url = Some(v);
        }
        if let Some(v) = get("DEEPSEEK_MODEL") {
            self.deepseek.model = Some(v);
        }

        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.openai.base_url = Some(v);
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.openai.model = Some(v);
        }

        if let Some(v) = get("TRADING_SYMBOLS") {
            self.trading.symbols = v
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = get("INITIAL_CAPITAL") {
            self.trading.initial_capital =
                v.trim().parse().map_err(|_| ConfigError::Invalid {
                    field: "INITIAL_CAPITAL",
                    reason: format!("not a number: {:?}", v),
                })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_pos = self.trading.max_position_size;
        if !(max_pos > 0.0 && max_pos <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "trading.max_position_size",
                reason: format!("{} is outside (0, 1]", max_pos),
            });
        }

        for (field, pct) in [
            ("trading.stop_loss_pct", self.trading.stop_loss_pct),
            ("trading.take_profit_pct", self.trading.take_profit_pct),
        ] {
            if !(pct > 0.0 && pct < 1.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} is outside (0, 1)", pct),
                });
            }
        }

        if self.trading.initial_capital <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "trading.initial_capital",
                reason: "must be positive".to_string(),
            });
        }

        let threshold = self.debate.min_consensus_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                field: "debate.min_consensus_threshold",
                reason: format!("{} is outside [0, 1]", threshold),
            });
        }

        if self.workflow.analysts.is_empty() {
            return Err(ConfigError::Invalid {
                field: "workflow.analysts",
                reason: "at least one analyst is required".to_string(),
            });
        }

        if self.llm.max_concurrent == 0 || self.llm.queue_size == 0 {
            return Err(ConfigError::Invalid {
                field: "llm.max_concurrent",
                reason: "max_concurrent and queue_size must be at least 1".to_string(),
            });
        }

        let settings = self.llm_settings();
        if !(0.0..=2.0).contains(&settings.temperature) {
            return Err(ConfigError::Invalid {
                field: "temperature",
                reason: format!("{} is outside [0, 2]", settings.temperature),
            });
        }

        if settings.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }

        match url::Url::parse(&settings.base_url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            Ok(u) => {
                return Err(ConfigError::Invalid {
                    field: "base_url",
                    reason: format!("unsupported scheme {:?}", u.scheme()),
                })
            }
            Err(e) => {
                return Err(ConfigError::Invalid {
                    field: "base_url",
                    reason: e.to_string(),
                })
            }
        }

        Ok(())
    }

    /// Resolve the active provider's section against its defaults
    pub fn llm_settings(&self) -> LlmSettings {
        let (section, base_url, model, max_tokens) = match self.provider {
            Provider::OpenAi => (
                &self.openai,
                constants::llm::OPENAI_BASE_URL,
                constants::llm::OPENAI_MODEL,
                constants::llm::OPENAI_MAX_TOKENS,
            ),
            Provider::DeepSeek => (
                &self.deepseek,
                constants::llm::DEEPSEEK_BASE_URL,
                constants::llm::DEEPSEEK_MODEL,
                constants::llm::DEEPSEEK_MAX_TOKENS,
            ),
        };

        LlmSettings {
            provider: self.provider,
            api_key: section.api_key.clone().unwrap_or_default(),
            base_url: section
                .base_url
                .clone()
                .unwrap_or_else(|| base_url.to_string()),
            model: section.model.clone().unwrap_or_else(|| model.to_string()),
            max_tokens: section.max_tokens.unwrap_or(max_tokens),
            temperature: section.temperature,
            timeout: Duration::from_secs(section.timeout_secs),
        }
    }

    /// Copy safe to print or serve: API keys replaced by `***`
    pub fn masked(&self) -> AppConfig {
        let mut copy = self.clone();
        for section in [&mut copy.openai, &mut copy.deepseek] {
            if section.api_key.is_some() {
                section.api_key = Some("***".to_string());
            }
        }
        copy
    }
}
