//! Configuration types for quantpulse

use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub ai: AiConfig,
    pub risk: RiskConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub api: ApiConfig,
    pub telemetry: TelemetryConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub mode: TradingMode,
    pub initial_capital: Decimal,
    pub symbols: Vec<String>,
    #[serde(default = "default_analysis_interval")]
    pub analysis_interval_secs: u64,
}

/// Trading mode: paper simulation or live orders
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Paper,
    Live,
}

/// Exchange connectivity
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    pub base_url: String,
    /// Required in live mode only
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Data collection cadence
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Market data poll interval (seconds)
    #[serde(default = "default_market_interval")]
    pub market_interval_secs: u64,
    /// Sentiment poll interval (seconds), slower cadence
    #[serde(default = "default_sentiment_interval")]
    pub sentiment_interval_secs: u64,
    /// Candle timeframe for OHLCV fetches
    #[serde(default = "default_timeframe")]
    pub ohlcv_timeframe: String,
    /// Number of candles kept in the analysis window
    #[serde(default = "default_candle_limit")]
    pub candle_limit: usize,
}

fn default_market_interval() -> u64 {
    10
}
fn default_sentiment_interval() -> u64 {
    300
}
fn default_timeframe() -> String {
    "1m".to_string()
}
fn default_candle_limit() -> usize {
    100
}
fn default_analysis_interval() -> u64 {
    60
}
fn default_request_timeout() -> u64 {
    10
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            market_interval_secs: 10,
            sentiment_interval_secs: 300,
            ohlcv_timeframe: "1m".to_string(),
            candle_limit: 100,
        }
    }
}

/// Sentiment source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SentimentConfig {
    /// Endpoint of the sentiment aggregation service
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Ignore symbols with fewer mentions than this
    #[serde(default = "default_min_mentions")]
    pub min_mentions: u64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            min_mentions: default_min_mentions(),
        }
    }
}

fn default_min_mentions() -> u64 {
    10
}

/// AI inference configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    pub api_key: Option<String>,
    /// Hard deadline on a single inference call
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_ai_endpoint() -> String {
    "http://localhost:11434/v1/chat/completions".to_string()
}
fn default_ai_model() -> String {
    "llama3".to_string()
}
fn default_ai_timeout() -> u64 {
    30
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_ai_endpoint(),
            model: default_ai_model(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Risk limit configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Maximum position size as fraction of portfolio value
    pub max_position_size: Decimal,
    /// Maximum concurrent open positions
    pub max_open_positions: usize,
    /// Daily loss circuit breaker as fraction of day-start equity
    pub max_daily_loss: Decimal,
    /// Default stop-loss distance from entry
    #[serde(default = "default_stop_loss")]
    pub stop_loss_pct: Decimal,
    /// Default take-profit distance from entry
    #[serde(default = "default_take_profit")]
    pub take_profit_pct: Decimal,
    /// Position-size fraction used when a signal carries none
    #[serde(default = "default_position_size")]
    pub default_position_size: Decimal,
}

fn default_stop_loss() -> Decimal {
    dec!(0.05)
}
fn default_take_profit() -> Decimal {
    dec!(0.10)
}
fn default_position_size() -> Decimal {
    dec!(0.05)
}

/// Execution engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Taker fee rate applied to fills
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
    /// Maximum tolerated price drift between signal and fill
    #[serde(default = "default_slippage")]
    pub slippage_tolerance: Decimal,
    /// Safety buffer applied on top of gas estimates
    #[serde(default = "default_gas_buffer")]
    pub gas_buffer: Decimal,
}

fn default_fee_rate() -> Decimal {
    dec!(0.001)
}
fn default_slippage() -> Decimal {
    dec!(0.005)
}
fn default_gas_buffer() -> Decimal {
    dec!(0.20)
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            fee_rate: dec!(0.001),
            slippage_tolerance: dec!(0.005),
            gas_buffer: dec!(0.20),
        }
    }
}

/// On-chain execution configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: Option<String>,
    pub wallet_address: Option<String>,
    /// Router contract receiving swap transactions
    pub router_address: Option<String>,
}

/// Status/WebSocket adapter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_bind(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    pub metrics_port: u16,
    pub log_level: String,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    ///
    /// Failures here are the one fatal error class: they abort startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.symbols.is_empty() {
            return Err(ConfigError::Invalid("symbols list is empty".to_string()));
        }
        if self.engine.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "initial_capital must be positive".to_string(),
            ));
        }
        if self.risk.max_position_size <= Decimal::ZERO
            || self.risk.max_position_size > Decimal::ONE
        {
            return Err(ConfigError::Invalid(
                "max_position_size must be in (0, 1]".to_string(),
            ));
        }
        if self.risk.max_daily_loss <= Decimal::ZERO || self.risk.max_daily_loss >= Decimal::ONE {
            return Err(ConfigError::Invalid(
                "max_daily_loss must be in (0, 1)".to_string(),
            ));
        }
        if self.risk.max_open_positions == 0 {
            return Err(ConfigError::Invalid(
                "max_open_positions must be at least 1".to_string(),
            ));
        }
        if self.engine.mode == TradingMode::Live
            && (self.exchange.api_key.is_none() || self.exchange.api_secret.is_none())
        {
            return Err(ConfigError::Invalid(
                "live mode requires exchange api_key and api_secret".to_string(),
            ));
        }
        Ok(())
    }
}
