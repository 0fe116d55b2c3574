//! AI decision types

use crate::strategy::TradingSignal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market condition classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketCondition {
    Bullish,
    Bearish,
    Neutral,
    Volatile,
}

/// Assessed risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Risk assessment attached to a decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    #[serde(default)]
    pub factors: Vec<String>,
}

/// Structured decision returned by the inference capability
///
/// Transient: produced once per cycle and consumed by the risk manager
/// alongside strategy signals. Confidence and market condition are
/// advisory inputs, not execution triggers by themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIDecision {
    #[serde(default)]
    pub signals: Vec<TradingSignal>,
    pub reasoning: String,
    pub market_condition: MarketCondition,
    /// Confidence in [0, 1]
    pub confidence: Decimal,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    pub risk_assessment: RiskAssessment,
}
