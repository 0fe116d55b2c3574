//! Trading signal types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Recommended directional action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
    Close,
}

/// Venue class the signal targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Spot,
    Perpetual,
    Liquidity,
}

/// A candidate trading signal
///
/// Produced by a strategy or the AI engine, consumed exactly once by the
/// risk manager, then discarded or promoted to an execution request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSignal {
    pub symbol: String,
    pub action: SignalAction,
    /// Confidence in [0, 1]
    pub confidence: Decimal,
    #[serde(default)]
    pub reason: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub entry_price: Option<Decimal>,
    pub target_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    /// Requested size as fraction of portfolio value
    pub position_size: Option<Decimal>,
    pub leverage: Option<u8>,
    /// Originating strategy name
    #[serde(default)]
    pub strategy: String,
    #[serde(default = "default_trade_type")]
    pub trade_type: TradeType,
}

fn default_trade_type() -> TradeType {
    TradeType::Spot
}

impl TradingSignal {
    /// Create a spot signal with the common fields set
    pub fn new(
        symbol: impl Into<String>,
        action: SignalAction,
        confidence: Decimal,
        reason: impl Into<String>,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            action,
            confidence,
            reason: reason.into(),
            timestamp: Utc::now(),
            entry_price: None,
            target_price: None,
            stop_loss: None,
            position_size: None,
            leverage: None,
            strategy: strategy.into(),
            trade_type: TradeType::Spot,
        }
    }

    pub fn with_entry_price(mut self, price: Decimal) -> Self {
        self.entry_price = Some(price);
        self
    }

    pub fn with_target_price(mut self, price: Decimal) -> Self {
        self.target_price = Some(price);
        self
    }

    pub fn with_stop_loss(mut self, price: Decimal) -> Self {
        self.stop_loss = Some(price);
        self
    }

    pub fn with_position_size(mut self, fraction: Decimal) -> Self {
        self.position_size = Some(fraction);
        self
    }

    pub fn with_leverage(mut self, leverage: u8) -> Self {
        self.leverage = Some(leverage);
        self
    }

    pub fn with_trade_type(mut self, trade_type: TradeType) -> Self {
        self.trade_type = trade_type;
        self
    }

    /// True for signals that would open a new position
    pub fn is_opening(&self) -> bool {
        matches!(self.action, SignalAction::Buy | SignalAction::Sell)
    }
}
