//! Arbitrage strategy
//!
//! Trades dislocations between the last print and the book mid: a stale
//! last price against a moved book closes toward the mid. Only acts when
//! the quoted spread is tight enough for the edge to survive costs.

use super::types::{SignalAction, TradingSignal};
use super::Strategy;
use crate::analysis::MarketAnalysis;
use crate::error::StrategyError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub struct ArbitrageStrategy {
    /// Minimum last-vs-mid deviation to act on
    pub min_deviation: Decimal,
    /// Maximum quoted spread for the edge to be tradable
    pub max_spread: Decimal,
}

impl Default for ArbitrageStrategy {
    fn default() -> Self {
        Self {
            min_deviation: dec!(0.005),
            max_spread: dec!(0.002),
        }
    }
}

impl Strategy for ArbitrageStrategy {
    fn name(&self) -> &str {
        "arbitrage"
    }

    fn analyze(&self, analysis: &MarketAnalysis) -> Result<Vec<TradingSignal>, StrategyError> {
        let Some(latest) = analysis.latest() else {
            return Ok(vec![]);
        };
        if latest.bid.is_zero() || latest.ask.is_zero() || latest.bid >= latest.ask {
            return Ok(vec![]);
        }

        let mid = (latest.bid + latest.ask) / Decimal::TWO;
        let spread = (latest.ask - latest.bid) / mid;
        if spread > self.max_spread {
            return Ok(vec![]);
        }

        let deviation = (latest.last_price - mid) / mid;
        let signal = if deviation <= -self.min_deviation {
            // Last print below the book: price should pull up to the mid
            Some(SignalAction::Buy)
        } else if deviation >= self.min_deviation {
            Some(SignalAction::Sell)
        } else {
            None
        };

        Ok(signal
            .map(|action| {
                let confidence = (dec!(0.5) + deviation.abs() * dec!(20)).min(dec!(0.8));
                vec![TradingSignal::new(
                    analysis.symbol.clone(),
                    action,
                    confidence,
                    format!("last {:.4} off book mid", deviation),
                    self.name(),
                )
                .with_entry_price(latest.last_price)
                .with_target_price(mid)]
            })
            .unwrap_or_default())
    }
}
