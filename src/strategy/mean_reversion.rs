//! Mean-reversion strategy
//!
//! Fades closes outside the Bollinger bands when RSI agrees the move is
//! stretched, targeting the band midline.

use super::types::{SignalAction, TradingSignal};
use super::Strategy;
use crate::analysis::MarketAnalysis;
use crate::error::StrategyError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub struct MeanReversionStrategy {
    pub rsi_oversold: Decimal,
    pub rsi_overbought: Decimal,
}

impl Default for MeanReversionStrategy {
    fn default() -> Self {
        Self {
            rsi_oversold: dec!(30),
            rsi_overbought: dec!(70),
        }
    }
}

impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn analyze(&self, analysis: &MarketAnalysis) -> Result<Vec<TradingSignal>, StrategyError> {
        let Some(latest) = analysis.latest() else {
            return Ok(vec![]);
        };
        let indicators = &analysis.indicators;
        // Collapsed bands mean the lookback was too short to judge stretch
        if indicators.bollinger_upper == indicators.bollinger_lower {
            return Ok(vec![]);
        }

        let price = latest.last_price;
        let band_width = indicators.bollinger_upper - indicators.bollinger_lower;

        let signal = if price < indicators.bollinger_lower && indicators.rsi < self.rsi_oversold {
            let stretch = (indicators.bollinger_lower - price) / band_width;
            Some((SignalAction::Buy, stretch, "below lower band, oversold"))
        } else if price > indicators.bollinger_upper && indicators.rsi > self.rsi_overbought {
            let stretch = (price - indicators.bollinger_upper) / band_width;
            Some((SignalAction::Sell, stretch, "above upper band, overbought"))
        } else {
            None
        };

        Ok(signal
            .map(|(action, stretch, reason)| {
                let confidence = (dec!(0.55) + stretch).min(dec!(0.85));
                vec![TradingSignal::new(
                    analysis.symbol.clone(),
                    action,
                    confidence,
                    reason,
                    self.name(),
                )
                .with_entry_price(price)
                .with_target_price(indicators.bollinger_middle)]
            })
            .unwrap_or_default())
    }
}
