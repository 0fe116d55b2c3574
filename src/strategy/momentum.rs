//! Momentum strategy
//!
//! Follows sustained directional moves over the recent window, confirmed
//! by MACD histogram direction, and backs off when RSI is already
//! stretched in the move's direction.

use super::types::{SignalAction, TradingSignal};
use super::Strategy;
use crate::analysis::MarketAnalysis;
use crate::error::StrategyError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub struct MomentumStrategy {
    /// Minimum window move to act on
    pub min_move_pct: Decimal,
    /// Skip buys above this RSI
    pub rsi_ceiling: Decimal,
    /// Skip sells below this RSI
    pub rsi_floor: Decimal,
}

impl Default for MomentumStrategy {
    fn default() -> Self {
        Self {
            min_move_pct: dec!(0.02),
            rsi_ceiling: dec!(70),
            rsi_floor: dec!(30),
        }
    }
}

impl Strategy for MomentumStrategy {
    fn name(&self) -> &str {
        "momentum"
    }

    fn analyze(&self, analysis: &MarketAnalysis) -> Result<Vec<TradingSignal>, StrategyError> {
        let (Some(first), Some(last)) = (analysis.recent.first(), analysis.recent.last()) else {
            return Ok(vec![]);
        };
        if first.last_price.is_zero() {
            return Ok(vec![]);
        }

        let move_pct = (last.last_price - first.last_price) / first.last_price;
        let indicators = &analysis.indicators;

        let signal = if move_pct >= self.min_move_pct
            && indicators.macd_histogram > Decimal::ZERO
            && indicators.rsi < self.rsi_ceiling
        {
            Some((SignalAction::Buy, move_pct))
        } else if move_pct <= -self.min_move_pct
            && indicators.macd_histogram < Decimal::ZERO
            && indicators.rsi > self.rsi_floor
        {
            Some((SignalAction::Sell, -move_pct))
        } else {
            None
        };

        Ok(signal
            .map(|(action, magnitude)| {
                let confidence = (dec!(0.5) + magnitude * dec!(10)).min(dec!(0.9));
                vec![TradingSignal::new(
                    analysis.symbol.clone(),
                    action,
                    confidence,
                    format!("window move {:.4}, MACD confirms", move_pct),
                    self.name(),
                )
                .with_entry_price(last.last_price)]
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TechnicalIndicators;
    use crate::exchange::MarketData;
    use chrono::Utc;

    fn snapshot(symbol: &str, price: Decimal) -> MarketData {
        MarketData {
            symbol: symbol.to_string(),
            last_price: price,
            volume: dec!(1000),
            bid: price - dec!(1),
            ask: price + dec!(1),
            high_24h: price + dec!(100),
            low_24h: price - dec!(100),
            change_24h: dec!(0),
            timestamp: Utc::now(),
        }
    }

    fn analysis(prices: &[Decimal], rsi: Decimal, macd_histogram: Decimal) -> MarketAnalysis {
        let mut indicators = TechnicalIndicators::neutral("BTC/USDT");
        indicators.rsi = rsi;
        indicators.macd_histogram = macd_histogram;
        MarketAnalysis {
            symbol: "BTC/USDT".to_string(),
            recent: prices.iter().map(|p| snapshot("BTC/USDT", *p)).collect(),
            indicators,
            sentiment: None,
            news: vec![],
        }
    }

    #[test]
    fn test_uptrend_with_confirmation_buys() {
        let a = analysis(&[dec!(100), dec!(103)], dec!(55), dec!(1));
        let strategy = MomentumStrategy::default();
        let signals = strategy.analyze(&a).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].action, SignalAction::Buy);
        assert!(signals[0].confidence > dec!(0.5));
    }

    #[test]
    fn test_overbought_rsi_suppresses_buy() {
        let a = analysis(&[dec!(100), dec!(103)], dec!(75), dec!(1));
        let strategy = MomentumStrategy::default();
        assert!(strategy.analyze(&a).unwrap().is_empty());
    }

    #[test]
    fn test_downtrend_with_confirmation_sells() {
        let a = analysis(&[dec!(100), dec!(97)], dec!(45), dec!(-1));
        let strategy = MomentumStrategy::default();
        let signals = strategy.analyze(&a).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].action, SignalAction::Sell);
    }

    #[test]
    fn test_small_move_is_ignored() {
        let a = analysis(&[dec!(100), dec!(100.5)], dec!(55), dec!(1));
        let strategy = MomentumStrategy::default();
        assert!(strategy.analyze(&a).unwrap().is_empty());
    }

    #[test]
    fn test_unconfirmed_move_is_ignored() {
        // Up move but MACD histogram negative
        let a = analysis(&[dec!(100), dec!(103)], dec!(55), dec!(-1));
        let strategy = MomentumStrategy::default();
        assert!(strategy.analyze(&a).unwrap().is_empty());
    }

    #[test]
    fn test_empty_window_yields_nothing() {
        let a = analysis(&[], dec!(50), dec!(0));
        let strategy = MomentumStrategy::default();
        assert!(strategy.analyze(&a).unwrap().is_empty());
    }

    #[test]
    fn test_confidence_capped() {
        let a = analysis(&[dec!(100), dec!(150)], dec!(55), dec!(1));
        let strategy = MomentumStrategy::default();
        let signals = strategy.analyze(&a).unwrap();
        assert_eq!(signals[0].confidence, dec!(0.9));
    }
}
