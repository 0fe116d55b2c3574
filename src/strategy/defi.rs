//! DeFi strategy
//!
//! Routes to on-chain venues: a confirmed trend with contained volatility
//! takes a modestly levered perpetual; a quiet, high-volume range earns
//! fees as a liquidity position instead.

use super::types::{SignalAction, TradeType, TradingSignal};
use super::Strategy;
use crate::analysis::MarketAnalysis;
use crate::error::StrategyError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub struct DefiStrategy {
    /// ATR-to-price ratio above which perps are too risky
    pub max_volatility: Decimal,
    /// ATR-to-price ratio below which a range is worth LPing
    pub lp_volatility: Decimal,
    /// Leverage applied to perpetual entries
    pub leverage: u8,
}

impl Default for DefiStrategy {
    fn default() -> Self {
        Self {
            max_volatility: dec!(0.03),
            lp_volatility: dec!(0.01),
            leverage: 2,
        }
    }
}

impl Strategy for DefiStrategy {
    fn name(&self) -> &str {
        "defi"
    }

    fn analyze(&self, analysis: &MarketAnalysis) -> Result<Vec<TradingSignal>, StrategyError> {
        let Some(latest) = analysis.latest() else {
            return Ok(vec![]);
        };
        let indicators = &analysis.indicators;
        if latest.last_price.is_zero() || indicators.sma_50.is_zero() {
            return Ok(vec![]);
        }

        let volatility = indicators.atr / latest.last_price;
        let trending_up = indicators.sma_20 > indicators.sma_50;
        let trending_down = indicators.sma_20 < indicators.sma_50;

        if volatility <= self.lp_volatility && !trending_up && !trending_down {
            // Flat and quiet: collect fees instead of direction
            return Ok(vec![TradingSignal::new(
                analysis.symbol.clone(),
                SignalAction::Buy,
                dec!(0.6),
                "quiet range, providing liquidity",
                self.name(),
            )
            .with_entry_price(latest.last_price)
            .with_trade_type(TradeType::Liquidity)]);
        }

        if volatility >= self.max_volatility {
            return Ok(vec![]);
        }

        let action = if trending_up && indicators.macd_histogram > Decimal::ZERO {
            SignalAction::Buy
        } else if trending_down && indicators.macd_histogram < Decimal::ZERO {
            SignalAction::Sell
        } else {
            return Ok(vec![]);
        };

        Ok(vec![TradingSignal::new(
            analysis.symbol.clone(),
            action,
            dec!(0.65),
            "trend aligned across moving averages",
            self.name(),
        )
        .with_entry_price(latest.last_price)
        .with_leverage(self.leverage)
        .with_trade_type(TradeType::Perpetual)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TechnicalIndicators;
    use crate::exchange::MarketData;
    use chrono::Utc;

    fn analysis(sma_20: Decimal, sma_50: Decimal, atr: Decimal, hist: Decimal) -> MarketAnalysis {
        let mut indicators = TechnicalIndicators::neutral("ETH/USDT");
        indicators.sma_20 = sma_20;
        indicators.sma_50 = sma_50;
        indicators.atr = atr;
        indicators.macd_histogram = hist;
        MarketAnalysis {
            symbol: "ETH/USDT".to_string(),
            recent: vec![MarketData {
                symbol: "ETH/USDT".to_string(),
                last_price: dec!(100),
                volume: dec!(1000),
                bid: dec!(99.9),
                ask: dec!(100.1),
                high_24h: dec!(105),
                low_24h: dec!(95),
                change_24h: dec!(0),
                timestamp: Utc::now(),
            }],
            indicators,
            sentiment: None,
            news: vec![],
        }
    }

    #[test]
    fn test_uptrend_opens_levered_perpetual() {
        let strategy = DefiStrategy::default();
        let signals = strategy
            .analyze(&analysis(dec!(102), dec!(100), dec!(1.5), dec!(1)))
            .unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].action, SignalAction::Buy);
        assert_eq!(signals[0].trade_type, TradeType::Perpetual);
        assert_eq!(signals[0].leverage, Some(2));
    }

    #[test]
    fn test_downtrend_opens_short_perpetual() {
        let strategy = DefiStrategy::default();
        let signals = strategy
            .analyze(&analysis(dec!(98), dec!(100), dec!(1.5), dec!(-1)))
            .unwrap();
        assert_eq!(signals[0].action, SignalAction::Sell);
    }

    #[test]
    fn test_high_volatility_blocks_perpetual() {
        let strategy = DefiStrategy::default();
        let signals = strategy
            .analyze(&analysis(dec!(102), dec!(100), dec!(5), dec!(1)))
            .unwrap();
        assert!(signals.is_empty());
    }

    #[test]
    fn test_quiet_flat_range_provides_liquidity() {
        let strategy = DefiStrategy::default();
        let signals = strategy
            .analyze(&analysis(dec!(100), dec!(100), dec!(0.5), dec!(0)))
            .unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].trade_type, TradeType::Liquidity);
    }

    #[test]
    fn test_unconfirmed_trend_yields_nothing() {
        let strategy = DefiStrategy::default();
        // Uptrend but MACD histogram disagrees
        let signals = strategy
            .analyze(&analysis(dec!(102), dec!(100), dec!(1.5), dec!(-1)))
            .unwrap();
        assert!(signals.is_empty());
    }
}
