//! Combined strategy
//!
//! Polls three independent reads of the snapshot: trend (price vs SMA20),
//! oscillator (MACD histogram), and sentiment. Two agreeing votes make a
//! signal; disagreement produces nothing.

use super::types::{SignalAction, TradingSignal};
use super::Strategy;
use crate::analysis::MarketAnalysis;
use crate::error::StrategyError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub struct CombinedStrategy {
    /// Votes required to emit a signal
    pub required_votes: i32,
    /// Sentiment magnitude that counts as a vote
    pub sentiment_threshold: Decimal,
}

impl Default for CombinedStrategy {
    fn default() -> Self {
        Self {
            required_votes: 2,
            sentiment_threshold: dec!(0.3),
        }
    }
}

impl Strategy for CombinedStrategy {
    fn name(&self) -> &str {
        "combined"
    }

    fn analyze(&self, analysis: &MarketAnalysis) -> Result<Vec<TradingSignal>, StrategyError> {
        let Some(latest) = analysis.latest() else {
            return Ok(vec![]);
        };
        let indicators = &analysis.indicators;
        if indicators.sma_20.is_zero() {
            return Ok(vec![]);
        }

        let mut bullish = 0;
        let mut bearish = 0;

        if latest.last_price > indicators.sma_20 {
            bullish += 1;
        } else if latest.last_price < indicators.sma_20 {
            bearish += 1;
        }

        if indicators.macd_histogram > Decimal::ZERO {
            bullish += 1;
        } else if indicators.macd_histogram < Decimal::ZERO {
            bearish += 1;
        }

        let sentiment = analysis.sentiment_score();
        if sentiment >= self.sentiment_threshold {
            bullish += 1;
        } else if sentiment <= -self.sentiment_threshold {
            bearish += 1;
        }

        let (action, votes) = if bullish >= self.required_votes && bearish == 0 {
            (SignalAction::Buy, bullish)
        } else if bearish >= self.required_votes && bullish == 0 {
            (SignalAction::Sell, bearish)
        } else {
            return Ok(vec![]);
        };

        let confidence = (dec!(0.55) + Decimal::from(votes) * dec!(0.1)).min(dec!(0.85));
        Ok(vec![TradingSignal::new(
            analysis.symbol.clone(),
            action,
            confidence,
            format!("{votes} of 3 aligned"),
            self.name(),
        )
        .with_entry_price(latest.last_price)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TechnicalIndicators;
    use crate::collector::SentimentData;
    use crate::exchange::MarketData;
    use chrono::Utc;

    fn analysis(
        price: Decimal,
        sma_20: Decimal,
        macd_histogram: Decimal,
        sentiment: Option<Decimal>,
    ) -> MarketAnalysis {
        let mut indicators = TechnicalIndicators::neutral("BTC/USDT");
        indicators.sma_20 = sma_20;
        indicators.macd_histogram = macd_histogram;
        MarketAnalysis {
            symbol: "BTC/USDT".to_string(),
            recent: vec![MarketData {
                symbol: "BTC/USDT".to_string(),
                last_price: price,
                volume: dec!(100),
                bid: price,
                ask: price,
                high_24h: price,
                low_24h: price,
                change_24h: dec!(0),
                timestamp: Utc::now(),
            }],
            indicators,
            sentiment: sentiment.map(|score| SentimentData {
                symbol: "BTC/USDT".to_string(),
                score,
                sources: vec![],
                mentions: 100,
                timestamp: Utc::now(),
            }),
            news: vec![],
        }
    }

    #[test]
    fn test_all_bullish_votes_buy() {
        let strategy = CombinedStrategy::default();
        let a = analysis(dec!(105), dec!(100), dec!(1), Some(dec!(0.6)));
        let signals = strategy.analyze(&a).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].action, SignalAction::Buy);
        assert_eq!(signals[0].confidence, dec!(0.85));
    }

    #[test]
    fn test_two_votes_without_opposition_buy() {
        let strategy = CombinedStrategy::default();
        // Trend and MACD bullish, sentiment silent
        let a = analysis(dec!(105), dec!(100), dec!(1), None);
        let signals = strategy.analyze(&a).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].action, SignalAction::Buy);
    }

    #[test]
    fn test_split_votes_yield_nothing() {
        let strategy = CombinedStrategy::default();
        // Trend bullish, MACD bearish, sentiment bullish
        let a = analysis(dec!(105), dec!(100), dec!(-1), Some(dec!(0.6)));
        assert!(strategy.analyze(&a).unwrap().is_empty());
    }

    #[test]
    fn test_all_bearish_votes_sell() {
        let strategy = CombinedStrategy::default();
        let a = analysis(dec!(95), dec!(100), dec!(-1), Some(dec!(-0.6)));
        let signals = strategy.analyze(&a).unwrap();
        assert_eq!(signals[0].action, SignalAction::Sell);
    }

    #[test]
    fn test_single_vote_insufficient() {
        let strategy = CombinedStrategy::default();
        let a = analysis(dec!(105), dec!(100), dec!(0), None);
        assert!(strategy.analyze(&a).unwrap().is_empty());
    }
}
