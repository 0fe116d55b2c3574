//! Sentiment-driven strategy
//!
//! Acts on strong aggregate sentiment with enough mention volume behind
//! it. Quiet or mixed sentiment produces nothing.

use super::types::{SignalAction, TradingSignal};
use super::Strategy;
use crate::analysis::MarketAnalysis;
use crate::error::StrategyError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub struct SentimentStrategy {
    pub bullish_threshold: Decimal,
    pub bearish_threshold: Decimal,
    pub min_mentions: u64,
}

impl Default for SentimentStrategy {
    fn default() -> Self {
        Self {
            bullish_threshold: dec!(0.5),
            bearish_threshold: dec!(-0.5),
            min_mentions: 25,
        }
    }
}

impl Strategy for SentimentStrategy {
    fn name(&self) -> &str {
        "sentiment"
    }

    fn analyze(&self, analysis: &MarketAnalysis) -> Result<Vec<TradingSignal>, StrategyError> {
        let Some(sentiment) = analysis.sentiment.as_ref() else {
            return Ok(vec![]);
        };
        if sentiment.mentions < self.min_mentions {
            return Ok(vec![]);
        }

        let action = if sentiment.score >= self.bullish_threshold {
            SignalAction::Buy
        } else if sentiment.score <= self.bearish_threshold {
            SignalAction::Sell
        } else {
            return Ok(vec![]);
        };

        // |score| in [threshold, 1] maps onto [0.55, 0.85]
        let confidence = (dec!(0.55) + (sentiment.score.abs() - self.bullish_threshold.abs())
            * dec!(0.6))
        .min(dec!(0.85));

        let mut signal = TradingSignal::new(
            analysis.symbol.clone(),
            action,
            confidence,
            format!(
                "sentiment {} across {} mentions",
                sentiment.score, sentiment.mentions
            ),
            self.name(),
        );
        if let Some(latest) = analysis.latest() {
            signal = signal.with_entry_price(latest.last_price);
        }
        Ok(vec![signal])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TechnicalIndicators;
    use crate::collector::SentimentData;
    use chrono::Utc;

    fn analysis(score: Decimal, mentions: u64) -> MarketAnalysis {
        MarketAnalysis {
            symbol: "BTC/USDT".to_string(),
            recent: vec![],
            indicators: TechnicalIndicators::neutral("BTC/USDT"),
            sentiment: Some(SentimentData {
                symbol: "BTC/USDT".to_string(),
                score,
                sources: vec![],
                mentions,
                timestamp: Utc::now(),
            }),
            news: vec![],
        }
    }

    #[test]
    fn test_strong_positive_sentiment_buys() {
        let strategy = SentimentStrategy::default();
        let signals = strategy.analyze(&analysis(dec!(0.8), 100)).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].action, SignalAction::Buy);
    }

    #[test]
    fn test_strong_negative_sentiment_sells() {
        let strategy = SentimentStrategy::default();
        let signals = strategy.analyze(&analysis(dec!(-0.7), 100)).unwrap();
        assert_eq!(signals[0].action, SignalAction::Sell);
    }

    #[test]
    fn test_weak_sentiment_ignored() {
        let strategy = SentimentStrategy::default();
        assert!(strategy.analyze(&analysis(dec!(0.2), 100)).unwrap().is_empty());
    }

    #[test]
    fn test_thin_mentions_ignored() {
        let strategy = SentimentStrategy::default();
        assert!(strategy.analyze(&analysis(dec!(0.9), 5)).unwrap().is_empty());
    }

    #[test]
    fn test_missing_sentiment_ignored() {
        let strategy = SentimentStrategy::default();
        let mut a = analysis(dec!(0.9), 100);
        a.sentiment = None;
        assert!(strategy.analyze(&a).unwrap().is_empty());
    }

    #[test]
    fn test_confidence_scales_with_score() {
        let strategy = SentimentStrategy::default();
        let mild = strategy.analyze(&analysis(dec!(0.55), 100)).unwrap();
        let strong = strategy.analyze(&analysis(dec!(0.95), 100)).unwrap();
        assert!(strong[0].confidence > mild[0].confidence);
    }
}
