//! AI decision engine
//!
//! Summarizes the cycle's market analysis into a prompt, delegates to an
//! external inference capability under a hard deadline, and parses the
//! structured decision. Unavailability means "no additional signals this
//! cycle", never a failed cycle.

mod client;
mod types;

pub use client::HttpInference;
pub use types::{AIDecision, MarketCondition, RiskAssessment, RiskLevel};

use crate::analysis::MarketAnalysis;
use crate::error::DecisionUnavailable;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

/// Trait for inference implementations
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Run one inference round-trip, returning the raw response text
    async fn infer(&self, prompt: &str) -> Result<String, DecisionUnavailable>;
}

/// Produces one structured decision per analysis cycle
pub struct AIDecisionEngine {
    inference: Arc<dyn InferenceClient>,
    timeout: Duration,
}

impl AIDecisionEngine {
    pub fn new(inference: Arc<dyn InferenceClient>, timeout: Duration) -> Self {
        Self { inference, timeout }
    }

    /// Ask the inference capability for a decision on this snapshot
    pub async fn decide(&self, analysis: &MarketAnalysis) -> Result<AIDecision, DecisionUnavailable> {
        let prompt = Self::build_prompt(analysis);

        let raw = tokio::time::timeout(self.timeout, self.inference.infer(&prompt))
            .await
            .map_err(|_| DecisionUnavailable::Timeout(self.timeout.as_secs()))??;

        let mut decision = Self::parse_decision(&raw)?;

        // Inference output is advisory; normalize before anything reads it
        decision.confidence = decision.confidence.clamp(Decimal::ZERO, Decimal::ONE);
        for signal in &mut decision.signals {
            signal.strategy = "ai".to_string();
            signal.confidence = signal.confidence.clamp(Decimal::ZERO, Decimal::ONE);
        }
        Ok(decision)
    }

    /// Render the snapshot into the inference prompt
    fn build_prompt(analysis: &MarketAnalysis) -> String {
        let mut prompt = String::with_capacity(1024);
        let _ = writeln!(
            prompt,
            "You are a trading analyst. Assess {} and respond with strict JSON \
             {{signals, reasoning, market_condition, confidence, suggested_actions, risk_assessment}}.",
            analysis.symbol
        );

        if let Some(latest) = analysis.latest() {
            let _ = writeln!(
                prompt,
                "Price {} (24h change {}%), bid {} ask {}, volume {}.",
                latest.last_price, latest.change_24h, latest.bid, latest.ask, latest.volume
            );
        }

        let ind = &analysis.indicators;
        let _ = writeln!(
            prompt,
            "Indicators: RSI {}, MACD {} (signal {}), SMA20 {}, SMA50 {}, \
             Bollinger [{}, {}], ATR {}.",
            ind.rsi,
            ind.macd,
            ind.macd_signal,
            ind.sma_20,
            ind.sma_50,
            ind.bollinger_lower,
            ind.bollinger_upper,
            ind.atr
        );

        if let Some(sentiment) = &analysis.sentiment {
            let _ = writeln!(
                prompt,
                "Sentiment {} from {} mentions.",
                sentiment.score, sentiment.mentions
            );
        }
        for item in analysis.news.iter().take(5) {
            let _ = writeln!(prompt, "News ({}): {}", item.source, item.headline);
        }

        prompt
    }

    /// Extract the decision JSON, tolerating fenced code blocks
    fn parse_decision(raw: &str) -> Result<AIDecision, DecisionUnavailable> {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(trimmed)
            .trim();

        serde_json::from_str(body).map_err(|e| DecisionUnavailable::Malformed(e.to_string()))
    }
}
