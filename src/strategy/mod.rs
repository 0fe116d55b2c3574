//! Trading strategies
//!
//! Each strategy deterministically maps the cycle's market analysis to
//! zero or more signals. Strategies run independently; one failing is
//! logged and contributes nothing, never blocking the others.

mod arbitrage;
mod combined;
mod defi;
mod mean_reversion;
mod momentum;
mod sentiment;
mod types;

pub use arbitrage::ArbitrageStrategy;
pub use combined::CombinedStrategy;
pub use defi::DefiStrategy;
pub use mean_reversion::MeanReversionStrategy;
pub use momentum::MomentumStrategy;
pub use sentiment::SentimentStrategy;
pub use types::{SignalAction, TradeType, TradingSignal};

use crate::analysis::MarketAnalysis;
use crate::error::StrategyError;

/// Trait for strategy implementations
pub trait Strategy: Send + Sync {
    /// Strategy name recorded on emitted signals
    fn name(&self) -> &str;

    /// Map a market-analysis snapshot to candidate signals
    fn analyze(&self, analysis: &MarketAnalysis) -> Result<Vec<TradingSignal>, StrategyError>;
}

/// Ordered collection of strategies evaluated independently per cycle
pub struct StrategySet {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategySet {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// The full built-in lineup
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(MomentumStrategy::default()),
            Box::new(MeanReversionStrategy::default()),
            Box::new(ArbitrageStrategy::default()),
            Box::new(SentimentStrategy::default()),
            Box::new(CombinedStrategy::default()),
            Box::new(DefiStrategy::default()),
        ])
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run every strategy against the snapshot, concatenating outputs
    ///
    /// No strategy sees another's output in the same cycle; results are
    /// order-independent. Failures are isolated and logged.
    pub fn run(&self, analysis: &MarketAnalysis) -> Vec<TradingSignal> {
        let mut signals = Vec::new();
        for strategy in &self.strategies {
            match strategy.analyze(analysis) {
                Ok(mut batch) => signals.append(&mut batch),
                Err(e) => {
                    tracing::warn!(strategy = strategy.name(), error = %e, "Strategy failed");
                }
            }
        }
        signals
    }
}
