//! Run command implementation
//!
//! Wires the configured capabilities into a trading engine, starts it,
//! and runs until interrupted.

use crate::ai::{AIDecisionEngine, HttpInference};
use crate::api;
use crate::chain::{ChainClient, SimulatedChain};
use crate::collector::{
    HttpSentimentSource, MarketDataCollector, NullSentimentSource, SentimentCollector,
    SentimentProvider,
};
use crate::config::{Config, TradingMode};
use crate::events::event_channel;
use crate::exchange::{ExchangeClient, PaperExchange, RestExchange};
use crate::execution::ExecutionRouter;
use crate::strategy::StrategySet;
use crate::engine::TradingEngine;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Skip the AI engine even if configured
    #[arg(long)]
    pub no_ai: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let events = event_channel();

        let rest: Arc<dyn ExchangeClient> = Arc::new(RestExchange::new(&config.exchange));
        let exchange: Arc<dyn ExchangeClient> = match config.engine.mode {
            TradingMode::Paper => {
                tracing::info!("Paper mode: live data, simulated fills");
                Arc::new(PaperExchange::new(
                    rest,
                    config.execution.fee_rate,
                    config.execution.slippage_tolerance,
                ))
            }
            TradingMode::Live => rest,
        };
        let chain: Arc<dyn ChainClient> = Arc::new(SimulatedChain::new());

        let market = MarketDataCollector::new(
            Arc::clone(&exchange),
            config.engine.symbols.clone(),
            Duration::from_secs(config.collector.market_interval_secs),
            events.clone(),
        );

        let provider: Arc<dyn SentimentProvider> = match &config.sentiment.endpoint {
            Some(endpoint) => Arc::new(HttpSentimentSource::new(endpoint)),
            None => Arc::new(NullSentimentSource),
        };
        let sentiment = SentimentCollector::new(
            provider,
            config.engine.symbols.clone(),
            Duration::from_secs(config.collector.sentiment_interval_secs),
            &config.sentiment,
            events.clone(),
        );

        let ai = if config.ai.enabled && !self.no_ai {
            Some(AIDecisionEngine::new(
                Arc::new(HttpInference::new(&config.ai)),
                Duration::from_secs(config.ai.timeout_secs),
            ))
        } else {
            None
        };

        let router = ExecutionRouter::new(
            Arc::clone(&exchange),
            chain,
            config.execution.clone(),
            config.chain.clone(),
        );

        let api_config = config.api.clone();
        let engine = TradingEngine::new(
            config,
            market,
            sentiment,
            StrategySet::standard(),
            ai,
            router,
            events,
        );

        if api_config.enabled {
            let engine = Arc::clone(&engine);
            let bind = api_config.bind.clone();
            tokio::spawn(async move {
                if let Err(e) = api::serve(engine, &bind).await {
                    tracing::error!(error = %e, "Status API failed");
                }
            });
        }

        engine.start().await?;

        tokio::signal::ctrl_c().await?;
        tracing::info!("Interrupt received, shutting down");
        engine.stop().await;
        Ok(())
    }
}
