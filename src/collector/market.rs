//! Market data collector
//!
//! Polls the exchange for tickers on a fixed interval, maintains the
//! per-symbol latest-value cache, and emits one market-data event per
//! symbol per successful fetch.

use crate::error::DataFetchError;
use crate::events::{publish, EngineEvent};
use crate::exchange::{Candle, ExchangeClient, MarketData, MarketInfo, OrderBook};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};

/// Polls tickers and caches the latest snapshot per symbol
pub struct MarketDataCollector {
    exchange: Arc<dyn ExchangeClient>,
    symbols: Vec<String>,
    interval: Duration,
    cache: Arc<RwLock<HashMap<String, MarketData>>>,
    markets: Arc<RwLock<Vec<MarketInfo>>>,
    events: broadcast::Sender<EngineEvent>,
    shutdown: watch::Sender<bool>,
}

impl MarketDataCollector {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        symbols: Vec<String>,
        interval: Duration,
        events: broadcast::Sender<EngineEvent>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            exchange,
            symbols,
            interval,
            cache: Arc::new(RwLock::new(HashMap::new())),
            markets: Arc::new(RwLock::new(vec![])),
            events,
            shutdown,
        }
    }

    /// Load market metadata, fetch once, then poll on the interval
    ///
    /// Metadata failure is fatal: it means the configuration points at an
    /// exchange that cannot serve the requested symbols. Everything after
    /// that is retried forever.
    pub async fn start(&self) -> Result<(), DataFetchError> {
        let markets = self.exchange.load_markets().await?;
        tracing::info!(market_count = markets.len(), "Loaded exchange markets");
        *self.markets.write().await = markets;

        Self::fetch_cycle(&self.exchange, &self.symbols, &self.cache, &self.events).await;

        let exchange = Arc::clone(&self.exchange);
        let symbols = self.symbols.clone();
        let cache = Arc::clone(&self.cache);
        let events = self.events.clone();
        let interval = self.interval;
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // first tick fires immediately; already fetched
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        Self::fetch_cycle(&exchange, &symbols, &cache, &events).await;
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            tracing::debug!("Market data collector stopping");
                            break;
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// Cancel the recurring fetch schedule
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    async fn fetch_cycle(
        exchange: &Arc<dyn ExchangeClient>,
        symbols: &[String],
        cache: &Arc<RwLock<HashMap<String, MarketData>>>,
        events: &broadcast::Sender<EngineEvent>,
    ) {
        match exchange.fetch_tickers(symbols).await {
            Ok(tickers) => {
                let mut guard = cache.write().await;
                for data in tickers {
                    guard.insert(data.symbol.clone(), data.clone());
                    publish(
                        events,
                        EngineEvent::MarketUpdate {
                            data,
                            timestamp: Utc::now(),
                        },
                    );
                }
            }
            Err(e) => {
                // Last-known-good cache entries persist; retry next tick
                tracing::warn!(error = %e, "Market data fetch failed");
            }
        }
    }

    /// Most recent cached snapshot for a symbol
    pub async fn latest(&self, symbol: &str) -> Option<MarketData> {
        self.cache.read().await.get(symbol).cloned()
    }

    /// Defensive copy of the full cache
    pub async fn all_latest(&self) -> HashMap<String, MarketData> {
        self.cache.read().await.clone()
    }

    /// Market metadata loaded at startup
    pub async fn markets(&self) -> Vec<MarketInfo> {
        self.markets.read().await.clone()
    }

    /// On-demand order book fetch, not cached
    pub async fn fetch_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<OrderBook, DataFetchError> {
        self.exchange.fetch_order_book(symbol, depth).await
    }

    /// On-demand OHLCV fetch, not cached
    pub async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, DataFetchError> {
        self.exchange.fetch_ohlcv(symbol, timeframe, limit).await
    }
}
