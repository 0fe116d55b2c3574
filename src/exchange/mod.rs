//! Exchange capability
//!
//! REST client for market data and order submission, plus a paper engine
//! that reads live data but simulates fills.

mod paper;
mod rest;
mod types;

pub use paper::PaperExchange;
pub use rest::RestExchange;
pub use types::{
    Candle, MarketData, MarketInfo, OrderBook, OrderFill, OrderRequest, OrderSide, PriceLevel,
};

use crate::error::{DataFetchError, ExecutionError};
use async_trait::async_trait;

/// Trait for exchange implementations
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Load static market metadata (called once at startup)
    async fn load_markets(&self) -> Result<Vec<MarketInfo>, DataFetchError>;
    /// Fetch latest tickers for the given symbols
    async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<MarketData>, DataFetchError>;
    /// Fetch an order book snapshot
    async fn fetch_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<OrderBook, DataFetchError>;
    /// Fetch recent OHLCV candles
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, DataFetchError>;
    /// Submit an order
    async fn create_order(&self, request: OrderRequest) -> Result<OrderFill, ExecutionError>;
}
