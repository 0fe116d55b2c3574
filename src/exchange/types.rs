//! Exchange data and order types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Latest market snapshot for one symbol
///
/// Immutable: each poll produces a fresh snapshot that supersedes the
/// previous one in the collector cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketData {
    /// Trading symbol (e.g., "BTC/USDT")
    pub symbol: String,
    /// Last traded price
    pub last_price: Decimal,
    /// 24h traded volume
    pub volume: Decimal,
    /// Best bid
    pub bid: Decimal,
    /// Best ask
    pub ask: Decimal,
    /// 24h high
    pub high_24h: Decimal,
    /// 24h low
    pub low_24h: Decimal,
    /// 24h price change percentage
    pub change_24h: Decimal,
    /// Capture timestamp
    pub timestamp: DateTime<Utc>,
}

/// One price level of an order book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Order book snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    pub symbol: String,
    /// Bids sorted best-first
    pub bids: Vec<PriceLevel>,
    /// Asks sorted best-first
    pub asks: Vec<PriceLevel>,
    pub timestamp: DateTime<Utc>,
}

impl OrderBook {
    /// Mid price between best bid and best ask
    pub fn mid_price(&self) -> Option<Decimal> {
        let bid = self.bids.first()?.price;
        let ask = self.asks.first()?.price;
        Some((bid + ask) / Decimal::TWO)
    }
}

/// OHLCV candle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Static market metadata loaded once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketInfo {
    pub symbol: String,
    pub base: String,
    pub quote: String,
    /// Smallest tradable quantity
    pub min_order_size: Decimal,
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// An order to be submitted to the exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    /// Limit price; market order when absent
    pub price: Option<Decimal>,
}

/// A completed fill returned by the exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFill {
    pub order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
    pub timestamp: DateTime<Utc>,
}
