//! REST exchange client
//!
//! Speaks a ccxt-style JSON API: markets, tickers, order books, OHLCV,
//! and order submission. Request signing is the deployment's concern and is
//! limited here to attaching the API key header.

use super::types::{Candle, MarketData, MarketInfo, OrderBook, OrderFill, OrderRequest, PriceLevel};
use super::ExchangeClient;
use crate::config::ExchangeConfig;
use crate::error::{DataFetchError, ExecutionError};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// Ticker payload as returned by the exchange
#[derive(Debug, Deserialize)]
struct TickerPayload {
    symbol: String,
    last: Decimal,
    #[serde(rename = "baseVolume")]
    base_volume: Decimal,
    bid: Decimal,
    ask: Decimal,
    high: Decimal,
    low: Decimal,
    #[serde(rename = "percentage")]
    change_pct: Decimal,
    /// Milliseconds since epoch
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct MarketPayload {
    symbol: String,
    base: String,
    quote: String,
    #[serde(rename = "minAmount")]
    min_amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct OrderBookPayload {
    bids: Vec<(Decimal, Decimal)>,
    asks: Vec<(Decimal, Decimal)>,
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct OrderPayload {
    id: Option<String>,
    symbol: String,
    price: Decimal,
    #[serde(rename = "filled")]
    filled_quantity: Decimal,
    fee: Option<FeePayload>,
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct FeePayload {
    cost: Decimal,
}

/// HTTP client for the spot exchange REST API
pub struct RestExchange {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl RestExchange {
    /// Create a client from exchange configuration
    pub fn new(config: &ExchangeConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(ref key) = self.api_key {
            builder = builder.header("X-API-KEY", key);
        }
        builder
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DataFetchError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DataFetchError::ExchangeRejected { status, body });
        }
        Ok(response)
    }

    fn timestamp_from_millis(millis: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).single().unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl ExchangeClient for RestExchange {
    async fn load_markets(&self) -> Result<Vec<MarketInfo>, DataFetchError> {
        tracing::debug!(base_url = %self.base_url, "Loading exchange markets");

        let response = self.request("/markets").send().await?;
        let response = Self::check_status(response).await?;
        let payload: Vec<MarketPayload> = response
            .json()
            .await
            .map_err(|e| DataFetchError::MalformedResponse(e.to_string()))?;

        Ok(payload
            .into_iter()
            .map(|m| MarketInfo {
                symbol: m.symbol,
                base: m.base,
                quote: m.quote,
                min_order_size: m.min_amount,
            })
            .collect())
    }

    async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<MarketData>, DataFetchError> {
        let response = self
            .request("/tickers")
            .query(&[("symbols", symbols.join(","))])
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let payload: Vec<TickerPayload> = response
            .json()
            .await
            .map_err(|e| DataFetchError::MalformedResponse(e.to_string()))?;

        Ok(payload
            .into_iter()
            .map(|t| MarketData {
                symbol: t.symbol,
                last_price: t.last,
                volume: t.base_volume,
                bid: t.bid,
                ask: t.ask,
                high_24h: t.high,
                low_24h: t.low,
                change_24h: t.change_pct,
                timestamp: Self::timestamp_from_millis(t.timestamp),
            })
            .collect())
    }

    async fn fetch_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<OrderBook, DataFetchError> {
        let response = self
            .request("/orderbook")
            .query(&[("symbol", symbol), ("limit", &depth.to_string())])
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let payload: OrderBookPayload = response
            .json()
            .await
            .map_err(|e| DataFetchError::MalformedResponse(e.to_string()))?;

        let to_levels = |levels: Vec<(Decimal, Decimal)>| {
            levels
                .into_iter()
                .map(|(price, quantity)| PriceLevel { price, quantity })
                .collect()
        };

        Ok(OrderBook {
            symbol: symbol.to_string(),
            bids: to_levels(payload.bids),
            asks: to_levels(payload.asks),
            timestamp: Self::timestamp_from_millis(payload.timestamp),
        })
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, DataFetchError> {
        let response = self
            .request("/ohlcv")
            .query(&[
                ("symbol", symbol),
                ("timeframe", timeframe),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        // Rows come as [timestamp, open, high, low, close, volume]
        let payload: Vec<(i64, Decimal, Decimal, Decimal, Decimal, Decimal)> = response
            .json()
            .await
            .map_err(|e| DataFetchError::MalformedResponse(e.to_string()))?;

        Ok(payload
            .into_iter()
            .map(|(ts, open, high, low, close, volume)| Candle {
                timestamp: Self::timestamp_from_millis(ts),
                open,
                high,
                low,
                close,
                volume,
            })
            .collect())
    }

    async fn create_order(&self, request: OrderRequest) -> Result<OrderFill, ExecutionError> {
        let mut body = serde_json::json!({
            "symbol": request.symbol,
            "side": request.side,
            "amount": request.quantity,
            "type": if request.price.is_some() { "limit" } else { "market" },
        });
        if let Some(price) = request.price {
            body["price"] = serde_json::json!(price);
        }

        let mut builder = self
            .client
            .post(format!("{}/orders", self.base_url))
            .json(&body);
        if let Some(ref key) = self.api_key {
            builder = builder.header("X-API-KEY", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ExecutionError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutionError::OrderRejected(body));
        }

        let payload: OrderPayload = response
            .json()
            .await
            .map_err(|e| ExecutionError::Network(e.to_string()))?;

        let order_id = payload
            .id
            .and_then(|id| Uuid::parse_str(&id).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(OrderFill {
            order_id,
            symbol: payload.symbol,
            side: request.side,
            price: payload.price,
            quantity: payload.filled_quantity,
            fee: payload.fee.map(|f| f.cost).unwrap_or_default(),
            timestamp: Self::timestamp_from_millis(payload.timestamp),
        })
    }
}
