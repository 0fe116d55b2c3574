//! Paper trading exchange
//!
//! Delegates all market-data reads to a wrapped live client and simulates
//! fills locally: immediate execution at the requested price plus the
//! configured slippage estimate, fee charged on notional.

use super::types::{Candle, MarketData, MarketInfo, OrderBook, OrderFill, OrderRequest, OrderSide};
use super::ExchangeClient;
use crate::error::{DataFetchError, ExecutionError};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Paper exchange with simulated fills
pub struct PaperExchange {
    inner: Arc<dyn ExchangeClient>,
    fee_rate: Decimal,
    slippage: Decimal,
    fills: Arc<RwLock<Vec<OrderFill>>>,
}

impl PaperExchange {
    /// Wrap a live data client with simulated execution
    pub fn new(inner: Arc<dyn ExchangeClient>, fee_rate: Decimal, slippage: Decimal) -> Self {
        Self {
            inner,
            fee_rate,
            slippage,
            fills: Arc::new(RwLock::new(vec![])),
        }
    }

    /// All fills recorded so far
    pub async fn fills(&self) -> Vec<OrderFill> {
        self.fills.read().await.clone()
    }

    /// Fill price after slippage: buys pay up, sells receive less
    fn fill_price(&self, side: OrderSide, price: Decimal) -> Decimal {
        match side {
            OrderSide::Buy => price * (Decimal::ONE + self.slippage),
            OrderSide::Sell => price * (Decimal::ONE - self.slippage),
        }
    }
}

#[async_trait]
impl ExchangeClient for PaperExchange {
    async fn load_markets(&self) -> Result<Vec<MarketInfo>, DataFetchError> {
        self.inner.load_markets().await
    }

    async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<MarketData>, DataFetchError> {
        self.inner.fetch_tickers(symbols).await
    }

    async fn fetch_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<OrderBook, DataFetchError> {
        self.inner.fetch_order_book(symbol, depth).await
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, DataFetchError> {
        self.inner.fetch_ohlcv(symbol, timeframe, limit).await
    }

    async fn create_order(&self, request: OrderRequest) -> Result<OrderFill, ExecutionError> {
        let reference = request.price.ok_or_else(|| {
            ExecutionError::OrderRejected("paper orders need a reference price".to_string())
        })?;

        let price = self.fill_price(request.side, reference);
        let fee = request.quantity * price * self.fee_rate;
        let fill = OrderFill {
            order_id: Uuid::new_v4(),
            symbol: request.symbol,
            side: request.side,
            price,
            quantity: request.quantity,
            fee,
            timestamp: Utc::now(),
        };

        let mut fills = self.fills.write().await;
        fills.push(fill.clone());

        tracing::info!(order_id = %fill.order_id, symbol = %fill.symbol, "Paper order filled");
        Ok(fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Static data source for paper-engine tests
    struct StubExchange;

    #[async_trait]
    impl ExchangeClient for StubExchange {
        async fn load_markets(&self) -> Result<Vec<MarketInfo>, DataFetchError> {
            Ok(vec![MarketInfo {
                symbol: "BTC/USDT".to_string(),
                base: "BTC".to_string(),
                quote: "USDT".to_string(),
                min_order_size: dec!(0.0001),
            }])
        }

        async fn fetch_tickers(
            &self,
            _symbols: &[String],
        ) -> Result<Vec<MarketData>, DataFetchError> {
            Ok(vec![])
        }

        async fn fetch_order_book(
            &self,
            symbol: &str,
            _depth: usize,
        ) -> Result<OrderBook, DataFetchError> {
            Ok(OrderBook {
                symbol: symbol.to_string(),
                bids: vec![],
                asks: vec![],
                timestamp: Utc::now(),
            })
        }

        async fn fetch_ohlcv(
            &self,
            _symbol: &str,
            _timeframe: &str,
            _limit: usize,
        ) -> Result<Vec<Candle>, DataFetchError> {
            Ok(vec![])
        }

        async fn create_order(&self, _request: OrderRequest) -> Result<OrderFill, ExecutionError> {
            Err(ExecutionError::OrderRejected("stub".to_string()))
        }
    }

    fn paper() -> PaperExchange {
        PaperExchange::new(Arc::new(StubExchange), dec!(0.001), dec!(0))
    }

    #[tokio::test]
    async fn test_paper_fill_at_reference_price() {
        let exchange = paper();
        let fill = exchange
            .create_order(OrderRequest {
                symbol: "BTC/USDT".to_string(),
                side: OrderSide::Buy,
                quantity: dec!(0.01),
                price: Some(dec!(100000)),
            })
            .await
            .unwrap();

        assert_eq!(fill.price, dec!(100000));
        assert_eq!(fill.fee, dec!(1)); // 0.01 * 100000 * 0.001
        assert_eq!(exchange.fills().await.len(), 1);
    }

    #[tokio::test]
    async fn test_paper_fill_applies_slippage() {
        let exchange = PaperExchange::new(Arc::new(StubExchange), dec!(0), dec!(0.01));

        let buy = exchange
            .create_order(OrderRequest {
                symbol: "BTC/USDT".to_string(),
                side: OrderSide::Buy,
                quantity: dec!(1),
                price: Some(dec!(100)),
            })
            .await
            .unwrap();
        assert_eq!(buy.price, dec!(101));

        let sell = exchange
            .create_order(OrderRequest {
                symbol: "BTC/USDT".to_string(),
                side: OrderSide::Sell,
                quantity: dec!(1),
                price: Some(dec!(100)),
            })
            .await
            .unwrap();
        assert_eq!(sell.price, dec!(99));
    }

    #[tokio::test]
    async fn test_paper_order_requires_price() {
        let exchange = paper();
        let result = exchange
            .create_order(OrderRequest {
                symbol: "BTC/USDT".to_string(),
                side: OrderSide::Buy,
                quantity: dec!(1),
                price: None,
            })
            .await;
        assert!(matches!(result, Err(ExecutionError::OrderRejected(_))));
    }

    #[tokio::test]
    async fn test_paper_delegates_market_data() {
        let exchange = paper();
        let markets = exchange.load_markets().await.unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].symbol, "BTC/USDT");
    }
}
