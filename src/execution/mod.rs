//! Execution router
//!
//! Routes approved signals to the right venue: spot orders go to the
//! exchange, perpetual/liquidity trades become on-chain transactions.
//! Execution per symbol is serialized; a second request while one is in
//! flight is refused rather than interleaved, so a race between the AI
//! path and a strategy path can never double-open a position.

use crate::chain::{ChainClient, ChainTransaction};
use crate::config::{ChainConfig, ExecutionConfig};
use crate::error::ExecutionError;
use crate::exchange::{ExchangeClient, OrderFill, OrderRequest, OrderSide};
use crate::strategy::{TradeType, TradingSignal};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Removes the symbol from the in-flight set when execution finishes,
/// successfully or not
struct InFlightGuard {
    symbol: String,
    set: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .expect("in-flight lock poisoned")
            .remove(&self.symbol);
    }
}

/// Executes approved signals against spot or on-chain venues
pub struct ExecutionRouter {
    exchange: Arc<dyn ExchangeClient>,
    chain: Arc<dyn ChainClient>,
    config: ExecutionConfig,
    chain_config: ChainConfig,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl ExecutionRouter {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        chain: Arc<dyn ChainClient>,
        config: ExecutionConfig,
        chain_config: ChainConfig,
    ) -> Self {
        Self {
            exchange,
            chain,
            config,
            chain_config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Execute one approved signal, returning the resulting fill
    ///
    /// `side` is the order side resolved by the caller (a Close inverts
    /// the position side); `reference_price` anchors the slippage bound.
    pub async fn execute(
        &self,
        signal: &TradingSignal,
        side: OrderSide,
        quantity: Decimal,
        reference_price: Decimal,
    ) -> Result<OrderFill, ExecutionError> {
        if quantity <= Decimal::ZERO {
            return Err(ExecutionError::OrderRejected(
                "non-positive quantity".to_string(),
            ));
        }

        let _guard = self.claim(&signal.symbol)?;

        match signal.trade_type {
            TradeType::Spot => self.execute_spot(signal, side, quantity, reference_price).await,
            TradeType::Perpetual | TradeType::Liquidity => {
                self.execute_on_chain(signal, side, quantity, reference_price)
                    .await
            }
        }
    }

    /// Claim the symbol's execution slot or refuse
    fn claim(&self, symbol: &str) -> Result<InFlightGuard, ExecutionError> {
        let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
        if !in_flight.insert(symbol.to_string()) {
            return Err(ExecutionError::Busy(symbol.to_string()));
        }
        Ok(InFlightGuard {
            symbol: symbol.to_string(),
            set: Arc::clone(&self.in_flight),
        })
    }

    async fn execute_spot(
        &self,
        signal: &TradingSignal,
        side: OrderSide,
        quantity: Decimal,
        reference_price: Decimal,
    ) -> Result<OrderFill, ExecutionError> {
        // Limit price bounds slippage by construction
        let limit = match side {
            OrderSide::Buy => reference_price * (Decimal::ONE + self.config.slippage_tolerance),
            OrderSide::Sell => reference_price * (Decimal::ONE - self.config.slippage_tolerance),
        };

        let fill = self
            .exchange
            .create_order(OrderRequest {
                symbol: signal.symbol.clone(),
                side,
                quantity,
                price: Some(limit),
            })
            .await?;

        tracing::info!(
            symbol = %fill.symbol,
            ?side,
            price = %fill.price,
            quantity = %fill.quantity,
            "Spot order filled"
        );
        Ok(fill)
    }

    async fn execute_on_chain(
        &self,
        signal: &TradingSignal,
        side: OrderSide,
        quantity: Decimal,
        reference_price: Decimal,
    ) -> Result<OrderFill, ExecutionError> {
        let router = self
            .chain_config
            .router_address
            .clone()
            .ok_or_else(|| ExecutionError::OrderRejected("no router address configured".to_string()))?;

        // Minimum-out encodes the slippage bound for the venue to enforce
        let min_out = match side {
            OrderSide::Buy => quantity * (Decimal::ONE - self.config.slippage_tolerance),
            OrderSide::Sell => {
                quantity * reference_price * (Decimal::ONE - self.config.slippage_tolerance)
            }
        };
        let mut tx = ChainTransaction {
            to: router,
            data: format!(
                "swap:{}:{:?}:{}:{}:{}",
                signal.symbol,
                side,
                quantity,
                min_out,
                signal.leverage.unwrap_or(1)
            ),
            value: Decimal::ZERO,
            gas_limit: None,
        };

        let estimate = self.chain.estimate_gas(&tx).await?;
        // Safety buffer over the raw estimate
        let buffered = Decimal::from(estimate) * (Decimal::ONE + self.config.gas_buffer);
        tx.gas_limit = Some(buffered.ceil().to_u64().unwrap_or(estimate));

        let receipt = self.chain.sign_and_send(tx).await?;

        tracing::info!(
            symbol = %signal.symbol,
            tx_hash = %receipt.tx_hash,
            gas_used = receipt.gas_used,
            "On-chain execution confirmed"
        );

        Ok(OrderFill {
            order_id: uuid::Uuid::new_v4(),
            symbol: signal.symbol.clone(),
            side,
            price: reference_price,
            quantity,
            fee: quantity * reference_price * self.config.fee_rate,
            timestamp: chrono::Utc::now(),
        })
    }
}
