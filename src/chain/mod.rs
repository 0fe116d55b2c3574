//! On-chain execution capability
//!
//! Gas estimation, transaction submission, and balance queries for the
//! DeFi execution path. The simulated client backs paper mode and tests.

use crate::error::ExecutionError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A transaction ready for signing and submission
#[derive(Debug, Clone)]
pub struct ChainTransaction {
    /// Target contract address
    pub to: String,
    /// ABI-encoded calldata, hex
    pub data: String,
    /// Native value attached
    pub value: Decimal,
    /// Gas limit; estimated when absent
    pub gas_limit: Option<u64>,
}

/// Receipt for a confirmed transaction
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub gas_used: u64,
}

/// Trait for chain execution implementations
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Estimate gas for a transaction
    async fn estimate_gas(&self, tx: &ChainTransaction) -> Result<u64, ExecutionError>;
    /// Sign and broadcast, waiting for confirmation
    async fn sign_and_send(&self, tx: ChainTransaction) -> Result<TxReceipt, ExecutionError>;
    /// Wallet balance for an asset
    async fn get_balance(&self, asset: &str) -> Result<Decimal, ExecutionError>;
}

/// In-memory chain simulation
///
/// Tracks per-asset balances and confirms every well-formed transaction.
pub struct SimulatedChain {
    balances: Arc<RwLock<HashMap<String, Decimal>>>,
    base_gas: u64,
}

impl SimulatedChain {
    pub fn new() -> Self {
        Self {
            balances: Arc::new(RwLock::new(HashMap::new())),
            base_gas: 150_000,
        }
    }

    /// Seed a balance for an asset
    pub async fn fund(&self, asset: impl Into<String>, amount: Decimal) {
        let mut balances = self.balances.write().await;
        *balances.entry(asset.into()).or_default() += amount;
    }
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    async fn estimate_gas(&self, tx: &ChainTransaction) -> Result<u64, ExecutionError> {
        if tx.to.is_empty() {
            return Err(ExecutionError::GasEstimation(
                "missing target address".to_string(),
            ));
        }
        // Calldata-proportional cost on top of the base transfer cost
        Ok(self.base_gas + (tx.data.len() as u64) * 8)
    }

    async fn sign_and_send(&self, tx: ChainTransaction) -> Result<TxReceipt, ExecutionError> {
        let gas_limit = match tx.gas_limit {
            Some(limit) => limit,
            None => self.estimate_gas(&tx).await?,
        };

        if tx.value > Decimal::ZERO {
            let balances = self.balances.read().await;
            let available = balances.get("NATIVE").copied().unwrap_or_default();
            if available < tx.value {
                return Err(ExecutionError::InsufficientBalance {
                    needed: tx.value,
                    available,
                });
            }
        }

        let receipt = TxReceipt {
            tx_hash: format!("0x{}", Uuid::new_v4().simple()),
            gas_used: gas_limit.min(self.base_gas + (tx.data.len() as u64) * 8),
        };
        tracing::info!(tx_hash = %receipt.tx_hash, gas_used = receipt.gas_used, "Simulated transaction confirmed");
        Ok(receipt)
    }

    async fn get_balance(&self, asset: &str) -> Result<Decimal, ExecutionError> {
        let balances = self.balances.read().await;
        Ok(balances.get(asset).copied().unwrap_or_default())
    }
}
