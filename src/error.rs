//! Component error taxonomy.
//!
//! Each subsystem surfaces a focused error type rather than a single
//! crate-wide enum, so callers match on exactly the failures they can
//! handle. All types implement `std::error::Error` via `thiserror`.

use rust_decimal::Decimal;
use thiserror::Error;

/// Configuration load / validation failures. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Cross-field validation failed.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file was not valid TOML / did not match the schema.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Market / sentiment data fetch failures.
#[derive(Debug, Error)]
pub enum DataFetchError {
    /// The upstream HTTP call itself failed (transport, timeout, DNS, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The exchange returned a non-success status.
    #[error("exchange rejected request with status {status}: {body}")]
    ExchangeRejected { status: u16, body: String },

    /// The response body could not be parsed into the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Order / transaction execution failures.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The venue rejected the order.
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// Network / transport failure talking to the venue.
    #[error("network error: {0}")]
    Network(String),

    /// A competing order for the same symbol is still in flight.
    #[error("execution busy for {0}")]
    Busy(String),

    /// On-chain gas estimation failed.
    #[error("gas estimation failed: {0}")]
    GasEstimation(String),

    /// Insufficient balance to cover the transaction.
    #[error("insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },
}

/// AI decision could not be produced.
#[derive(Debug, Error)]
pub enum DecisionUnavailable {
    /// Inference exceeded the configured timeout (seconds).
    #[error("AI decision timed out after {0}s")]
    Timeout(u64),

    /// Inference returned an unparseable or empty response.
    #[error("AI decision malformed: {0}")]
    Malformed(String),
}

/// A deterministic strategy failed to produce signals.
#[derive(Debug, Error)]
#[error("strategy `{strategy}` failed: {reason}")]
pub struct StrategyError {
    /// Name of the strategy that failed.
    pub strategy: String,
    /// Human-readable reason.
    pub reason: String,
}

impl From<reqwest::Error> for DecisionUnavailable {
    fn from(e: reqwest::Error) -> Self {
        DecisionUnavailable::Malformed(e.to_string())
    }
}

impl StrategyError {
    /// Construct a new strategy error.
    pub fn new(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }
}
