//! Risk management
//!
//! Filters and sizes candidate signals against portfolio-level limits and
//! derives portfolio health metrics from the trade ledger.

mod manager;
mod metrics;

pub use manager::{DailyLossTracker, RiskManager};
pub use metrics::RiskMetrics;
