//! Telemetry
//!
//! Logging and Prometheus metrics.

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::{init_metrics, record_cycle, record_portfolio};

use crate::config::TelemetryConfig;

/// Guard that pins telemetry for the process lifetime
pub struct TelemetryGuard {
    _priv: (),
}

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    init_logging(&config.log_level)?;
    init_metrics(config.metrics_port)?;
    Ok(TelemetryGuard { _priv: () })
}
