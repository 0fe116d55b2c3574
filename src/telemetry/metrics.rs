//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::Decimal;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Start the Prometheus scrape endpoint
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;
    tracing::info!(port, "Metrics exporter listening");
    Ok(())
}

fn to_f64(value: Decimal) -> f64 {
    f64::try_from(value).unwrap_or(0.0)
}

/// Record portfolio gauges after each cycle
pub fn record_portfolio(
    portfolio_value: Decimal,
    unrealized_pnl: Decimal,
    realized_pnl: Decimal,
    open_positions: usize,
) {
    metrics::gauge!("quantpulse_portfolio_value_usd").set(to_f64(portfolio_value));
    metrics::gauge!("quantpulse_unrealized_pnl_usd").set(to_f64(unrealized_pnl));
    metrics::gauge!("quantpulse_realized_pnl_usd").set(to_f64(realized_pnl));
    metrics::gauge!("quantpulse_open_positions").set(open_positions as f64);
}

/// Record one completed analysis cycle
pub fn record_cycle(elapsed: Duration) {
    metrics::counter!("quantpulse_analysis_cycles_total").increment(1);
    metrics::histogram!("quantpulse_analysis_cycle_seconds").record(elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_to_f64() {
        assert_eq!(to_f64(dec!(1.5)), 1.5);
        assert_eq!(to_f64(dec!(0)), 0.0);
    }

    #[test]
    fn test_recording_without_exporter_is_noop() {
        // No global recorder installed: macros must not panic
        record_portfolio(dec!(10000), dec!(5), dec!(-3), 2);
        record_cycle(Duration::from_millis(12));
    }
}
