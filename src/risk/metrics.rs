//! Derived portfolio health metrics
//!
//! Always recomputed from the trade ledger and open positions; there is no
//! independent storage that could drift from the ledger. Computation never
//! fails and degrades to zeroed fields on an empty ledger.

use crate::portfolio::PositionBook;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub portfolio_value: Decimal,
    pub daily_pnl: Decimal,
    pub daily_pnl_pct: Decimal,
    pub open_positions: usize,
    /// Largest peak-to-trough equity drop along the realized curve
    pub max_drawdown: Decimal,
    pub sharpe_ratio: Decimal,
    pub win_rate: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub risk_reward_ratio: Decimal,
}

impl RiskMetrics {
    /// All-zero metrics for an empty ledger
    pub fn zeroed(portfolio_value: Decimal) -> Self {
        Self {
            portfolio_value,
            daily_pnl: Decimal::ZERO,
            daily_pnl_pct: Decimal::ZERO,
            open_positions: 0,
            max_drawdown: Decimal::ZERO,
            sharpe_ratio: Decimal::ZERO,
            win_rate: Decimal::ZERO,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            risk_reward_ratio: Decimal::ZERO,
        }
    }

    /// Derive metrics from the book
    pub fn compute(book: &PositionBook, now: DateTime<Utc>) -> Self {
        let portfolio_value = book.portfolio_value();
        let realized: Vec<Decimal> = book
            .trades()
            .iter()
            .filter_map(|t| t.realized_pnl)
            .collect();

        if book.trades().is_empty() && book.open_count() == 0 {
            return Self::zeroed(portfolio_value);
        }

        let daily_pnl = book.realized_pnl_on(now.date_naive()) + book.unrealized_pnl();
        let day_start = portfolio_value - daily_pnl;
        let daily_pnl_pct = if day_start.is_zero() {
            Decimal::ZERO
        } else {
            daily_pnl / day_start * Decimal::from(100)
        };

        let wins: Vec<Decimal> = realized.iter().copied().filter(|p| *p > Decimal::ZERO).collect();
        let losses: Vec<Decimal> = realized.iter().copied().filter(|p| *p < Decimal::ZERO).collect();

        let win_rate = if realized.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from(wins.len() as u64) / Decimal::from(realized.len() as u64)
        };
        let avg_win = average(&wins);
        let avg_loss = average(&losses).abs();
        let risk_reward_ratio = if avg_loss.is_zero() {
            Decimal::ZERO
        } else {
            avg_win / avg_loss
        };

        Self {
            portfolio_value,
            daily_pnl,
            daily_pnl_pct,
            open_positions: book.open_count(),
            max_drawdown: max_drawdown(book.starting_capital(), &realized),
            sharpe_ratio: sharpe(&realized),
            win_rate,
            avg_win,
            avg_loss,
            risk_reward_ratio,
        }
    }
}

fn average(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().copied().sum::<Decimal>() / Decimal::from(values.len() as u64)
}

/// Peak-to-trough drop as a fraction of the peak, over the realized curve
fn max_drawdown(starting_capital: Decimal, realized: &[Decimal]) -> Decimal {
    let mut equity = starting_capital;
    let mut peak = starting_capital;
    let mut worst = Decimal::ZERO;

    for pnl in realized {
        equity += *pnl;
        if equity > peak {
            peak = equity;
        } else if !peak.is_zero() {
            worst = worst.max((peak - equity) / peak);
        }
    }
    worst
}

/// Per-trade Sharpe ratio; zero with fewer than two closed trades
fn sharpe(realized: &[Decimal]) -> Decimal {
    if realized.len() < 2 {
        return Decimal::ZERO;
    }

    // Mean/stddev in f64; Decimal has no sqrt
    let values: Vec<f64> = realized
        .iter()
        .map(|p| f64::try_from(*p).unwrap_or(0.0))
        .collect();
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        return Decimal::ZERO;
    }
    Decimal::try_from(mean / std_dev).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{OrderFill, OrderSide};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn fill(symbol: &str, side: OrderSide, price: Decimal) -> OrderFill {
        OrderFill {
            order_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side,
            price,
            quantity: dec!(10),
            fee: dec!(0),
            timestamp: Utc::now(),
        }
    }

    fn round_trip(book: &mut PositionBook, symbol: &str, entry: Decimal, exit: Decimal) {
        book.open_position(&fill(symbol, OrderSide::Buy, entry), None, None, "entry");
        book.close_position(symbol, &fill(symbol, OrderSide::Sell, exit), "exit");
    }

    #[test]
    fn test_empty_ledger_is_all_zero() {
        let book = PositionBook::new(dec!(10000));
        let metrics = RiskMetrics::compute(&book, Utc::now());
        assert_eq!(metrics.portfolio_value, dec!(10000));
        assert_eq!(metrics.daily_pnl, Decimal::ZERO);
        assert_eq!(metrics.open_positions, 0);
        assert_eq!(metrics.max_drawdown, Decimal::ZERO);
        assert_eq!(metrics.sharpe_ratio, Decimal::ZERO);
        assert_eq!(metrics.win_rate, Decimal::ZERO);
        assert_eq!(metrics.risk_reward_ratio, Decimal::ZERO);
    }

    #[test]
    fn test_win_rate_and_averages() {
        let mut book = PositionBook::new(dec!(10000));
        round_trip(&mut book, "A/USDT", dec!(100), dec!(110)); // +100
        round_trip(&mut book, "B/USDT", dec!(100), dec!(104)); // +40
        round_trip(&mut book, "C/USDT", dec!(100), dec!(95)); // -50

        let metrics = RiskMetrics::compute(&book, Utc::now());
        assert_eq!(metrics.win_rate.round_dp(4), dec!(0.6667));
        assert_eq!(metrics.avg_win, dec!(70));
        assert_eq!(metrics.avg_loss, dec!(50));
        assert_eq!(metrics.risk_reward_ratio, dec!(1.4));
        assert_eq!(metrics.portfolio_value, dec!(10090));
    }

    #[test]
    fn test_max_drawdown_from_curve() {
        // 10000 -> 10100 (peak) -> 9900 -> 10000
        let realized = vec![dec!(100), dec!(-200), dec!(100)];
        let dd = max_drawdown(dec!(10000), &realized);
        assert_eq!(dd.round_dp(6), (dec!(200) / dec!(10100)).round_dp(6));
    }

    #[test]
    fn test_sharpe_zero_for_constant_results() {
        let realized = vec![dec!(10), dec!(10), dec!(10)];
        assert_eq!(sharpe(&realized), Decimal::ZERO);
    }

    #[test]
    fn test_sharpe_positive_for_positive_mean() {
        let realized = vec![dec!(10), dec!(20), dec!(15), dec!(5)];
        assert!(sharpe(&realized) > Decimal::ZERO);
    }

    #[test]
    fn test_daily_pnl_includes_unrealized() {
        let mut book = PositionBook::new(dec!(10000));
        book.open_position(&fill("A/USDT", OrderSide::Buy, dec!(100)), None, None, "entry");

        let mut latest = std::collections::HashMap::new();
        latest.insert(
            "A/USDT".to_string(),
            crate::exchange::MarketData {
                symbol: "A/USDT".to_string(),
                last_price: dec!(105),
                volume: dec!(1),
                bid: dec!(105),
                ask: dec!(105),
                high_24h: dec!(105),
                low_24h: dec!(100),
                change_24h: dec!(0.05),
                timestamp: Utc::now(),
            },
        );
        book.refresh(&latest);

        let metrics = RiskMetrics::compute(&book, Utc::now());
        assert_eq!(metrics.daily_pnl, dec!(50));
        assert_eq!(metrics.open_positions, 1);
    }

    #[test]
    fn test_metrics_roundtrip() {
        let metrics = RiskMetrics::zeroed(dec!(12345.6789));
        let json = serde_json::to_string(&metrics).unwrap();
        let back: RiskMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.portfolio_value, metrics.portfolio_value);
    }
}
