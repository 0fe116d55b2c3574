//! Signal risk evaluation
//!
//! Candidate signals pass through, in order: open-position screening,
//! size clamping, the open-position cap, the daily-loss circuit breaker,
//! and same-symbol conflict resolution. Rejections are by design and are
//! logged at info level, never raised.

use super::metrics::RiskMetrics;
use crate::config::RiskConfig;
use crate::portfolio::PositionBook;
use crate::strategy::{SignalAction, TradingSignal};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Tracks equity against the day-start value for the loss circuit breaker
///
/// The breaker rejects new openings for the remainder of the UTC day once
/// the cumulative loss exceeds the limit, and resets at the next boundary.
pub struct DailyLossTracker {
    day: NaiveDate,
    day_start_equity: Decimal,
    current_equity: Decimal,
}

impl DailyLossTracker {
    pub fn new(initial_equity: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            day: now.date_naive(),
            day_start_equity: initial_equity,
            current_equity: initial_equity,
        }
    }

    /// Update with the latest equity, rolling the day boundary if crossed
    pub fn update(&mut self, now: DateTime<Utc>, equity: Decimal) {
        let today = now.date_naive();
        if today != self.day {
            self.day = today;
            self.day_start_equity = self.current_equity;
        }
        self.current_equity = equity;
    }

    /// Today's loss as a positive fraction of day-start equity
    pub fn daily_loss_fraction(&self) -> Decimal {
        if self.day_start_equity.is_zero() {
            return Decimal::ZERO;
        }
        let pnl = self.current_equity - self.day_start_equity;
        if pnl >= Decimal::ZERO {
            Decimal::ZERO
        } else {
            -pnl / self.day_start_equity
        }
    }

    /// True when today's loss exceeds the limit
    pub fn breaker_tripped(&self, max_daily_loss: Decimal) -> bool {
        self.daily_loss_fraction() > max_daily_loss
    }
}

/// Portfolio-level signal filter and sizer
pub struct RiskManager {
    config: RiskConfig,
    daily: DailyLossTracker,
}

impl RiskManager {
    pub fn new(config: RiskConfig, initial_equity: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            config,
            daily: DailyLossTracker::new(initial_equity, now),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Filter candidates down to the approved set
    pub fn evaluate(
        &mut self,
        candidates: Vec<TradingSignal>,
        book: &PositionBook,
        now: DateTime<Utc>,
    ) -> Vec<TradingSignal> {
        self.daily.update(now, book.portfolio_value());
        let breaker = self.daily.breaker_tripped(self.config.max_daily_loss);
        if breaker {
            tracing::warn!(
                loss = %self.daily.daily_loss_fraction(),
                "Daily loss limit exceeded, rejecting new openings until tomorrow"
            );
        }
        let open_cap_reached = book.open_count() >= self.config.max_open_positions;

        let mut survivors: Vec<TradingSignal> = Vec::new();
        for mut signal in candidates {
            match signal.action {
                SignalAction::Hold => continue,
                SignalAction::Close => {
                    // Close is only meaningful against an open position
                    if book.has_position(&signal.symbol) {
                        survivors.push(signal);
                    }
                    continue;
                }
                SignalAction::Buy | SignalAction::Sell => {}
            }

            if book.has_position(&signal.symbol) {
                tracing::info!(
                    symbol = %signal.symbol,
                    strategy = %signal.strategy,
                    "Rejected: position already open"
                );
                continue;
            }

            // Clamp the requested fraction to the per-position cap
            let requested = signal
                .position_size
                .unwrap_or(self.config.default_position_size);
            let sized = requested.min(self.config.max_position_size);
            if sized <= Decimal::ZERO {
                tracing::info!(symbol = %signal.symbol, "Rejected: no valid position size");
                continue;
            }
            signal.position_size = Some(sized);

            if open_cap_reached {
                tracing::info!(
                    symbol = %signal.symbol,
                    open = book.open_count(),
                    "Rejected: max open positions reached"
                );
                continue;
            }

            if breaker {
                tracing::info!(symbol = %signal.symbol, "Rejected: daily loss circuit breaker");
                continue;
            }

            survivors.push(signal);
        }

        let resolved = Self::resolve_conflicts(survivors);

        // Never let a multi-signal cycle overshoot the cap
        let mut slots = self
            .config
            .max_open_positions
            .saturating_sub(book.open_count());
        resolved
            .into_iter()
            .filter(|signal| {
                if !signal.is_opening() {
                    return true;
                }
                if slots == 0 {
                    tracing::info!(symbol = %signal.symbol, "Rejected: no position slots left this cycle");
                    return false;
                }
                slots -= 1;
                true
            })
            .collect()
    }

    /// Resolve same-symbol conflicts by highest confidence
    ///
    /// An exact confidence tie between opposing actions yields no action
    /// for that symbol, avoiding oscillation. Close signals dedup to one
    /// per symbol.
    fn resolve_conflicts(signals: Vec<TradingSignal>) -> Vec<TradingSignal> {
        let mut by_symbol: HashMap<String, Vec<TradingSignal>> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for signal in signals {
            if !by_symbol.contains_key(&signal.symbol) {
                order.push(signal.symbol.clone());
            }
            by_symbol.entry(signal.symbol.clone()).or_default().push(signal);
        }

        let mut resolved = Vec::new();
        for symbol in order {
            let group = by_symbol.remove(&symbol).expect("grouped above");

            let (closes, openings): (Vec<_>, Vec<_>) = group
                .into_iter()
                .partition(|s| s.action == SignalAction::Close);
            if let Some(close) = closes.into_iter().next() {
                resolved.push(close);
            }

            if openings.is_empty() {
                continue;
            }
            let best = openings
                .iter()
                .map(|s| s.confidence)
                .max()
                .expect("non-empty");
            let mut top: Vec<TradingSignal> = openings
                .into_iter()
                .filter(|s| s.confidence == best)
                .collect();

            let contested = top.iter().any(|s| s.action != top[0].action);
            if contested {
                tracing::info!(symbol = %symbol, "Conflicting signals tied on confidence, no action");
                continue;
            }
            resolved.push(top.swap_remove(0));
        }
        resolved
    }

    /// Pure read of portfolio health; never fails
    pub fn risk_metrics(&self, book: &PositionBook, now: DateTime<Utc>) -> RiskMetrics {
        RiskMetrics::compute(book, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{OrderFill, OrderSide};
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn config() -> RiskConfig {
        RiskConfig {
            max_position_size: dec!(0.1),
            max_open_positions: 3,
            max_daily_loss: dec!(0.05),
            stop_loss_pct: dec!(0.05),
            take_profit_pct: dec!(0.10),
            default_position_size: dec!(0.05),
        }
    }

    fn manager() -> RiskManager {
        RiskManager::new(config(), dec!(10000), Utc::now())
    }

    fn buy(symbol: &str, confidence: Decimal, size: Option<Decimal>) -> TradingSignal {
        let mut signal =
            TradingSignal::new(symbol, SignalAction::Buy, confidence, "test", "momentum");
        signal.position_size = size;
        signal
    }

    fn sell(symbol: &str, confidence: Decimal) -> TradingSignal {
        TradingSignal::new(symbol, SignalAction::Sell, confidence, "test", "mean_reversion")
    }

    fn open_fill(symbol: &str) -> OrderFill {
        OrderFill {
            order_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            price: dec!(100),
            quantity: dec!(1),
            fee: dec!(0.1),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_clean_buy_approved_unchanged() {
        let mut rm = manager();
        let book = PositionBook::new(dec!(10000));
        let approved = rm.evaluate(
            vec![buy("BTC/USDT", dec!(0.9), Some(dec!(0.1)))],
            &book,
            Utc::now(),
        );
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].position_size, Some(dec!(0.1)));
    }

    #[test]
    fn test_open_position_blocks_new_opening() {
        let mut rm = manager();
        let mut book = PositionBook::new(dec!(10000));
        book.open_position(&open_fill("BTC/USDT"), None, None, "entry");

        let approved = rm.evaluate(
            vec![buy("BTC/USDT", dec!(0.9), Some(dec!(0.05)))],
            &book,
            Utc::now(),
        );
        assert!(approved.is_empty());
    }

    #[test]
    fn test_close_passes_for_open_position() {
        let mut rm = manager();
        let mut book = PositionBook::new(dec!(10000));
        book.open_position(&open_fill("BTC/USDT"), None, None, "entry");

        let close = TradingSignal::new("BTC/USDT", SignalAction::Close, dec!(1), "exit", "x");
        let approved = rm.evaluate(vec![close], &book, Utc::now());
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].action, SignalAction::Close);
    }

    #[test]
    fn test_close_without_position_dropped() {
        let mut rm = manager();
        let book = PositionBook::new(dec!(10000));
        let close = TradingSignal::new("BTC/USDT", SignalAction::Close, dec!(1), "exit", "x");
        assert!(rm.evaluate(vec![close], &book, Utc::now()).is_empty());
    }

    #[test]
    fn test_oversized_signal_clamped_to_cap() {
        let mut rm = manager();
        let book = PositionBook::new(dec!(10000));
        let approved = rm.evaluate(
            vec![buy("BTC/USDT", dec!(0.9), Some(dec!(0.5)))],
            &book,
            Utc::now(),
        );
        assert_eq!(approved.len(), 1);
        // Never more than max_position_size
        assert_eq!(approved[0].position_size, Some(dec!(0.1)));
    }

    #[test]
    fn test_missing_size_gets_default() {
        let mut rm = manager();
        let book = PositionBook::new(dec!(10000));
        let approved = rm.evaluate(vec![buy("BTC/USDT", dec!(0.9), None)], &book, Utc::now());
        assert_eq!(approved[0].position_size, Some(dec!(0.05)));
    }

    #[test]
    fn test_max_open_positions_rejects_openings() {
        let mut rm = manager();
        let mut book = PositionBook::new(dec!(10000));
        for symbol in ["A/USDT", "B/USDT", "C/USDT"] {
            book.open_position(&open_fill(symbol), None, None, "entry");
        }

        let approved = rm.evaluate(
            vec![buy("BTC/USDT", dec!(0.9), Some(dec!(0.1)))],
            &book,
            Utc::now(),
        );
        assert!(approved.is_empty());
    }

    #[test]
    fn test_cycle_cannot_overshoot_position_cap() {
        let mut rm = manager();
        let mut book = PositionBook::new(dec!(10000));
        book.open_position(&open_fill("A/USDT"), None, None, "entry");
        book.open_position(&open_fill("B/USDT"), None, None, "entry");

        // Two candidates, one remaining slot
        let approved = rm.evaluate(
            vec![
                buy("C/USDT", dec!(0.9), Some(dec!(0.05))),
                buy("D/USDT", dec!(0.8), Some(dec!(0.05))),
            ],
            &book,
            Utc::now(),
        );
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].symbol, "C/USDT");
    }

    #[test]
    fn test_daily_breaker_rejects_openings() {
        let now = Utc::now();
        let mut rm = RiskManager::new(config(), dec!(10000), now);
        let book = PositionBook::new(dec!(9000)); // 10% down on the day

        let approved = rm.evaluate(
            vec![buy("BTC/USDT", dec!(0.9), Some(dec!(0.05)))],
            &book,
            now,
        );
        assert!(approved.is_empty());
    }

    #[test]
    fn test_daily_breaker_resets_next_day() {
        let now = Utc::now();
        let mut rm = RiskManager::new(config(), dec!(10000), now);
        let book = PositionBook::new(dec!(9000));

        assert!(rm
            .evaluate(vec![buy("BTC/USDT", dec!(0.9), None)], &book, now)
            .is_empty());

        // Next day the 9000 equity becomes the new baseline
        let tomorrow = now + Duration::days(1);
        let approved = rm.evaluate(vec![buy("BTC/USDT", dec!(0.9), None)], &book, tomorrow);
        assert_eq!(approved.len(), 1);
    }

    #[test]
    fn test_breaker_still_allows_closes() {
        let now = Utc::now();
        let mut rm = RiskManager::new(config(), dec!(10000), now);
        let mut book = PositionBook::new(dec!(9000));
        book.open_position(&open_fill("BTC/USDT"), None, None, "entry");

        let close = TradingSignal::new("BTC/USDT", SignalAction::Close, dec!(1), "exit", "x");
        let approved = rm.evaluate(vec![close], &book, now);
        assert_eq!(approved.len(), 1);
    }

    #[test]
    fn test_conflict_higher_confidence_wins() {
        let mut rm = manager();
        let book = PositionBook::new(dec!(10000));
        let approved = rm.evaluate(
            vec![
                buy("BTC/USDT", dec!(0.9), Some(dec!(0.05))),
                sell("BTC/USDT", dec!(0.6)),
            ],
            &book,
            Utc::now(),
        );
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].action, SignalAction::Buy);
    }

    #[test]
    fn test_conflict_tie_resolves_to_no_action() {
        let mut rm = manager();
        let book = PositionBook::new(dec!(10000));
        let approved = rm.evaluate(
            vec![
                buy("BTC/USDT", dec!(0.7), Some(dec!(0.05))),
                sell("BTC/USDT", dec!(0.7)),
            ],
            &book,
            Utc::now(),
        );
        assert!(approved.is_empty());
    }

    #[test]
    fn test_same_action_duplicates_collapse_to_one() {
        let mut rm = manager();
        let book = PositionBook::new(dec!(10000));
        let approved = rm.evaluate(
            vec![
                buy("BTC/USDT", dec!(0.7), Some(dec!(0.05))),
                buy("BTC/USDT", dec!(0.7), Some(dec!(0.05))),
            ],
            &book,
            Utc::now(),
        );
        assert_eq!(approved.len(), 1);
    }

    #[test]
    fn test_hold_signals_dropped() {
        let mut rm = manager();
        let book = PositionBook::new(dec!(10000));
        let hold = TradingSignal::new("BTC/USDT", SignalAction::Hold, dec!(0.9), "wait", "x");
        assert!(rm.evaluate(vec![hold], &book, Utc::now()).is_empty());
    }

    #[test]
    fn test_daily_tracker_loss_fraction() {
        let now = Utc::now();
        let mut tracker = DailyLossTracker::new(dec!(10000), now);
        tracker.update(now, dec!(9400));
        assert_eq!(tracker.daily_loss_fraction(), dec!(0.06));
        assert!(tracker.breaker_tripped(dec!(0.05)));
        assert!(!tracker.breaker_tripped(dec!(0.10)));
    }

    #[test]
    fn test_daily_tracker_gain_is_zero_loss() {
        let now = Utc::now();
        let mut tracker = DailyLossTracker::new(dec!(10000), now);
        tracker.update(now, dec!(10500));
        assert_eq!(tracker.daily_loss_fraction(), Decimal::ZERO);
    }
}
