//! Position and trade state
//!
//! The book keys open positions by symbol, which makes the at-most-one
//! position per symbol invariant structural. The trade ledger is
//! append-only; realized figures are always recomputed from it.

use crate::exchange::{MarketData, OrderFill, OrderSide};
use crate::strategy::{SignalAction, TradingSignal};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Direction of an open exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

/// An open position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub side: PositionSide,
    pub entry_price: Decimal,
    /// Refreshed from market data on each cycle
    pub current_price: Decimal,
    pub quantity: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pnl_pct: Decimal,
    pub opened_at: DateTime<Utc>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

impl Position {
    /// Recompute mark-to-market fields against a new price
    fn mark(&mut self, price: Decimal) {
        self.current_price = price;
        self.unrealized_pnl = match self.side {
            PositionSide::Long => (price - self.entry_price) * self.quantity,
            PositionSide::Short => (self.entry_price - price) * self.quantity,
        };
        let notional = self.entry_price * self.quantity;
        self.unrealized_pnl_pct = if notional.is_zero() {
            Decimal::ZERO
        } else {
            self.unrealized_pnl / notional * Decimal::from(100)
        };
    }

    /// True when the mark has crossed the stop-loss or take-profit level
    fn exit_triggered(&self) -> Option<&'static str> {
        match self.side {
            PositionSide::Long => {
                if matches!(self.stop_loss, Some(stop) if self.current_price <= stop) {
                    return Some("stop-loss hit");
                }
                if matches!(self.take_profit, Some(tp) if self.current_price >= tp) {
                    return Some("take-profit hit");
                }
            }
            PositionSide::Short => {
                if matches!(self.stop_loss, Some(stop) if self.current_price >= stop) {
                    return Some("stop-loss hit");
                }
                if matches!(self.take_profit, Some(tp) if self.current_price <= tp) {
                    return Some("take-profit hit");
                }
            }
        }
        None
    }
}

/// An immutable ledger record of a completed fill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
    pub timestamp: DateTime<Utc>,
    /// Present on closing trades only
    pub realized_pnl: Option<Decimal>,
    pub reason: String,
}

/// Owns all Position/Trade state
///
/// Written only by the analysis cycle; readers get copies.
pub struct PositionBook {
    starting_capital: Decimal,
    open: HashMap<String, Position>,
    trades: Vec<Trade>,
}

impl PositionBook {
    pub fn new(starting_capital: Decimal) -> Self {
        Self {
            starting_capital,
            open: HashMap::new(),
            trades: Vec::new(),
        }
    }

    /// Open a position from a fill, recording the opening trade
    ///
    /// Returns `None` if the symbol already has an open position; the
    /// risk manager should have rejected the signal before this point.
    pub fn open_position(
        &mut self,
        fill: &OrderFill,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
        reason: impl Into<String>,
    ) -> Option<Position> {
        if self.open.contains_key(&fill.symbol) {
            return None;
        }

        let side = match fill.side {
            OrderSide::Buy => PositionSide::Long,
            OrderSide::Sell => PositionSide::Short,
        };
        let mut position = Position {
            id: Uuid::new_v4(),
            symbol: fill.symbol.clone(),
            side,
            entry_price: fill.price,
            current_price: fill.price,
            quantity: fill.quantity,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_pct: Decimal::ZERO,
            opened_at: fill.timestamp,
            stop_loss,
            take_profit,
        };
        position.mark(fill.price);

        self.trades.push(Trade {
            id: Uuid::new_v4(),
            symbol: fill.symbol.clone(),
            side: fill.side,
            price: fill.price,
            quantity: fill.quantity,
            fee: fill.fee,
            timestamp: fill.timestamp,
            realized_pnl: None,
            reason: reason.into(),
        });

        self.open.insert(fill.symbol.clone(), position.clone());
        Some(position)
    }

    /// Close a position from a fill, folding it into a closing trade
    pub fn close_position(
        &mut self,
        symbol: &str,
        fill: &OrderFill,
        reason: impl Into<String>,
    ) -> Option<Trade> {
        let position = self.open.remove(symbol)?;

        let gross = match position.side {
            PositionSide::Long => (fill.price - position.entry_price) * position.quantity,
            PositionSide::Short => (position.entry_price - fill.price) * position.quantity,
        };
        let trade = Trade {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side: fill.side,
            price: fill.price,
            quantity: position.quantity,
            fee: fill.fee,
            timestamp: fill.timestamp,
            realized_pnl: Some(gross - fill.fee),
            reason: reason.into(),
        };
        self.trades.push(trade.clone());
        Some(trade)
    }

    /// Refresh marks from the latest market data
    pub fn refresh(&mut self, latest: &HashMap<String, MarketData>) {
        for position in self.open.values_mut() {
            if let Some(data) = latest.get(&position.symbol) {
                position.mark(data.last_price);
            }
        }
    }

    /// Close signals for positions whose stop or take-profit has triggered
    pub fn exit_signals(&self) -> Vec<TradingSignal> {
        self.open
            .values()
            .filter_map(|position| {
                position.exit_triggered().map(|reason| {
                    TradingSignal::new(
                        position.symbol.clone(),
                        SignalAction::Close,
                        Decimal::ONE,
                        reason,
                        "protective_exit",
                    )
                    .with_entry_price(position.current_price)
                })
            })
            .collect()
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.open.contains_key(symbol)
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.open.get(symbol)
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Defensive copy of all open positions
    pub fn positions(&self) -> Vec<Position> {
        self.open.values().cloned().collect()
    }

    /// The append-only trade ledger
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn starting_capital(&self) -> Decimal {
        self.starting_capital
    }

    /// Sum of realized P&L across the ledger
    pub fn realized_pnl(&self) -> Decimal {
        self.trades.iter().filter_map(|t| t.realized_pnl).sum()
    }

    /// Sum of unrealized P&L across open positions
    pub fn unrealized_pnl(&self) -> Decimal {
        self.open.values().map(|p| p.unrealized_pnl).sum()
    }

    /// Equity: starting capital plus realized and unrealized P&L
    pub fn portfolio_value(&self) -> Decimal {
        self.starting_capital + self.realized_pnl() + self.unrealized_pnl()
    }

    /// Realized P&L for trades stamped on the given UTC day
    pub fn realized_pnl_on(&self, day: NaiveDate) -> Decimal {
        self.trades
            .iter()
            .filter(|t| t.timestamp.date_naive() == day)
            .filter_map(|t| t.realized_pnl)
            .sum()
    }
}
