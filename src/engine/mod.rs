//! Trading engine orchestrator
//!
//! Owns Position/Trade state and runs the recurring analysis cycle:
//! consolidate cached data, run strategies and the AI engine, filter
//! through risk, execute approved signals, update the book, and emit
//! events. The cycle lock guarantees cycles never overlap; the analysis
//! cycle is the only writer of book state.

use crate::ai::AIDecisionEngine;
use crate::analysis::{MarketAnalysis, TechnicalAnalysisEngine};
use crate::collector::{MarketDataCollector, SentimentCollector};
use crate::config::Config;
use crate::error::ExecutionError;
use crate::events::{publish, EngineEvent};
use crate::exchange::{MarketData, OrderSide};
use crate::execution::ExecutionRouter;
use crate::portfolio::{Position, PositionBook, PositionSide, Trade};
use crate::risk::{RiskManager, RiskMetrics};
use crate::strategy::{SignalAction, StrategySet, TradingSignal};
use crate::telemetry;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, RwLock};

/// How many snapshots per symbol the analysis window keeps
const HISTORY_LIMIT: usize = 50;

/// Engine lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// The orchestrator
pub struct TradingEngine {
    config: Config,
    market: MarketDataCollector,
    sentiment: SentimentCollector,
    strategies: StrategySet,
    ai: Option<AIDecisionEngine>,
    risk: Mutex<RiskManager>,
    router: ExecutionRouter,
    book: RwLock<PositionBook>,
    /// Rolling per-symbol snapshot windows fed from the collector cache
    history: RwLock<HashMap<String, Vec<MarketData>>>,
    state: RwLock<EngineState>,
    /// Held for the duration of a cycle; never contended by design
    cycle_lock: Mutex<()>,
    pending_force: AtomicBool,
    cycle_counter: AtomicU64,
    events: broadcast::Sender<EngineEvent>,
    shutdown: watch::Sender<bool>,
}

impl TradingEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        market: MarketDataCollector,
        sentiment: SentimentCollector,
        strategies: StrategySet,
        ai: Option<AIDecisionEngine>,
        router: ExecutionRouter,
        events: broadcast::Sender<EngineEvent>,
    ) -> Arc<Self> {
        let initial_capital = config.engine.initial_capital;
        let risk = RiskManager::new(config.risk.clone(), initial_capital, Utc::now());
        let (shutdown, _) = watch::channel(false);

        Arc::new(Self {
            config,
            market,
            sentiment,
            strategies,
            ai,
            risk: Mutex::new(risk),
            router,
            book: RwLock::new(PositionBook::new(initial_capital)),
            history: RwLock::new(HashMap::new()),
            state: RwLock::new(EngineState::Stopped),
            cycle_lock: Mutex::new(()),
            pending_force: AtomicBool::new(false),
            cycle_counter: AtomicU64::new(0),
            events,
            shutdown,
        })
    }

    /// Subscribe to the engine event stream
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }

    /// Start collectors and the recurring analysis cycle
    ///
    /// Fails only when market metadata loading fails; that is a
    /// configuration problem and propagates to the process boundary.
    pub async fn start(self: &Arc<Self>) -> anyhow::Result<()> {
        {
            let mut state = self.state.write().await;
            if *state != EngineState::Stopped {
                tracing::warn!(?state, "start() ignored, engine not stopped");
                return Ok(());
            }
            *state = EngineState::Starting;
        }

        if let Err(e) = self.market.start().await {
            *self.state.write().await = EngineState::Stopped;
            return Err(anyhow::anyhow!("market metadata load failed: {e}"));
        }
        self.sentiment.start().await;

        *self.state.write().await = EngineState::Running;
        tracing::info!(
            symbols = ?self.config.engine.symbols,
            interval_secs = self.config.engine.analysis_interval_secs,
            "Trading engine running"
        );

        let engine = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(
                engine.config.engine.analysis_interval_secs,
            ));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // the immediate first tick; cycles start one interval in
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        engine.run_cycle().await;
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            tracing::debug!("Analysis scheduler stopping");
                            break;
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// Cancel schedules and wait for any in-flight cycle to finish
    pub async fn stop(&self) {
        {
            let mut state = self.state.write().await;
            if *state != EngineState::Running {
                return;
            }
            *state = EngineState::Stopping;
        }

        let _ = self.shutdown.send(true);
        self.market.stop();
        self.sentiment.stop();

        // Acquiring the cycle lock means no cycle is mid-write
        let _guard = self.cycle_lock.lock().await;
        *self.state.write().await = EngineState::Stopped;
        tracing::info!("Trading engine stopped");
    }

    /// Run a cycle now, or queue one if a cycle is already in progress
    pub async fn force_analysis(&self) {
        self.run_cycle().await;
    }

    /// Run one analysis cycle unless one is already running
    ///
    /// A concurrent call marks a pending forced cycle instead of starting
    /// a second one; the running cycle picks it up on completion.
    async fn run_cycle(&self) {
        let Ok(guard) = self.cycle_lock.try_lock() else {
            self.pending_force.store(true, Ordering::SeqCst);
            tracing::debug!("Cycle already in progress, queued one forced cycle");
            return;
        };

        loop {
            if *self.state.read().await != EngineState::Running {
                break;
            }
            self.cycle_inner().await;
            if !self.pending_force.swap(false, Ordering::SeqCst) {
                break;
            }
            tracing::debug!("Running queued forced cycle");
        }
        drop(guard);
    }

    async fn cycle_inner(&self) {
        let cycle = self.cycle_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let started = std::time::Instant::now();
        let latest = self.market.all_latest().await;

        if latest.is_empty() {
            publish(
                &self.events,
                EngineEvent::AnalysisError {
                    message: "no market data available".to_string(),
                    timestamp: Utc::now(),
                },
            );
            return;
        }

        // Mark open positions and extend the analysis windows
        {
            let mut book = self.book.write().await;
            book.refresh(&latest);
        }
        {
            let mut history = self.history.write().await;
            for (symbol, data) in &latest {
                let window = history.entry(symbol.clone()).or_default();
                window.push(data.clone());
                if window.len() > HISTORY_LIMIT {
                    window.remove(0);
                }
            }
        }

        // Protective exits first: they free slots within the same cycle
        let mut candidates: Vec<TradingSignal> = {
            let book = self.book.read().await;
            book.exit_signals()
        };

        for symbol in &self.config.engine.symbols {
            let analysis = self.build_analysis(symbol).await;
            publish(
                &self.events,
                EngineEvent::TechnicalUpdate {
                    indicators: analysis.indicators.clone(),
                    timestamp: Utc::now(),
                },
            );

            candidates.extend(self.strategies.run(&analysis));

            if let Some(ai) = &self.ai {
                match ai.decide(&analysis).await {
                    Ok(decision) => {
                        tracing::debug!(
                            symbol = %symbol,
                            condition = ?decision.market_condition,
                            confidence = %decision.confidence,
                            "AI decision received"
                        );
                        candidates.extend(decision.signals);
                    }
                    Err(e) => {
                        // Strategy-only cycle; not a cycle failure
                        tracing::warn!(symbol = %symbol, error = %e, "AI decision unavailable");
                    }
                }
            }
        }

        let candidate_count = candidates.len();
        let approved = {
            let book = self.book.read().await;
            let mut risk = self.risk.lock().await;
            risk.evaluate(candidates, &book, Utc::now())
        };
        let approved_count = approved.len();

        let mut executed = 0usize;
        for signal in approved {
            match self.execute_signal(&signal).await {
                Ok(trade) => {
                    executed += 1;
                    publish(
                        &self.events,
                        EngineEvent::TradeExecuted {
                            trade,
                            timestamp: Utc::now(),
                        },
                    );
                }
                Err(e) => {
                    // Nothing recorded; the symbol is eligible next cycle
                    tracing::warn!(symbol = %signal.symbol, error = %e, "Execution failed");
                }
            }
        }

        {
            let book = self.book.read().await;
            telemetry::record_portfolio(
                book.portfolio_value(),
                book.unrealized_pnl(),
                book.realized_pnl(),
                book.open_count(),
            );
        }
        telemetry::record_cycle(started.elapsed());

        publish(
            &self.events,
            EngineEvent::AnalysisComplete {
                cycle,
                candidate_signals: candidate_count,
                approved_signals: approved_count,
                executed_trades: executed,
                timestamp: Utc::now(),
            },
        );
    }

    /// Assemble the symbol's consolidated snapshot for this cycle
    async fn build_analysis(&self, symbol: &str) -> MarketAnalysis {
        let recent = self
            .history
            .read()
            .await
            .get(symbol)
            .cloned()
            .unwrap_or_default();

        let indicators = match self
            .market
            .fetch_ohlcv(
                symbol,
                &self.config.collector.ohlcv_timeframe,
                self.config.collector.candle_limit,
            )
            .await
        {
            Ok(candles) => TechnicalAnalysisEngine::compute(symbol, &candles),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "OHLCV fetch failed, neutral indicators");
                crate::analysis::TechnicalIndicators::neutral(symbol)
            }
        };

        MarketAnalysis {
            symbol: symbol.to_string(),
            recent,
            indicators,
            sentiment: self.sentiment.latest(symbol).await,
            news: self.sentiment.latest_news().await,
        }
    }

    /// Execute one approved signal and commit the result to the book
    async fn execute_signal(&self, signal: &TradingSignal) -> Result<Trade, ExecutionError> {
        let (side, quantity, reference) = self.resolve_order(signal).await?;

        let fill = self
            .router
            .execute(signal, side, quantity, reference)
            .await?;

        let mut book = self.book.write().await;
        let trade = if signal.action == SignalAction::Close {
            book.close_position(&signal.symbol, &fill, signal.reason.clone())
                .ok_or_else(|| {
                    ExecutionError::OrderRejected(format!(
                        "no open position for {} at commit",
                        signal.symbol
                    ))
                })?
        } else {
            let (stop_loss, take_profit) = self.protective_levels(signal, fill.price);
            book.open_position(&fill, stop_loss, take_profit, signal.reason.clone())
                .ok_or_else(|| {
                    ExecutionError::OrderRejected(format!(
                        "position already open for {} at commit",
                        signal.symbol
                    ))
                })?;
            book.trades().last().cloned().expect("opening trade recorded")
        };
        Ok(trade)
    }

    /// Resolve side, quantity, and reference price for an approved signal
    async fn resolve_order(
        &self,
        signal: &TradingSignal,
    ) -> Result<(OrderSide, Decimal, Decimal), ExecutionError> {
        let latest_price = self
            .market
            .latest(&signal.symbol)
            .await
            .map(|d| d.last_price);

        if signal.action == SignalAction::Close {
            let book = self.book.read().await;
            let position = book.position(&signal.symbol).ok_or_else(|| {
                ExecutionError::OrderRejected(format!("no open position for {}", signal.symbol))
            })?;
            let side = match position.side {
                PositionSide::Long => OrderSide::Sell,
                PositionSide::Short => OrderSide::Buy,
            };
            let reference = latest_price.unwrap_or(position.current_price);
            return Ok((side, position.quantity, reference));
        }

        let side = match signal.action {
            SignalAction::Buy => OrderSide::Buy,
            SignalAction::Sell => OrderSide::Sell,
            _ => {
                return Err(ExecutionError::OrderRejected(
                    "non-executable action".to_string(),
                ))
            }
        };
        let reference = signal
            .entry_price
            .or(latest_price)
            .ok_or_else(|| ExecutionError::OrderRejected("no reference price".to_string()))?;
        if reference <= Decimal::ZERO {
            return Err(ExecutionError::OrderRejected(
                "non-positive reference price".to_string(),
            ));
        }

        let fraction = signal
            .position_size
            .unwrap_or(self.config.risk.default_position_size);
        let notional = self.book.read().await.portfolio_value() * fraction;
        Ok((side, notional / reference, reference))
    }

    /// Stop-loss / take-profit levels from config when the signal has none
    fn protective_levels(
        &self,
        signal: &TradingSignal,
        fill_price: Decimal,
    ) -> (Option<Decimal>, Option<Decimal>) {
        let stop_pct = self.config.risk.stop_loss_pct;
        let tp_pct = self.config.risk.take_profit_pct;

        let (default_stop, default_tp) = match signal.action {
            SignalAction::Buy => (
                fill_price * (Decimal::ONE - stop_pct),
                fill_price * (Decimal::ONE + tp_pct),
            ),
            _ => (
                fill_price * (Decimal::ONE + stop_pct),
                fill_price * (Decimal::ONE - tp_pct),
            ),
        };
        (
            Some(signal.stop_loss.unwrap_or(default_stop)),
            Some(signal.target_price.unwrap_or(default_tp)),
        )
    }

    // Public reads: pure, non-blocking, latest committed state.

    pub async fn positions(&self) -> Vec<Position> {
        self.book.read().await.positions()
    }

    pub async fn trades(&self) -> Vec<Trade> {
        self.book.read().await.trades().to_vec()
    }

    pub async fn risk_metrics(&self) -> RiskMetrics {
        RiskMetrics::compute(&*self.book.read().await, Utc::now())
    }

    pub async fn portfolio_value(&self) -> Decimal {
        self.book.read().await.portfolio_value()
    }

    pub fn mode(&self) -> crate::config::TradingMode {
        self.config.engine.mode
    }
}
