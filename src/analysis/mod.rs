//! Technical analysis
//!
//! Pure indicator computation over a bounded recent candle window, plus
//! the consolidated per-cycle analysis snapshot fed to strategies and the
//! AI engine. Windows shorter than an indicator's lookback yield neutral
//! values instead of failing the computation.

use crate::collector::{NewsItem, SentimentData};
use crate::exchange::{Candle, MarketData};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived indicators for one symbol, recomputed each cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub symbol: String,
    /// Relative strength index, 0-100, neutral 50
    pub rsi: Decimal,
    pub macd: Decimal,
    pub macd_signal: Decimal,
    pub macd_histogram: Decimal,
    pub sma_20: Decimal,
    pub sma_50: Decimal,
    pub ema_12: Decimal,
    pub ema_26: Decimal,
    pub bollinger_upper: Decimal,
    pub bollinger_middle: Decimal,
    pub bollinger_lower: Decimal,
    /// Average true range
    pub atr: Decimal,
    pub volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl TechnicalIndicators {
    /// Neutral indicator set for a symbol with no data yet
    pub fn neutral(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            rsi: Decimal::from(50),
            macd: Decimal::ZERO,
            macd_signal: Decimal::ZERO,
            macd_histogram: Decimal::ZERO,
            sma_20: Decimal::ZERO,
            sma_50: Decimal::ZERO,
            ema_12: Decimal::ZERO,
            ema_26: Decimal::ZERO,
            bollinger_upper: Decimal::ZERO,
            bollinger_middle: Decimal::ZERO,
            bollinger_lower: Decimal::ZERO,
            atr: Decimal::ZERO,
            volume: Decimal::ZERO,
            timestamp: Utc::now(),
        }
    }
}

/// The cycle's consolidated input, constructed fresh per cycle and never
/// mutated afterwards
#[derive(Debug, Clone)]
pub struct MarketAnalysis {
    pub symbol: String,
    /// Recent snapshots, oldest first
    pub recent: Vec<MarketData>,
    pub indicators: TechnicalIndicators,
    /// Absent until the sentiment collector has reported
    pub sentiment: Option<SentimentData>,
    pub news: Vec<NewsItem>,
}

impl MarketAnalysis {
    /// Latest market snapshot in the window
    pub fn latest(&self) -> Option<&MarketData> {
        self.recent.last()
    }

    /// Aggregate sentiment score, neutral when absent
    pub fn sentiment_score(&self) -> Decimal {
        self.sentiment
            .as_ref()
            .map(|s| s.score)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Computes indicators from recent candles
pub struct TechnicalAnalysisEngine;

impl TechnicalAnalysisEngine {
    /// Derive the full indicator set for one symbol
    pub fn compute(symbol: &str, candles: &[Candle]) -> TechnicalIndicators {
        if candles.is_empty() {
            return TechnicalIndicators::neutral(symbol);
        }

        let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
        let last_close = *closes.last().expect("non-empty");
        let volume = candles.iter().map(|c| c.volume).sum();

        let (macd, macd_signal) = macd(&closes);
        let (bollinger_upper, bollinger_middle, bollinger_lower) = bollinger(&closes, 20, 2.0);

        TechnicalIndicators {
            symbol: symbol.to_string(),
            rsi: rsi(&closes, 14),
            macd,
            macd_signal,
            macd_histogram: macd - macd_signal,
            sma_20: sma(&closes, 20).unwrap_or(last_close),
            sma_50: sma(&closes, 50).unwrap_or(last_close),
            ema_12: ema(&closes, 12),
            ema_26: ema(&closes, 26),
            bollinger_upper,
            bollinger_middle,
            bollinger_lower,
            atr: atr(candles, 14),
            volume,
            timestamp: Utc::now(),
        }
    }
}

/// Simple moving average over the trailing `period` closes
fn sma(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if closes.len() < period || period == 0 {
        return None;
    }
    let window = &closes[closes.len() - period..];
    Some(window.iter().copied().sum::<Decimal>() / Decimal::from(period as u64))
}

/// Exponential moving average; falls back to the last close on a short window
fn ema(closes: &[Decimal], period: usize) -> Decimal {
    let Some(&last) = closes.last() else {
        return Decimal::ZERO;
    };
    if closes.len() < period {
        return last;
    }

    let alpha = Decimal::TWO / Decimal::from((period + 1) as u64);
    let mut value = sma(&closes[..period], period).unwrap_or(last);
    for close in &closes[period..] {
        value = (*close - value) * alpha + value;
    }
    value
}

/// Full EMA series used for the MACD signal line
fn ema_series(values: &[Decimal], period: usize) -> Vec<Decimal> {
    if values.len() < period {
        return vec![];
    }
    let alpha = Decimal::TWO / Decimal::from((period + 1) as u64);
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut value =
        values[..period].iter().copied().sum::<Decimal>() / Decimal::from(period as u64);
    out.push(value);
    for v in &values[period..] {
        value = (*v - value) * alpha + value;
        out.push(value);
    }
    out
}

/// MACD line (EMA12 - EMA26) and its 9-period signal line
fn macd(closes: &[Decimal]) -> (Decimal, Decimal) {
    if closes.len() < 26 {
        return (Decimal::ZERO, Decimal::ZERO);
    }

    let fast = ema_series(closes, 12);
    let slow = ema_series(closes, 26);
    // Align the two series on their common (most recent) suffix
    let offset = fast.len() - slow.len();
    let line: Vec<Decimal> = slow
        .iter()
        .enumerate()
        .map(|(i, s)| fast[i + offset] - *s)
        .collect();

    let macd_value = *line.last().expect("len >= 1");
    let signal = ema_series(&line, 9)
        .last()
        .copied()
        .unwrap_or(Decimal::ZERO);
    (macd_value, signal)
}

/// RSI over trailing deltas; neutral 50 when the window is too short
fn rsi(closes: &[Decimal], period: usize) -> Decimal {
    if closes.len() <= period {
        return Decimal::from(50);
    }

    let mut gains = Decimal::ZERO;
    let mut losses = Decimal::ZERO;
    let start = closes.len() - period;
    for i in start..closes.len() {
        let delta = closes[i] - closes[i - 1];
        if delta >= Decimal::ZERO {
            gains += delta;
        } else {
            losses -= delta;
        }
    }

    if losses.is_zero() {
        return Decimal::from(100);
    }
    let rs = gains / losses;
    Decimal::from(100) - Decimal::from(100) / (Decimal::ONE + rs)
}

/// Bollinger bands around SMA(period); degenerate to the last close when short
fn bollinger(closes: &[Decimal], period: usize, width: f64) -> (Decimal, Decimal, Decimal) {
    let last = closes.last().copied().unwrap_or(Decimal::ZERO);
    let Some(middle) = sma(closes, period) else {
        return (last, last, last);
    };

    // Standard deviation in f64; Decimal has no sqrt
    let window = &closes[closes.len() - period..];
    let mean: f64 = f64::try_from(middle).unwrap_or(0.0);
    let variance = window
        .iter()
        .map(|c| {
            let v: f64 = f64::try_from(*c).unwrap_or(0.0);
            (v - mean).powi(2)
        })
        .sum::<f64>()
        / period as f64;
    let band = Decimal::try_from(variance.sqrt() * width).unwrap_or(Decimal::ZERO);

    (middle + band, middle, middle - band)
}

/// Average true range over the trailing `period` candles; zero when short
fn atr(candles: &[Candle], period: usize) -> Decimal {
    if candles.len() <= period {
        return Decimal::ZERO;
    }

    let start = candles.len() - period;
    let mut sum = Decimal::ZERO;
    for i in start..candles.len() {
        let high_low = candles[i].high - candles[i].low;
        let high_close = (candles[i].high - candles[i - 1].close).abs();
        let low_close = (candles[i].low - candles[i - 1].close).abs();
        sum += high_low.max(high_close).max(low_close);
    }
    sum / Decimal::from(period as u64)
}
