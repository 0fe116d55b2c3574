//! quantpulse: AI-assisted multi-symbol trading engine
//!
//! This library provides the core components for:
//! - Market data and sentiment collection with per-symbol caches
//! - Technical indicator derivation (RSI, MACD, Bollinger, ATR)
//! - AI-backed decision making over an external inference capability
//! - Pluggable deterministic strategies
//! - Portfolio-level risk management with a daily loss circuit breaker
//! - Spot and on-chain execution routing with per-symbol serialization
//! - A recurring analysis cycle orchestrating the above
//! - Read-only HTTP/WebSocket status surface
//! - Full observability stack

pub mod ai;
pub mod analysis;
pub mod api;
pub mod chain;
pub mod cli;
pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod exchange;
pub mod execution;
pub mod portfolio;
pub mod risk;
pub mod strategy;
pub mod telemetry;
