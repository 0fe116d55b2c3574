//! Data collectors
//!
//! Timer-driven pollers that keep per-symbol latest-value caches and emit
//! engine events. Transient fetch failures are logged and retried on the
//! next tick; the cache keeps the last-known-good snapshot.

mod market;
mod sentiment;
mod types;

pub use market::MarketDataCollector;
pub use sentiment::{
    HttpSentimentSource, NullSentimentSource, SentimentCollector, SentimentProvider,
};
pub use types::{NewsItem, SentimentData, SourceScore};
