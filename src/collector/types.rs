//! Sentiment and news types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate sentiment for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentData {
    pub symbol: String,
    /// Aggregate score in [-1, 1]
    pub score: Decimal,
    /// Per-source sub-scores
    pub sources: Vec<SourceScore>,
    /// Social/news mention volume behind the score
    pub mentions: u64,
    pub timestamp: DateTime<Utc>,
}

/// One source's contribution to the aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceScore {
    pub source: String,
    pub score: Decimal,
}

/// A news headline relevant to a symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub source: String,
    /// Source-provided sentiment hint in [-1, 1]
    pub sentiment: Decimal,
    pub published_at: DateTime<Utc>,
}

impl SentimentData {
    /// Neutral placeholder when no source has reported yet
    pub fn neutral(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            score: Decimal::ZERO,
            sources: vec![],
            mentions: 0,
            timestamp: Utc::now(),
        }
    }
}
