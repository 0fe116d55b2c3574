//! Engine event stream
//!
//! The engine publishes typed events onto a broadcast channel; the
//! HTTP/WebSocket adapter subscribes and fans out to UI clients. The
//! channel is lossy for lagging subscribers, keeping the fan-out
//! best-effort and the engine unblockable from the outside.

use crate::analysis::TechnicalIndicators;
use crate::collector::SentimentData;
use crate::exchange::MarketData;
use crate::portfolio::Trade;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// Broadcast capacity; lagging subscribers lose oldest events first
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events emitted by the trading engine
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    #[serde(rename_all = "camelCase")]
    MarketUpdate {
        data: MarketData,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    SentimentUpdate {
        data: SentimentData,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    TechnicalUpdate {
        indicators: TechnicalIndicators,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    TradeExecuted {
        trade: Trade,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    AnalysisComplete {
        cycle: u64,
        candidate_signals: usize,
        approved_signals: usize,
        executed_trades: usize,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    AnalysisError {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    /// Event type tag as broadcast on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::MarketUpdate { .. } => "marketUpdate",
            EngineEvent::SentimentUpdate { .. } => "sentimentUpdate",
            EngineEvent::TechnicalUpdate { .. } => "technicalUpdate",
            EngineEvent::TradeExecuted { .. } => "tradeExecuted",
            EngineEvent::AnalysisComplete { .. } => "analysisComplete",
            EngineEvent::AnalysisError { .. } => "analysisError",
        }
    }
}

/// Create the engine's event channel
pub fn event_channel() -> broadcast::Sender<EngineEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

/// Publish an event, ignoring the no-subscriber case
pub fn publish(sender: &broadcast::Sender<EngineEvent>, event: EngineEvent) {
    // send only fails when there are no receivers; that is fine here
    let _ = sender.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = EngineEvent::AnalysisError {
            message: "inference unavailable".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"analysisError\""));
        assert!(json.contains("inference unavailable"));
    }

    #[test]
    fn test_event_kind() {
        let event = EngineEvent::AnalysisComplete {
            cycle: 1,
            candidate_signals: 4,
            approved_signals: 2,
            executed_trades: 2,
            timestamp: Utc::now(),
        };
        assert_eq!(event.kind(), "analysisComplete");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let sender = event_channel();
        publish(
            &sender,
            EngineEvent::AnalysisError {
                message: "x".to_string(),
                timestamp: Utc::now(),
            },
        );
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let sender = event_channel();
        let mut rx = sender.subscribe();
        publish(
            &sender,
            EngineEvent::AnalysisError {
                message: "boom".to_string(),
                timestamp: Utc::now(),
            },
        );
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), "analysisError");
    }
}
