//! Read-only HTTP/WebSocket adapter
//!
//! A thin surface over the engine's public reads plus a WebSocket fan-out
//! of the event stream. Broadcast is best-effort: a slow client lags and
//! loses events rather than ever blocking the engine.

use crate::config::TradingMode;
use crate::engine::{EngineState, TradingEngine};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Serialize)]
struct StatusResponse {
    state: EngineState,
    mode: TradingMode,
    portfolio_value: Decimal,
    open_positions: usize,
    timestamp: DateTime<Utc>,
}

/// Build the adapter router
pub fn router(engine: Arc<TradingEngine>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/positions", get(positions))
        .route("/trades", get(trades))
        .route("/metrics", get(risk_metrics))
        .route("/ws", get(ws_upgrade))
        .with_state(engine)
}

/// Serve the adapter until the process exits
pub async fn serve(engine: Arc<TradingEngine>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "Status API listening");
    axum::serve(listener, router(engine)).await?;
    Ok(())
}

async fn status(State(engine): State<Arc<TradingEngine>>) -> impl IntoResponse {
    Json(StatusResponse {
        state: engine.state().await,
        mode: engine.mode(),
        portfolio_value: engine.portfolio_value().await,
        open_positions: engine.positions().await.len(),
        timestamp: Utc::now(),
    })
}

async fn positions(State(engine): State<Arc<TradingEngine>>) -> impl IntoResponse {
    Json(engine.positions().await)
}

async fn trades(State(engine): State<Arc<TradingEngine>>) -> impl IntoResponse {
    Json(engine.trades().await)
}

async fn risk_metrics(State(engine): State<Arc<TradingEngine>>) -> impl IntoResponse {
    Json(engine.risk_metrics().await)
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(engine): State<Arc<TradingEngine>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| forward_events(socket, engine))
}

/// Forward engine events to one WebSocket client
async fn forward_events(socket: WebSocket, engine: Arc<TradingEngine>) {
    let (mut sink, mut stream) = socket.split();
    let mut events = engine.subscribe();
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to serialize event");
                                continue;
                            }
                        };
                        if sink.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        // At-most-once delivery: drop and move on
                        tracing::debug!(missed, "WebSocket client lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {} // Ignore client chatter
                }
            }
        }
    }
}
