//! `/stream`: one websocket per subscriber, multiplexing the telemetry
//! bus's lossy side with the finding and alert broadcast feeds (spec §6:
//! "bi-directional event stream ... per-subscriber bounded queues with
//! drop-oldest"). All three sources are already `tokio::sync::broadcast`
//! channels, so drop-oldest falls out of their own semantics; this just
//! fans them into one socket.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::debug;

use crate::state::GatewayState;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<GatewayState>) {
    let mut telemetry_rx = state.subscribe_stream().await;
    let mut finding_rx = state.finding_feed.subscribe();
    let mut alert_rx = state.alert_feed.subscribe();
    let cancel = state.cancel.clone();

    let (mut sink, mut source) = socket.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            // Drain and discard anything the client sends; this feed is
            // push-only. A close frame ends the connection.
            incoming = source.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => continue,
                }
            }
            telemetry = telemetry_rx.recv() => {
                if !forward(&mut sink, "telemetry", telemetry_outcome(telemetry)).await {
                    break;
                }
            }
            finding = finding_rx.recv() => {
                if !forward(&mut sink, "finding", finding_outcome(finding)).await {
                    break;
                }
            }
            alert = alert_rx.recv() => {
                if !forward(&mut sink, "alert", alert_outcome(alert)).await {
                    break;
                }
            }
        }
    }
    debug!("stream subscriber disconnected");
}

enum FrameOutcome {
    Send(serde_json::Value),
    Lagged,
    Closed,
}

fn telemetry_outcome(result: Result<fleet_proto::UnifiedMessage, broadcast::error::RecvError>) -> FrameOutcome {
    match result {
        Ok(message) => FrameOutcome::Send(json!(message)),
        Err(broadcast::error::RecvError::Lagged(_)) => FrameOutcome::Lagged,
        Err(broadcast::error::RecvError::Closed) => FrameOutcome::Closed,
    }
}

fn finding_outcome(result: Result<fleet_detect::Finding, broadcast::error::RecvError>) -> FrameOutcome {
    match result {
        Ok(finding) => FrameOutcome::Send(json!(finding)),
        Err(broadcast::error::RecvError::Lagged(_)) => FrameOutcome::Lagged,
        Err(broadcast::error::RecvError::Closed) => FrameOutcome::Closed,
    }
}

fn alert_outcome(result: Result<fleet_alert::Alert, broadcast::error::RecvError>) -> FrameOutcome {
    match result {
        Ok(alert) => FrameOutcome::Send(json!(alert)),
        Err(broadcast::error::RecvError::Lagged(_)) => FrameOutcome::Lagged,
        Err(broadcast::error::RecvError::Closed) => FrameOutcome::Closed,
    }
}

/// Returns `false` when the connection should end (client gone, sender
/// closed). A lagged marker is forwarded as its own frame rather than
/// silently skipped, so a client can tell it missed data.
async fn forward(sink: &mut futures::stream::SplitSink<WebSocket, Message>, kind: &str, outcome: FrameOutcome) -> bool {
    let payload = match outcome {
        FrameOutcome::Send(value) => json!({ "type": kind, "data": value }),
        FrameOutcome::Lagged => json!({ "type": kind, "lagged": true }),
        FrameOutcome::Closed => return false,
    };
    match serde_json::to_string(&payload) {
        Ok(text) => sink.send(Message::Text(text)).await.is_ok(),
        Err(_) => true,
    }
}
