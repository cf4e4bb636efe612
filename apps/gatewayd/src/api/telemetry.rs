use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use fleet_proto::UnifiedMessage;
use serde_json::{json, Value};

use crate::state::GatewayState;

/// Accepts an externally produced message (spec §6 `POST /telemetry/ingest`),
/// stamps it with this process's own `message_id`/timestamp the same way an
/// adapter's normalizer would, and publishes it straight onto the bus.
pub async fn ingest(State(state): State<Arc<GatewayState>>, Json(mut message): Json<UnifiedMessage>) -> (StatusCode, Json<Value>) {
    message.message_id = state.id_gen.next();
    message.timestamp = UnifiedMessage::now_millis();

    let mut bus = state.telemetry_bus.lock().await;
    match bus.publish(message).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({"status": "accepted"}))),
        Err(err) => {
            state.record_error(fleet_proto::ErrorCategory::Backpressure);
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": err.to_string()})))
        }
    }
}
