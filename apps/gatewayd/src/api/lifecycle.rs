use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use crate::state::GatewayState;

/// No-op once the process has already cancelled its `CancellationToken`
/// for `/stop`: a single process can drain once, not restart its adapters
/// in place. Reports the current state either way.
pub async fn start(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    if state.cancel.is_cancelled() {
        return Json(json!({"running": false, "note": "process already draining, restart the binary to resume"}));
    }
    state.running.store(true, Ordering::Relaxed);
    Json(json!({"running": true}))
}

pub async fn stop(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    info!("stop requested via control API");
    state.running.store(false, Ordering::Relaxed);
    state.cancel.cancel();
    Json(json!({"running": false}))
}
