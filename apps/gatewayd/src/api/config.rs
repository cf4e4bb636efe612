use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::config::GatewayConfig;
use crate::state::GatewayState;

pub async fn get_config(State(state): State<Arc<GatewayState>>) -> Json<GatewayConfig> {
    Json(state.config.lock().await.clone())
}

/// Replaces the in-memory config wholesale. Already-running adapters and
/// the router keep their startup-time settings; this only changes what
/// `GET /config` reports and what a future restart would pick up (no
/// live adapter reconfiguration, spec Non-goals).
pub async fn put_config(State(state): State<Arc<GatewayState>>, Json(new_config): Json<GatewayConfig>) -> Json<GatewayConfig> {
    let mut config = state.config.lock().await;
    *config = new_config;
    Json(config.clone())
}
