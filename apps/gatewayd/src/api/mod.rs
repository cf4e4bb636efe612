//! Control API (spec §6): REST-like endpoints over `Arc<GatewayState>`,
//! grounded in the example pack's `sx9-port-manager`/`sx9-gateway-primary`
//! handler shape (state extraction, JSON responses, a permissive CORS
//! layer since auth is explicitly out of scope here).

mod alerts;
mod config;
mod drones;
mod health;
mod lifecycle;
mod network_traffic;
mod telemetry;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::GatewayState;
use crate::stream;

pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/status", get(health::status))
        .route("/alerts", get(alerts::list))
        .route("/alerts/:id/acknowledge", post(alerts::acknowledge))
        .route("/alerts/:id/resolve", post(alerts::resolve))
        .route("/alerts/:id/suppress", post(alerts::suppress))
        .route("/drones/:id", get(drones::get))
        .route("/drones/:id/anomalies", get(drones::anomalies))
        .route("/drones/:id/predictions", get(drones::predictions))
        .route("/drones/:id/threats", get(drones::threats))
        .route("/telemetry/ingest", post(telemetry::ingest))
        .route("/network-traffic", post(network_traffic::ingest))
        .route("/config", get(config::get_config).put(config::put_config))
        .route("/start", post(lifecycle::start))
        .route("/stop", post(lifecycle::stop))
        .route("/stream", get(stream::upgrade))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
