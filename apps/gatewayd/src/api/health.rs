use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::GatewayState;

pub async fn health(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    Json(json!({
        "status": if state.running.load(Ordering::Relaxed) { "ok" } else { "stopped" },
    }))
}

pub async fn status(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    let counters: Vec<Value> = state
        .error_counts()
        .into_iter()
        .map(|(category, count)| json!({ "category": format!("{category:?}").to_lowercase(), "count": count }))
        .collect();

    let protocol_snapshot = state.router.snapshot(&probe_message()).await;
    let protocols: Vec<Value> = protocol_snapshot
        .into_iter()
        .map(|(protocol, score, available)| json!({ "protocol": protocol.to_string(), "score": score, "available": available }))
        .collect();

    let capabilities = state.capabilities.all();
    let mesh_capable_drones = capabilities.values().filter(|c| c.mesh_capable).count();

    Json(json!({
        "running": state.running.load(Ordering::Relaxed),
        "drones_seen": state.findings_by_drone.len(),
        "drones_known": capabilities.len(),
        "mesh_capable_drones": mesh_capable_drones,
        "error_counters": counters,
        "protocols": protocols,
    }))
}

fn probe_message() -> fleet_proto::UnifiedMessage {
    fleet_proto::UnifiedMessage {
        message_id: fleet_proto::MessageId(0),
        drone_id: fleet_proto::DroneId(0),
        source_protocol: fleet_proto::SourceProtocol::Internal,
        timestamp: fleet_proto::UnifiedMessage::now_millis(),
        priority: fleet_proto::Priority::Normal,
        payload: fleet_proto::MessagePayload::Heartbeat,
        delivery: fleet_proto::DeliveryOptions::default(),
        external_sequence_number: None,
    }
}
