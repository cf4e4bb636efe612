use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use fleet_detect::finding::FindingType;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

const DEFAULT_LIMIT: usize = 50;

/// Whole-drone summary: advertised/observed capabilities plus how many
/// findings are on file, for an operator who wants one page on a drone
/// rather than picking through the `/drones/{id}/*` sub-resources.
pub async fn get(State(state): State<Arc<GatewayState>>, Path(id): Path<u64>) -> Json<Value> {
    let drone_id = fleet_proto::DroneId(id);
    let capabilities = state.capabilities.get(drone_id);
    let finding_count = state.findings_for(drone_id, usize::MAX).len();
    Json(json!({
        "drone_id": id,
        "capabilities": capabilities,
        "finding_count": finding_count,
    }))
}

fn filtered(state: &GatewayState, drone_id: u64, limit: Option<usize>, wanted: &[FindingType]) -> Vec<Value> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    state
        .findings_for(fleet_proto::DroneId(drone_id), usize::MAX)
        .into_iter()
        .filter(|f| wanted.contains(&f.finding_type))
        .take(limit)
        .map(|f| json!(f))
        .collect()
}

pub async fn anomalies(State(state): State<Arc<GatewayState>>, Path(id): Path<u64>, Query(q): Query<LimitQuery>) -> Json<Value> {
    let findings = filtered(&state, id, q.limit, &[FindingType::BehavioralAnomaly, FindingType::StatisticalAnomaly]);
    Json(json!(findings))
}

pub async fn predictions(State(state): State<Arc<GatewayState>>, Path(id): Path<u64>, Query(q): Query<LimitQuery>) -> Json<Value> {
    let findings = filtered(&state, id, q.limit, &[FindingType::BatteryDegradation, FindingType::MotorDegradation]);
    Json(json!(findings))
}

pub async fn threats(State(state): State<Arc<GatewayState>>, Path(id): Path<u64>, Query(q): Query<LimitQuery>) -> Json<Value> {
    let findings = filtered(
        &state,
        id,
        q.limit,
        &[FindingType::GpsSpoofing, FindingType::Jamming, FindingType::PhysicalEw, FindingType::NetworkAnomaly],
    );
    Json(json!(findings))
}
