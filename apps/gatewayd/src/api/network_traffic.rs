use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use fleet_detect::threat::network::{self, TrafficWindow};
use fleet_detect::finding::FindingType;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::GatewayState;

/// Mirrors [`TrafficWindow`]'s fields since that type isn't wired for
/// JSON on its own; kept as a plain request body shape here at the API
/// boundary instead of growing a serde dependency into a detector crate
/// that otherwise has none.
#[derive(Debug, Deserialize)]
pub struct NetworkTrafficRequest {
    pub drone_id: u64,
    pub packets_per_sec: f64,
    pub mean_packet_size_bytes: f64,
    pub packet_size_stddev_bytes: f64,
    pub large_packet_fraction: f64,
    pub weak_encryption_signal: bool,
    pub scan_signature_hits: u32,
    pub small_probe_count: u32,
    pub injection_signature_hits: u32,
}

pub async fn ingest(State(state): State<Arc<GatewayState>>, Json(req): Json<NetworkTrafficRequest>) -> Json<Value> {
    let window = TrafficWindow {
        packets_per_sec: req.packets_per_sec,
        mean_packet_size_bytes: req.mean_packet_size_bytes,
        packet_size_stddev_bytes: req.packet_size_stddev_bytes,
        large_packet_fraction: req.large_packet_fraction,
        weak_encryption_signal: req.weak_encryption_signal,
        scan_signature_hits: req.scan_signature_hits,
        small_probe_count: req.small_probe_count,
        injection_signature_hits: req.injection_signature_hits,
    };

    let findings = network::evaluate(&window);
    let drone_id = fleet_proto::DroneId(req.drone_id);
    for finding in &findings {
        let detail = format!("{:?} window score {:.2}", finding.threat, finding.score);
        let fleet_finding = fleet_detect::Finding::new(drone_id, FindingType::NetworkAnomaly, finding.score, detail);
        state.record_finding(fleet_finding.clone());
        let mut engine = state.alert_engine.lock().await;
        if let Some(alert_id) = engine.handle_finding(fleet_finding, chrono::Utc::now()).await {
            if let Some(alert) = engine.get(alert_id) {
                state.publish_alert(alert.clone());
            }
        }
    }

    Json(json!(findings
        .iter()
        .map(|f| json!({ "threat": format!("{:?}", f.threat), "score": f.score }))
        .collect::<Vec<_>>()))
}
