use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use fleet_detect::Severity;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct AlertsFilter {
    severity: Option<String>,
    #[serde(rename = "type")]
    finding_type: Option<String>,
    limit: Option<usize>,
}

pub async fn list(State(state): State<Arc<GatewayState>>, Query(filter): Query<AlertsFilter>) -> Json<Value> {
    let engine = state.alert_engine.lock().await;
    let wanted_severity = filter.severity.as_deref().and_then(parse_severity);
    let wanted_type = filter.finding_type.as_deref().and_then(parse_finding_type);

    let mut alerts: Vec<_> = engine
        .all_alerts()
        .into_iter()
        .filter(|a| wanted_severity.map_or(true, |s| a.severity == s))
        .filter(|a| match wanted_type {
            None => true,
            Some(wanted) => {
                let drone_findings = state.findings_for(a.drone_id, usize::MAX);
                a.finding_refs.iter().any(|id| drone_findings.iter().any(|f| f.finding_id == *id && f.finding_type == wanted))
            }
        })
        .collect();
    alerts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    let limit = filter.limit.unwrap_or(alerts.len());
    Json(json!(alerts.into_iter().take(limit).collect::<Vec<_>>()))
}

fn parse_severity(raw: &str) -> Option<Severity> {
    match raw.to_lowercase().as_str() {
        "info" => Some(Severity::Info),
        "warning" => Some(Severity::Warning),
        "high" => Some(Severity::High),
        "critical" => Some(Severity::Critical),
        "emergency" => Some(Severity::Emergency),
        _ => None,
    }
}

fn parse_finding_type(raw: &str) -> Option<fleet_detect::finding::FindingType> {
    use fleet_detect::finding::FindingType;
    match raw.to_lowercase().as_str() {
        "behavioral_anomaly" => Some(FindingType::BehavioralAnomaly),
        "statistical_anomaly" => Some(FindingType::StatisticalAnomaly),
        "battery_degradation" => Some(FindingType::BatteryDegradation),
        "motor_degradation" => Some(FindingType::MotorDegradation),
        "gps_spoofing" => Some(FindingType::GpsSpoofing),
        "jamming" => Some(FindingType::Jamming),
        "physical_ew" => Some(FindingType::PhysicalEw),
        "network_anomaly" => Some(FindingType::NetworkAnomaly),
        _ => None,
    }
}

fn parse_alert_id(raw: &str) -> Result<fleet_proto::AlertId, StatusCode> {
    raw.parse::<uuid::Uuid>().map(fleet_proto::AlertId).map_err(|_| StatusCode::BAD_REQUEST)
}

pub async fn acknowledge(State(state): State<Arc<GatewayState>>, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    let alert_id = match parse_alert_id(&id) {
        Ok(id) => id,
        Err(status) => return (status, Json(json!({"error": "invalid alert id"}))),
    };
    let mut engine = state.alert_engine.lock().await;
    match engine.acknowledge(alert_id, "operator", chrono::Utc::now()).await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "acknowledged"}))),
        Err(fleet_alert::error::AlertTransitionError::NotFound) => (StatusCode::NOT_FOUND, Json(json!({"error": "no such alert"}))),
        Err(err) => (StatusCode::CONFLICT, Json(json!({"error": err.to_string()}))),
    }
}

pub async fn resolve(State(state): State<Arc<GatewayState>>, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    let alert_id = match parse_alert_id(&id) {
        Ok(id) => id,
        Err(status) => return (status, Json(json!({"error": "invalid alert id"}))),
    };
    let mut engine = state.alert_engine.lock().await;
    match engine.resolve(alert_id, "operator", chrono::Utc::now()).await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "resolved"}))),
        Err(fleet_alert::error::AlertTransitionError::NotFound) => (StatusCode::NOT_FOUND, Json(json!({"error": "no such alert"}))),
        Err(err) => (StatusCode::CONFLICT, Json(json!({"error": err.to_string()}))),
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct SuppressBody {
    until: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn suppress(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    body: Option<Json<SuppressBody>>,
) -> (StatusCode, Json<Value>) {
    let alert_id = match parse_alert_id(&id) {
        Ok(id) => id,
        Err(status) => return (status, Json(json!({"error": "invalid alert id"}))),
    };
    let now = chrono::Utc::now();
    let until = body.and_then(|b| b.0.until).unwrap_or(now + chrono::Duration::hours(1));
    let mut engine = state.alert_engine.lock().await;
    match engine.suppress(alert_id, until, now).await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "suppressed", "until": until}))),
        Err(fleet_alert::error::AlertTransitionError::NotFound) => (StatusCode::NOT_FOUND, Json(json!({"error": "no such alert"}))),
        Err(err) => (StatusCode::CONFLICT, Json(json!({"error": err.to_string()}))),
    }
}
