use crate::severity::{Classification, Severity};
use fleet_proto::{DroneId, FindingId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    BehavioralAnomaly,
    StatisticalAnomaly,
    BatteryDegradation,
    MotorDegradation,
    GpsSpoofing,
    Jamming,
    PhysicalEw,
    NetworkAnomaly,
}

impl FindingType {
    /// Default classification by type, overridden upward by severity
    /// (spec §4.5: "selected by type and severity").
    pub fn base_classification(self) -> Classification {
        match self {
            FindingType::GpsSpoofing | FindingType::Jamming | FindingType::PhysicalEw => {
                Classification::Secret
            }
            FindingType::NetworkAnomaly => Classification::Confidential,
            _ => Classification::Unclassified,
        }
    }

    /// Subsystems this finding type speaks to, surfaced to operators
    /// deciding who should look at it (comms team vs. maintenance vs.
    /// flight ops).
    fn affected_system_types(self) -> Vec<String> {
        match self {
            FindingType::BehavioralAnomaly | FindingType::StatisticalAnomaly => vec!["flight_control".into()],
            FindingType::BatteryDegradation => vec!["power".into()],
            FindingType::MotorDegradation => vec!["propulsion".into()],
            FindingType::GpsSpoofing => vec!["navigation".into(), "gnss".into()],
            FindingType::Jamming => vec!["comms".into(), "gnss".into()],
            FindingType::PhysicalEw => vec!["comms".into(), "navigation".into()],
            FindingType::NetworkAnomaly => vec!["network".into()],
        }
    }

    /// A short, type-specific starting point for an operator response;
    /// not exhaustive and never auto-executed (spec §4.5 Non-goals: no
    /// autonomous mitigation).
    pub fn recommended_actions(self) -> Vec<String> {
        match self {
            FindingType::BehavioralAnomaly | FindingType::StatisticalAnomaly => {
                vec!["review recent telemetry history for the drone".into()]
            }
            FindingType::BatteryDegradation => {
                vec!["schedule battery inspection".into(), "plan an early return-to-launch".into()]
            }
            FindingType::MotorDegradation => vec!["ground the drone for motor inspection".into()],
            FindingType::GpsSpoofing => {
                vec!["switch to a non-GNSS position source if available".into(), "alert nearby drones".into()]
            }
            FindingType::Jamming => vec!["assess link diversity, consider recall".into()],
            FindingType::PhysicalEw => vec!["recall the drone to a known-safe area".into()],
            FindingType::NetworkAnomaly => vec!["isolate the affected link pending investigation".into()],
        }
    }
}

/// Assets a finding is about: always at least the reporting drone, with
/// the subsystem tags `FindingType::affected_system_types` supplies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffectedAssets {
    pub drone_ids: Vec<DroneId>,
    pub system_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub finding_id: FindingId,
    pub drone_id: DroneId,
    pub finding_type: FindingType,
    pub score: f64,
    /// How confident the detector is in this score itself, distinct from
    /// the score's own severity — e.g. a battery prediction's model
    /// confidence, separate from how severe the predicted degradation is.
    /// Defaults to the score when a detector has no sharper estimate.
    pub confidence: f64,
    pub severity: Severity,
    pub classification: Classification,
    pub detail: String,
    pub timestamp: u64,
    pub model_status: Option<String>,
    pub affected: AffectedAssets,
    /// Named feature values that drove the score, when the detector
    /// computed intermediate ones worth surfacing (e.g. the isolation
    /// forest's feature vector, or a threat detector's component scores).
    /// Empty when a detector's score isn't decomposable this way.
    pub features: Vec<(String, f64)>,
    pub recommended_actions: Vec<String>,
}

impl Finding {
    pub fn new(drone_id: DroneId, finding_type: FindingType, score: f64, detail: impl Into<String>) -> Self {
        Self::with_confidence(drone_id, finding_type, score, score, detail)
    }

    pub fn with_confidence(
        drone_id: DroneId,
        finding_type: FindingType,
        score: f64,
        confidence: f64,
        detail: impl Into<String>,
    ) -> Self {
        let severity = crate::severity::severity_for_score(score);
        let classification = classification_for(finding_type, severity);
        Self {
            finding_id: FindingId::new(),
            drone_id,
            finding_type,
            score,
            confidence: confidence.clamp(0.0, 1.0),
            severity,
            classification,
            detail: detail.into(),
            timestamp: fleet_proto::UnifiedMessage::now_millis(),
            model_status: None,
            affected: AffectedAssets { drone_ids: vec![drone_id], system_types: finding_type.affected_system_types() },
            features: Vec::new(),
            recommended_actions: finding_type.recommended_actions(),
        }
    }

    /// Attaches the named feature values that drove this finding's score.
    pub fn with_features(mut self, features: Vec<(String, f64)>) -> Self {
        self.features = features;
        self
    }
}

/// Severity can only escalate classification upward from the type's base,
/// never relax it.
fn classification_for(finding_type: FindingType, severity: Severity) -> Classification {
    let base = finding_type.base_classification();
    if severity >= Severity::Critical && base == Classification::Unclassified {
        Classification::Confidential
    } else {
        base
    }
}
