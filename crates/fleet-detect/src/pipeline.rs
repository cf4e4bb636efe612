use std::collections::HashMap;

use fleet_proto::{DroneId, MessagePayload};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::failure::{BatteryHealthModel, BatteryReading, MotorHealthModel, MotorReading};
use crate::finding::{Finding, FindingType};
use crate::isolation_forest::{extract_features, FeatureVector, IsolationForestDetector};
use crate::ring::{RingBuffer, DEFAULT_RING_CAPACITY};
use crate::threat::gps_spoofing::GpsSpoofingDetector;
use crate::threat::jamming::{JammingDetector, JAMMING_THRESHOLD};
use crate::threat::physical_ew::PhysicalEwDetector;
use crate::zscore::ZScoreTracker;

const REFIT_INTERVAL_SAMPLES: usize = 50;
const MIN_TRAINING_SAMPLES: usize = 30;

const FEATURE_LABELS: [&str; crate::isolation_forest::FEATURE_COUNT] = [
    "alt_m", "vel_x", "vel_y", "vel_z", "accel_x", "accel_y", "accel_z", "battery_voltage_v",
    "signal_strength_dbm", "gps_accuracy_m", "wind_speed_mps", "packet_loss_pct", "latency_ms",
];

fn feature_vector_labels(features: &FeatureVector) -> Vec<(String, f64)> {
    FEATURE_LABELS.iter().zip(features.iter()).map(|(name, value)| (name.to_string(), *value)).collect()
}

/// Per-drone detection state. One lives for as long as the drone has been
/// seen at least once; never evicted while the gateway process is up.
struct DroneDetectorState {
    features: RingBuffer<FeatureVector>,
    forest: Option<IsolationForestDetector>,
    samples_since_refit: usize,
    battery_z: ZScoreTracker,
    motor_z: ZScoreTracker,
    spoofing: GpsSpoofingDetector,
    jamming: JammingDetector,
    physical_ew: PhysicalEwDetector,
    battery_model: BatteryHealthModel,
    motor_model: MotorHealthModel,
    battery_cycle_estimate: u32,
    first_seen_ms: u64,
}

impl DroneDetectorState {
    fn new(now_ms: u64) -> Self {
        Self {
            features: RingBuffer::new(DEFAULT_RING_CAPACITY),
            forest: None,
            samples_since_refit: 0,
            battery_z: ZScoreTracker::new(60),
            motor_z: ZScoreTracker::new(60),
            spoofing: GpsSpoofingDetector::default(),
            jamming: JammingDetector::default(),
            physical_ew: PhysicalEwDetector::default(),
            battery_model: BatteryHealthModel::default(),
            motor_model: MotorHealthModel::default(),
            battery_cycle_estimate: 0,
            first_seen_ms: now_ms,
        }
    }
}

/// Ties the ring buffers and every detector together, consuming normalized
/// telemetry off the lossy side of the bus and emitting [`Finding`]s on an
/// internal mpsc channel (spec §4.4/§4.5).
pub struct DetectionPipeline {
    drones: HashMap<DroneId, DroneDetectorState>,
    findings_tx: tokio::sync::mpsc::Sender<Finding>,
}

impl DetectionPipeline {
    pub fn new(findings_tx: tokio::sync::mpsc::Sender<Finding>) -> Self {
        Self { drones: HashMap::new(), findings_tx }
    }

    /// Runs until `cancel` fires or the bus's broadcast sender is dropped.
    /// Takes an owned receiver (from [`fleet_proto::TelemetryBus::subscribe_lossy`])
    /// rather than the bus itself, so it can be spawned as a `'static` task
    /// independent of the bus's own lifetime.
    pub async fn run(mut self, mut rx: broadcast::Receiver<fleet_proto::UnifiedMessage>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = rx.recv() => {
                    match received {
                        Ok(message) => self.ingest(message.drone_id, message.timestamp, &message.payload).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "detection pipeline dropped telemetry samples under load");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    async fn ingest(&mut self, drone_id: DroneId, timestamp: u64, payload: &MessagePayload) {
        let MessagePayload::Telemetry(sample) = payload else {
            return;
        };
        let state = self.drones.entry(drone_id).or_insert_with(|| DroneDetectorState::new(timestamp));

        let features = extract_features(sample);
        state.features.push(features);
        state.samples_since_refit += 1;
        if state.forest.is_none() && state.features.len() >= MIN_TRAINING_SAMPLES {
            Self::refit(state);
        } else if state.samples_since_refit >= REFIT_INTERVAL_SAMPLES && state.features.len() >= MIN_TRAINING_SAMPLES {
            Self::refit(state);
        }

        if let Some(forest) = &state.forest {
            let score = forest.score(&features);
            if score > crate::isolation_forest::ANOMALY_THRESHOLD {
                Self::emit(&self.findings_tx, 
                    Finding::new(
                        drone_id,
                        FindingType::BehavioralAnomaly,
                        score,
                        "isolation forest flagged telemetry vector as an outlier",
                    )
                    .with_features(feature_vector_labels(&features)),
                )
                .await;
            }
        }

        if let Some(voltage) = sample.systems.battery_voltage_v {
            if let Some(z) = state.battery_z.observe(voltage) {
                if state.battery_z.is_anomalous(voltage) {
                    Self::emit(&self.findings_tx, Finding::new(
                        drone_id,
                        FindingType::StatisticalAnomaly,
                        (z.abs() / 6.0).min(1.0),
                        format!("battery voltage z-score {z:.2} exceeds threshold"),
                    ))
                    .await;
                }
            }
            state.battery_cycle_estimate = state.battery_cycle_estimate.saturating_add(1);
            let age_days = (timestamp.saturating_sub(state.first_seen_ms)) as f64 / 86_400_000.0;
            let prediction = state.battery_model.predict(BatteryReading {
                voltage_v: voltage,
                temperature_c: sample.environment.temperature_c.unwrap_or(25.0),
                cycle_count: state.battery_cycle_estimate,
                age_days,
            });
            if prediction.degradation_rate > 0.6 {
                Self::emit(&self.findings_tx, Finding::with_confidence(
                    drone_id,
                    FindingType::BatteryDegradation,
                    prediction.degradation_rate.min(1.0),
                    prediction.confidence,
                    format!(
                        "estimated {:.1}h remaining useful life (confidence {:.2})",
                        prediction.remaining_useful_life_hours, prediction.confidence
                    ),
                ))
                .await;
            }
        }

        if let Some(motor_temps) = &sample.systems.motor_temps_c {
            if let Some(&max_temp) = motor_temps.iter().max_by(|a, b| a.total_cmp(b)) {
                if state.motor_z.observe(max_temp).is_some() && state.motor_z.is_anomalous(max_temp) {
                    let prediction = state.motor_model.predict(MotorReading {
                        vibration_mm_s: 0.0,
                        temperature_c: max_temp,
                        efficiency_pct: 95.0,
                        operating_hours: (timestamp.saturating_sub(state.first_seen_ms)) as f64 / 3_600_000.0,
                    });
                    Self::emit(&self.findings_tx, Finding::with_confidence(
                        drone_id,
                        FindingType::MotorDegradation,
                        prediction.degradation_rate.min(1.0),
                        prediction.confidence,
                        format!("motor temperature anomaly at {max_temp:.1}C"),
                    ))
                    .await;
                }
            }
        }

        let spoof = state.spoofing.observe(sample, timestamp);
        if spoof.score > 0.6 {
            let detail = match spoof.source_estimate {
                Some(est) => format!(
                    "implausible position jump, estimated source within {:.0}m of ({:.5}, {:.5})",
                    est.accuracy_radius_m, est.lat_deg, est.lon_deg
                ),
                None => "implausible position jump".to_string(),
            };
            Self::emit(&self.findings_tx, Finding::new(drone_id, FindingType::GpsSpoofing, spoof.score, detail)).await;
        }

        let jam_score = state.jamming.observe(sample);
        if jam_score > JAMMING_THRESHOLD {
            Self::emit(&self.findings_tx, Finding::new(
                drone_id,
                FindingType::Jamming,
                jam_score,
                "combined link-quality degradation consistent with jamming",
            ))
            .await;
        }

        let ew_score = state.physical_ew.observe(sample);
        if ew_score > 0.6 {
            Self::emit(&self.findings_tx, Finding::new(
                drone_id,
                FindingType::PhysicalEw,
                ew_score,
                "pressure/wind/flight-mode signature consistent with physical interference",
            ))
            .await;
        }
    }

    fn refit(state: &mut DroneDetectorState) {
        let window: Vec<FeatureVector> = state.features.iter().cloned().collect();
        state.forest = IsolationForestDetector::fit(&window);
        state.samples_since_refit = 0;
        debug!(samples = window.len(), "refit isolation forest");
    }

    async fn emit(findings_tx: &tokio::sync::mpsc::Sender<Finding>, finding: Finding) {
        if findings_tx.send(finding).await.is_err() {
            warn!("findings channel closed, dropping finding");
        }
    }
}
