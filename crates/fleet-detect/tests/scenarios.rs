use fleet_proto::{DeliveryOptions, DroneId, MessageIdGenerator, MessagePayload, Priority, SourceProtocol, TelemetryBus, UnifiedMessage};
use fleet_detect::DetectionPipeline;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

fn telemetry_message(id_gen: &MessageIdGenerator, drone_id: DroneId, timestamp: u64, sample: fleet_proto::TelemetrySample) -> UnifiedMessage {
    UnifiedMessage {
        message_id: id_gen.next(),
        drone_id,
        source_protocol: SourceProtocol::Mavlink,
        timestamp,
        priority: Priority::Normal,
        payload: MessagePayload::Telemetry(sample),
        delivery: DeliveryOptions::default(),
        external_sequence_number: None,
    }
}

fn position_sample(lat: f64, lon: f64) -> fleet_proto::TelemetrySample {
    let mut sample = fleet_proto::TelemetrySample::default();
    sample.position.lat_deg = Some(lat);
    sample.position.lon_deg = Some(lon);
    sample.position.alt_m = Some(100.0);
    sample.systems.signal_strength_dbm = Some(-60.0);
    sample.motion.velocity_mps = Some([1.0, 0.0, 0.0]);
    sample.motion.acceleration_mps2 = Some([0.1, 0.0, 0.0]);
    sample
}

/// Scenario 1 (spoof detection): feed samples drifting slowly, then a
/// single implausible jump; expect a `gps_spoofing` finding.
#[tokio::test]
async fn slow_drift_then_teleport_flags_gps_spoofing() {
    let mut bus = TelemetryBus::new(256);
    let rx = bus.subscribe_lossy();
    let (findings_tx, mut findings_rx) = tokio::sync::mpsc::channel(64);
    let cancel = CancellationToken::new();
    let pipeline = DetectionPipeline::new(findings_tx);
    let pipeline_cancel = cancel.clone();
    tokio::spawn(pipeline.run(rx, pipeline_cancel));

    let id_gen = MessageIdGenerator::new();
    let drone_id = DroneId(7);

    let mut lat = 37.0;
    let lon = -122.0;
    for i in 0..50 {
        let ts = i * 1_000;
        let message = telemetry_message(&id_gen, drone_id, ts, position_sample(lat, lon));
        bus.publish(message).await.unwrap();
        lat += 0.00005; // roughly a few m/s drift
    }
    let jump_ts = 50 * 1_000;
    let jumped = telemetry_message(&id_gen, drone_id, jump_ts + 1_000, position_sample(lat + 0.5, lon + 0.5));
    bus.publish(jumped).await.unwrap();

    let finding = timeout(Duration::from_secs(1), findings_rx.recv())
        .await
        .expect("a finding should be emitted")
        .expect("channel open");
    assert_eq!(finding.finding_type, fleet_detect::FindingType::GpsSpoofing);
    assert!(finding.score >= 0.6);
    cancel.cancel();
}

/// Scenario 3 (battery emergency): low voltage, high temperature, heavy
/// cycle count should predict a short remaining useful life.
#[test]
fn severe_battery_reading_predicts_short_remaining_life() {
    let model = fleet_detect::BatteryHealthModel::default();
    let prediction = model.predict(fleet_detect::BatteryReading {
        voltage_v: 3.1,
        temperature_c: 62.0,
        cycle_count: 900,
        age_days: 75.0,
    });
    assert!(prediction.remaining_useful_life_hours < 24.0, "rul was {}", prediction.remaining_useful_life_hours);
    assert!(prediction.confidence >= 0.3 && prediction.confidence <= 1.0);
}
