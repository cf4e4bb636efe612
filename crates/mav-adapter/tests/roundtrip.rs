//! L1: a command encoded for MAVLink and decoded back must reproduce the
//! command's semantic content (name resolves to the same MAV_CMD, params
//! survive the f64->f32 narrowing within tolerance).

use fleet_proto::{CommandPayload, DeliveryOptions, DroneId, MessageId, MessagePayload, Priority,
    SourceProtocol, UnifiedMessage};
use mavlink::common::{MavCmd, MavMessage};

fn arm_command(drone: u64) -> UnifiedMessage {
    UnifiedMessage {
        message_id: MessageId(1),
        drone_id: DroneId(drone),
        source_protocol: SourceProtocol::Internal,
        timestamp: 0,
        priority: Priority::Critical,
        payload: MessagePayload::Command(CommandPayload {
            command: "ARM".to_string(),
            params: vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            confirmation: 0,
        }),
        delivery: DeliveryOptions::default(),
        external_sequence_number: None,
    }
}

#[test]
fn arm_command_round_trips_through_command_long() {
    let msg = arm_command(3);
    let frame = mav_adapter_internal::outbound_encode(&msg, 3, 1).expect("encodes");
    match frame {
        MavMessage::COMMAND_LONG(data) => {
            assert_eq!(data.command, MavCmd::MAV_CMD_COMPONENT_ARM_DISARM);
            assert_eq!(data.target_system, 3);
            assert!((data.param1 - 1.0).abs() < 1e-6);
        }
        other => panic!("expected COMMAND_LONG, got {other:?}"),
    }
}

#[test]
fn global_position_int_assembles_into_telemetry_sample() {
    use fleet_proto::TelemetrySample;
    use mavlink::common::{GLOBAL_POSITION_INT_DATA, MavMessage as M};

    let inbound = M::GLOBAL_POSITION_INT(GLOBAL_POSITION_INT_DATA {
        time_boot_ms: 1000,
        lat: 450_000_000,
        lon: -730_000_000,
        alt: 120_000,
        relative_alt: 50_000,
        vx: 0,
        vy: 0,
        vz: 0,
        hdg: 18000,
    });

    let mut sample = TelemetrySample::default();
    mav_adapter_internal::assembly_apply(&mut sample, &inbound);

    assert_eq!(sample.position.lat_deg, Some(45.0));
    assert_eq!(sample.position.lon_deg, Some(-73.0));
    assert_eq!(sample.position.alt_m, Some(120.0));
    assert_eq!(sample.systems.compass_heading_deg, Some(180.0));
}

/// The adapter's assembly/outbound modules are crate-private; this shim
/// re-exercises them through the same entry points the event loop uses,
/// kept in a tiny internal-facing module so the round-trip test doesn't
/// need `pub` visibility changes on internal implementation details.
mod mav_adapter_internal {
    pub fn outbound_encode(
        message: &fleet_proto::UnifiedMessage,
        target_system: u8,
        target_component: u8,
    ) -> Result<mavlink::common::MavMessage, String> {
        mav_adapter::test_support::encode(message, target_system, target_component)
    }

    pub fn assembly_apply(
        sample: &mut fleet_proto::TelemetrySample,
        message: &mavlink::common::MavMessage,
    ) {
        mav_adapter::test_support::apply_message(sample, message)
    }
}
