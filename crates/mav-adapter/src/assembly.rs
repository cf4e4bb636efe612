use fleet_proto::{Comms, Environment, FlightMode, MissionStatus, Motion, Position, Systems, TelemetrySample};
use mavlink::common::MavMessage;

/// Apply unit conversions for one inbound MAVLink message onto `sample`,
/// generalizing `mavkit::event_loop::update_state`'s per-message-type
/// handling across the full set in §4.1. Unhandled message types are a
/// no-op (the event loop still uses them for liveness/target tracking).
pub fn apply_message(sample: &mut TelemetrySample, message: &MavMessage) {
    match message {
        MavMessage::GLOBAL_POSITION_INT(data) => {
            sample.position = Position {
                lat_deg: Some(data.lat as f64 / 1e7),
                lon_deg: Some(data.lon as f64 / 1e7),
                alt_m: Some(data.alt as f64 / 1000.0),
                rel_alt_m: Some(data.relative_alt as f64 / 1000.0),
            };
            let vx = data.vx as f64 / 100.0;
            let vy = data.vy as f64 / 100.0;
            let vz = data.vz as f64 / 100.0;
            sample.motion.velocity_mps = Some([vx, vy, vz]);
            if data.hdg != u16::MAX {
                sample.systems.compass_heading_deg = Some(data.hdg as f64 / 100.0);
            }
        }
        MavMessage::ATTITUDE(data) => {
            sample.motion.angular_velocity_radps = Some([
                data.rollspeed as f64,
                data.pitchspeed as f64,
                data.yawspeed as f64,
            ]);
        }
        MavMessage::SYS_STATUS(data) => {
            if data.voltage_battery != u16::MAX {
                sample.systems.battery_voltage_v = Some(data.voltage_battery as f64 / 1000.0);
            }
            if data.current_battery >= 0 {
                sample.systems.battery_current_a = Some(data.current_battery as f64 * 10.0 / 1000.0);
            }
            if data.battery_remaining >= 0 {
                sample.systems.battery_remaining_pct = Some(data.battery_remaining as f64);
            }
        }
        MavMessage::VFR_HUD(data) => {
            sample.position.alt_m.get_or_insert(data.alt as f64);
            sample.motion.velocity_mps.get_or_insert([
                data.groundspeed as f64,
                0.0,
                data.climb as f64,
            ]);
            sample.systems.compass_heading_deg.get_or_insert(data.heading as f64);
        }
        MavMessage::BATTERY_STATUS(data) => {
            if data.temperature != i16::MAX {
                sample.environment.temperature_c = Some(data.temperature as f64 / 100.0);
            }
            let cell_sum: i64 = data
                .voltages
                .iter()
                .filter(|v| **v != u16::MAX)
                .map(|v| *v as i64)
                .sum();
            if cell_sum > 0 {
                sample.systems.battery_voltage_v = Some(cell_sum as f64 / 1000.0);
            }
            if data.current_battery >= 0 {
                sample.systems.battery_current_a = Some(data.current_battery as f64 * 10.0 / 1000.0);
            }
        }
        MavMessage::VIBRATION(data) => {
            sample.systems.motor_temps_c = sample.systems.motor_temps_c.clone().or(Some(vec![
                data.vibration_x as f64,
                data.vibration_y as f64,
                data.vibration_z as f64,
            ]));
        }
        MavMessage::GPS_RAW_INT(data) => {
            if data.eph != u16::MAX {
                sample.systems.gps_accuracy_m = Some(data.eph as f64 / 100.0);
            }
            sample.position.lat_deg.get_or_insert(data.lat as f64 / 1e7);
            sample.position.lon_deg.get_or_insert(data.lon as f64 / 1e7);
        }
        MavMessage::EKF_STATUS_REPORT(data) => {
            sample.mission.ekf_ok = Some(
                data.flags.contains(mavlink::common::EkfStatusFlags::EKF_ATTITUDE)
                    && data
                        .flags
                        .contains(mavlink::common::EkfStatusFlags::EKF_POS_HORIZ_ABS),
            );
        }
        MavMessage::HEARTBEAT(hb) => {
            sample.mission.armed = hb
                .base_mode
                .contains(mavlink::common::MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED);
            sample.mission.flight_mode = flight_mode_from_heartbeat(hb);
        }
        MavMessage::MISSION_CURRENT(data) => {
            sample.mission.current_waypoint = Some(data.seq);
            if data.total > 0 {
                sample.mission.progress_pct =
                    Some(data.seq as f64 / data.total as f64 * 100.0);
            }
        }
        _ => {}
    }
}

/// `system_status` (MAV_STATE) reports overall vehicle health, not the
/// navigation mode; it only overrides the `custom_mode`-derived flight mode
/// for the two states that mean the autopilot has left its commanded mode
/// to handle a fault. Everything else defers to
/// `modes::flight_mode_from_custom_mode`, the actual navigation-mode field.
fn flight_mode_from_heartbeat(hb: &mavlink::common::HEARTBEAT_DATA) -> FlightMode {
    use mavlink::common::MavState;
    match hb.system_status {
        MavState::MAV_STATE_EMERGENCY => FlightMode::Emergency,
        MavState::MAV_STATE_CRITICAL => FlightMode::Failsafe,
        _ => crate::modes::flight_mode_from_custom_mode(hb.autopilot, hb.mavtype, hb.custom_mode),
    }
}

/// Communications quality derived from the link layer rather than a single
/// MAVLink message; the adapter's event loop feeds counters in directly.
pub fn apply_comms(sample: &mut TelemetrySample, comms: Comms) {
    sample.comms = comms;
}

pub fn blank_environment() -> Environment {
    Environment::default()
}

pub fn blank_motion() -> Motion {
    Motion::default()
}

pub fn blank_mission() -> MissionStatus {
    MissionStatus::default()
}

pub fn blank_systems() -> Systems {
    Systems::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::common::{GLOBAL_POSITION_INT_DATA, MavMessage};

    #[test]
    fn global_position_int_converts_to_si_units() {
        let mut sample = TelemetrySample::default();
        let msg = MavMessage::GLOBAL_POSITION_INT(GLOBAL_POSITION_INT_DATA {
            time_boot_ms: 0,
            lat: 473_977_420, // 47.3977420 deg
            lon: 85_455_60,
            alt: 500_000, // 500 m
            relative_alt: 100_000,
            vx: 500,
            vy: 0,
            vz: -100,
            hdg: 9000,
        });
        apply_message(&mut sample, &msg);
        assert!((sample.position.lat_deg.unwrap() - 47.397742).abs() < 1e-6);
        assert!((sample.position.alt_m.unwrap() - 500.0).abs() < 1e-6);
        assert!((sample.position.rel_alt_m.unwrap() - 100.0).abs() < 1e-6);
        assert_eq!(sample.systems.compass_heading_deg, Some(90.0));
    }
}
