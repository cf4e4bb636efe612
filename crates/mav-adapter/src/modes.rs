use fleet_proto::FlightMode;
use mavlink::common::{MavAutopilot, MavType};

/// Vehicle class used to pick a mode table, generalizing `mavkit::modes`'s
/// `VehicleClass` split from one connected vehicle to any inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VehicleClass {
    Copter,
    Plane,
    Rover,
    Unknown,
}

fn vehicle_class(vehicle_type: MavType) -> VehicleClass {
    match vehicle_type {
        MavType::MAV_TYPE_QUADROTOR
        | MavType::MAV_TYPE_HEXAROTOR
        | MavType::MAV_TYPE_OCTOROTOR
        | MavType::MAV_TYPE_TRICOPTER
        | MavType::MAV_TYPE_COAXIAL
        | MavType::MAV_TYPE_HELICOPTER => VehicleClass::Copter,
        MavType::MAV_TYPE_FIXED_WING => VehicleClass::Plane,
        MavType::MAV_TYPE_GROUND_ROVER => VehicleClass::Rover,
        _ => VehicleClass::Unknown,
    }
}

const COPTER_MODES: &[(u32, FlightMode)] = &[
    (0, FlightMode::Stabilize),
    (2, FlightMode::Stabilize),
    (3, FlightMode::Auto),
    (4, FlightMode::Guided),
    (5, FlightMode::Loiter),
    (6, FlightMode::Rtl),
    (9, FlightMode::Land),
];

const PLANE_MODES: &[(u32, FlightMode)] = &[
    (0, FlightMode::Manual),
    (2, FlightMode::Stabilize),
    (10, FlightMode::Auto),
    (11, FlightMode::Rtl),
    (12, FlightMode::Loiter),
    (15, FlightMode::Guided),
];

const ROVER_MODES: &[(u32, FlightMode)] = &[
    (0, FlightMode::Manual),
    (4, FlightMode::Loiter),
    (5, FlightMode::Loiter),
    (10, FlightMode::Auto),
    (11, FlightMode::Rtl),
    (15, FlightMode::Guided),
];

fn mode_table(autopilot: MavAutopilot, vehicle_type: MavType) -> &'static [(u32, FlightMode)] {
    if autopilot != MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA {
        return &[];
    }
    match vehicle_class(vehicle_type) {
        VehicleClass::Copter | VehicleClass::Unknown => COPTER_MODES,
        VehicleClass::Plane => PLANE_MODES,
        VehicleClass::Rover => ROVER_MODES,
    }
}

/// Decode a HEARTBEAT's `custom_mode` into a normalized flight mode,
/// grounded on `mavkit::modes::mode_name`'s per-vehicle-type table lookup.
/// `custom_mode` is autopilot-specific (ArduPilot packs a flight mode
/// number there; other autopilots use it differently), so outside ArduPilot
/// this always returns `Unknown` rather than guessing at a foreign
/// autopilot's encoding.
pub(crate) fn flight_mode_from_custom_mode(
    autopilot: MavAutopilot,
    vehicle_type: MavType,
    custom_mode: u32,
) -> FlightMode {
    mode_table(autopilot, vehicle_type)
        .iter()
        .find(|(num, _)| *num == custom_mode)
        .map(|(_, mode)| *mode)
        .unwrap_or(FlightMode::Unknown)
}
