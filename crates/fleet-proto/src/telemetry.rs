use serde::{Deserialize, Serialize};

/// Normalized position. Always SI units / degrees, regardless of the wire
/// representation (MAVLink's 1e7-scaled lat/lon and mm altitudes are
/// converted at the adapter boundary before this struct is built).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat_deg: Option<f64>,
    pub lon_deg: Option<f64>,
    pub alt_m: Option<f64>,
    pub rel_alt_m: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub velocity_mps: Option<[f64; 3]>,
    pub acceleration_mps2: Option<[f64; 3]>,
    pub angular_velocity_radps: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Systems {
    pub battery_voltage_v: Option<f64>,
    pub battery_current_a: Option<f64>,
    pub battery_remaining_pct: Option<f64>,
    pub motor_temps_c: Option<Vec<f64>>,
    pub signal_strength_dbm: Option<f64>,
    pub gps_accuracy_m: Option<f64>,
    pub compass_heading_deg: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub wind_speed_mps: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub temperature_c: Option<f64>,
    pub pressure_pa: Option<f64>,
    pub humidity_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlightMode {
    Manual,
    Stabilize,
    Guided,
    Auto,
    Loiter,
    Rtl,
    Land,
    Emergency,
    Failsafe,
    Unknown,
}

impl Default for FlightMode {
    fn default() -> Self {
        FlightMode::Unknown
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionStatus {
    pub flight_mode: FlightMode,
    pub armed: bool,
    pub progress_pct: Option<f64>,
    pub current_waypoint: Option<u16>,
    pub ekf_ok: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comms {
    pub packets_tx: Option<u64>,
    pub packets_rx: Option<u64>,
    pub packet_loss_pct: Option<f64>,
    pub latency_ms: Option<f64>,
    pub throughput_bps: Option<f64>,
}

/// Normalized telemetry sample, assembled from one or more adapter frames.
/// Every field except `Position`/`MissionStatus`'s required members is
/// optional: a missing reading is encoded absent, never as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub position: Position,
    pub motion: Motion,
    pub systems: Systems,
    pub environment: Environment,
    pub mission: MissionStatus,
    pub comms: Comms,
}

impl TelemetrySample {
    /// True when at least one field a detector could score is present.
    pub fn has_any_reading(&self) -> bool {
        self.position.lat_deg.is_some()
            || self.position.alt_m.is_some()
            || self.motion.velocity_mps.is_some()
            || self.systems.battery_voltage_v.is_some()
            || self.comms.packet_loss_pct.is_some()
    }

    /// Merge another sample's present fields on top of this one. Used when
    /// an adapter assembles one sample from several inbound frame types
    /// (e.g. MAVLink's ATTITUDE + GLOBAL_POSITION_INT + SYS_STATUS).
    pub fn merge_from(&mut self, other: &TelemetrySample) {
        macro_rules! take {
            ($field:expr, $other:expr) => {
                if $other.is_some() {
                    $field = $other.clone();
                }
            };
        }
        take!(self.position.lat_deg, other.position.lat_deg);
        take!(self.position.lon_deg, other.position.lon_deg);
        take!(self.position.alt_m, other.position.alt_m);
        take!(self.position.rel_alt_m, other.position.rel_alt_m);
        take!(self.motion.velocity_mps, other.motion.velocity_mps);
        take!(
            self.motion.acceleration_mps2,
            other.motion.acceleration_mps2
        );
        take!(
            self.motion.angular_velocity_radps,
            other.motion.angular_velocity_radps
        );
        take!(
            self.systems.battery_voltage_v,
            other.systems.battery_voltage_v
        );
        take!(
            self.systems.battery_current_a,
            other.systems.battery_current_a
        );
        take!(
            self.systems.battery_remaining_pct,
            other.systems.battery_remaining_pct
        );
        take!(self.systems.motor_temps_c, other.systems.motor_temps_c);
        take!(
            self.systems.signal_strength_dbm,
            other.systems.signal_strength_dbm
        );
        take!(self.systems.gps_accuracy_m, other.systems.gps_accuracy_m);
        take!(
            self.systems.compass_heading_deg,
            other.systems.compass_heading_deg
        );
        take!(self.environment.wind_speed_mps, other.environment.wind_speed_mps);
        take!(
            self.environment.wind_direction_deg,
            other.environment.wind_direction_deg
        );
        take!(self.environment.temperature_c, other.environment.temperature_c);
        take!(self.environment.pressure_pa, other.environment.pressure_pa);
        take!(self.environment.humidity_pct, other.environment.humidity_pct);
        if other.mission.flight_mode != FlightMode::Unknown {
            self.mission.flight_mode = other.mission.flight_mode;
        }
        self.mission.armed = self.mission.armed || other.mission.armed;
        take!(self.mission.progress_pct, other.mission.progress_pct);
        take!(self.mission.current_waypoint, other.mission.current_waypoint);
        take!(self.mission.ekf_ok, other.mission.ekf_ok);
        take!(self.comms.packets_tx, other.comms.packets_tx);
        take!(self.comms.packets_rx, other.comms.packets_rx);
        take!(self.comms.packet_loss_pct, other.comms.packet_loss_pct);
        take!(self.comms.latency_ms, other.comms.latency_ms);
        take!(self.comms.throughput_bps, other.comms.throughput_bps);
    }

    /// Whether any field considered "critical" for emission pacing (§4.1)
    /// differs between two samples.
    pub fn critical_fields_changed(&self, previous: &TelemetrySample) -> bool {
        self.mission.armed != previous.mission.armed
            || self.mission.flight_mode != previous.mission.flight_mode
            || self.mission.ekf_ok != previous.mission.ekf_ok
            || matches!(
                (self.systems.battery_remaining_pct, previous.systems.battery_remaining_pct),
                (Some(now), Some(prev)) if now < 20.0 && prev >= 20.0
            )
    }
}
