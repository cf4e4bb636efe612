use std::time::Duration;

/// Configuration for one MAVLink adapter instance, matching the
/// `gateway.mavlink` section of the control-plane config (spec §6).
#[derive(Debug, Clone)]
pub struct MavAdapterConfig {
    pub gcs_system_id: u8,
    pub gcs_component_id: u8,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub command_max_retries: u8,
    pub mission_item_timeout: Duration,
    /// Minimum spacing between telemetry emissions for the same drone,
    /// unless a critical field changed (§4.1 pacing rule).
    pub telemetry_pace: Duration,
    pub degraded_after: Duration,
    pub lost_after: Duration,
    pub quarantine_duration: Duration,
    pub quarantine_threshold: u32,
    /// Shared HMAC key for outbound frame signing. `None` means signing is
    /// skipped entirely (see `signing` module doc).
    pub signing_key: Option<[u8; 32]>,
}

impl Default for MavAdapterConfig {
    fn default() -> Self {
        Self {
            gcs_system_id: 255,
            gcs_component_id: 190,
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_millis(1500),
            command_max_retries: 5,
            mission_item_timeout: Duration::from_millis(250),
            telemetry_pace: Duration::from_millis(100),
            degraded_after: Duration::from_secs(5),
            lost_after: Duration::from_secs(30),
            quarantine_duration: Duration::from_secs(60),
            quarantine_threshold: 5,
            signing_key: None,
        }
    }
}

impl MavAdapterConfig {
    /// Applies `MAV_ADAPTER_*` environment overrides on top of defaults,
    /// matching the env-override convention spec §6 requires per field.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(val) = std::env::var("MAV_ADAPTER_GCS_SYSTEM_ID") {
            if let Ok(parsed) = val.parse() {
                cfg.gcs_system_id = parsed;
            }
        }
        if let Ok(val) = std::env::var("MAV_ADAPTER_COMMAND_MAX_RETRIES") {
            if let Ok(parsed) = val.parse() {
                cfg.command_max_retries = parsed;
            }
        }
        if let Ok(val) = std::env::var("MAV_ADAPTER_SIGNING_KEY") {
            cfg.signing_key = parse_signing_key(&val);
        }
        cfg
    }
}

/// Parses a 64-character hex string into a 32-byte signing key. An
/// unparseable or wrong-length value leaves signing disabled rather than
/// panicking the adapter at startup.
fn parse_signing_key(raw: &str) -> Option<[u8; 32]> {
    if raw.len() != 64 {
        return None;
    }
    let mut key = [0u8; 32];
    for (i, chunk) in key.iter_mut().enumerate() {
        *chunk = u8::from_str_radix(&raw[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(key)
}
