//! Declarative process config (spec §6): loaded once at start from an
//! optional TOML file, then overridden field-by-field from the
//! environment. `GET/PUT /config` exposes the same struct at runtime; a
//! `PUT` only changes the in-memory copy, it never rewrites the file.

use std::net::Ipv4Addr;
use std::time::Duration;

use fleet_alert::{CorrelationRule, EscalationRule, NotificationTemplate, Recipient};
use fleet_router::LoadBalanceAlgorithm;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MavlinkConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_mavlink_url")]
    pub url: String,
    #[serde(default = "default_mavlink_timeout")]
    pub timeout: Duration,
}

fn default_mavlink_url() -> String {
    "udpin:0.0.0.0:14550".to_string()
}

fn default_mavlink_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for MavlinkConfig {
    fn default() -> Self {
        Self { enabled: true, url: default_mavlink_url(), timeout: default_mavlink_timeout() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyphalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cyphal_node_id")]
    pub node_id: u16,
    #[serde(default = "default_cyphal_port")]
    pub port: u16,
    #[serde(default = "default_multicast")]
    pub multicast: Ipv4Addr,
    #[serde(default = "default_redundant_ports")]
    pub redundant_ports: Vec<u16>,
}

fn default_cyphal_node_id() -> u16 {
    1
}
fn default_cyphal_port() -> u16 {
    9382
}
fn default_multicast() -> Ipv4Addr {
    Ipv4Addr::new(239, 65, 83, 72)
}
fn default_redundant_ports() -> Vec<u16> {
    vec![9383, 9384]
}

impl Default for CyphalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            node_id: default_cyphal_node_id(),
            port: default_cyphal_port(),
            multicast: default_multicast(),
            redundant_ports: default_redundant_ports(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewaySection {
    #[serde(default)]
    pub mavlink: MavlinkConfig,
    #[serde(default)]
    pub cyphal: CyphalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSection {
    #[serde(default = "default_true")]
    pub enable_failover: bool,
    #[serde(default)]
    pub algorithm: LoadBalanceAlgorithmConfig,
    #[serde(default = "default_breaker_threshold")]
    pub circuit_breaker_threshold: u32,
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval: Duration,
}

fn default_breaker_threshold() -> u32 {
    5
}
fn default_health_check_interval() -> Duration {
    Duration::from_secs(10)
}

impl Default for RoutingSection {
    fn default() -> Self {
        Self {
            enable_failover: true,
            algorithm: LoadBalanceAlgorithmConfig::default(),
            circuit_breaker_threshold: default_breaker_threshold(),
            health_check_interval: default_health_check_interval(),
        }
    }
}

/// Mirrors `fleet_router::LoadBalanceAlgorithm`; kept as a separate type
/// here only because the router crate's enum has no `Default` impl and
/// config wants one (`Adaptive`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalanceAlgorithmConfig {
    RoundRobin,
    Weighted,
    LeastCongested,
    LeastLatency,
    #[default]
    Adaptive,
}

impl From<LoadBalanceAlgorithmConfig> for LoadBalanceAlgorithm {
    fn from(value: LoadBalanceAlgorithmConfig) -> Self {
        match value {
            LoadBalanceAlgorithmConfig::RoundRobin => LoadBalanceAlgorithm::RoundRobin,
            LoadBalanceAlgorithmConfig::Weighted => LoadBalanceAlgorithm::Weighted,
            LoadBalanceAlgorithmConfig::LeastCongested => LoadBalanceAlgorithm::LeastCongested,
            LoadBalanceAlgorithmConfig::LeastLatency => LoadBalanceAlgorithm::LeastLatency,
            LoadBalanceAlgorithmConfig::Adaptive => LoadBalanceAlgorithm::Adaptive,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSection {
    #[serde(default = "default_true")]
    pub enable_caching: bool,
    #[serde(default = "default_cache_timeout")]
    pub cache_timeout: Duration,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_messages: usize,
    #[serde(default = "default_batching")]
    pub batching: bool,
}

fn default_cache_timeout() -> Duration {
    Duration::from_secs(5)
}
fn default_max_concurrent() -> usize {
    256
}
fn default_batching() -> bool {
    false
}

impl Default for PerformanceSection {
    fn default() -> Self {
        Self {
            enable_caching: true,
            cache_timeout: default_cache_timeout(),
            max_concurrent_messages: default_max_concurrent(),
            batching: default_batching(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSection {
    #[serde(default = "default_telemetry_buffer_size")]
    pub telemetry_buffer_size: usize,
    #[serde(default = "default_training_cadence")]
    pub training_cadence: usize,
}

fn default_telemetry_buffer_size() -> usize {
    fleet_proto::bus::DEFAULT_BUS_DEPTH
}
fn default_training_cadence() -> usize {
    50
}

impl Default for DetectionSection {
    fn default() -> Self {
        Self { telemetry_buffer_size: default_telemetry_buffer_size(), training_cadence: default_training_cadence() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertsSection {
    #[serde(default)]
    pub escalation_rules: EscalationRule,
    #[serde(default)]
    pub templates: Vec<NotificationTemplate>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub correlation_rules: Vec<CorrelationRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub routing: RoutingSection,
    #[serde(default)]
    pub performance: PerformanceSection,
    #[serde(default)]
    pub detection: DetectionSection,
    #[serde(default)]
    pub alerts: AlertsSection,
}

impl GatewayConfig {
    /// Loads a TOML file if `path` is given and exists, then applies
    /// `GATEWAYD_*` environment overrides on top of whatever was loaded
    /// (or the hardcoded defaults, if no file was given).
    pub fn load(path: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path)?;
                toml::from_str(&text)?
            }
            _ => GatewayConfig::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("GATEWAYD_MAVLINK_URL") {
            self.gateway.mavlink.url = val;
        }
        if let Ok(val) = std::env::var("GATEWAYD_MAVLINK_ENABLED") {
            if let Ok(parsed) = val.parse() {
                self.gateway.mavlink.enabled = parsed;
            }
        }
        if let Ok(val) = std::env::var("GATEWAYD_CYPHAL_ENABLED") {
            if let Ok(parsed) = val.parse() {
                self.gateway.cyphal.enabled = parsed;
            }
        }
        if let Ok(val) = std::env::var("GATEWAYD_CYPHAL_NODE_ID") {
            if let Ok(parsed) = val.parse() {
                self.gateway.cyphal.node_id = parsed;
            }
        }
        if let Ok(val) = std::env::var("GATEWAYD_BREAKER_THRESHOLD") {
            if let Ok(parsed) = val.parse() {
                self.routing.circuit_breaker_threshold = parsed;
            }
        }
        if let Ok(val) = std::env::var("GATEWAYD_TELEMETRY_BUFFER_SIZE") {
            if let Ok(parsed) = val.parse() {
                self.detection.telemetry_buffer_size = parsed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = GatewayConfig::default();
        let text = toml::to_string(&config).expect("serialize");
        let parsed: GatewayConfig = toml::from_str(&text).expect("parse");
        assert_eq!(parsed.gateway.cyphal.node_id, config.gateway.cyphal.node_id);
    }

    #[test]
    fn env_override_wins_over_file_default() {
        std::env::set_var("GATEWAYD_BREAKER_THRESHOLD", "9");
        let config = GatewayConfig::load(None).unwrap();
        assert_eq!(config.routing.circuit_breaker_threshold, 9);
        std::env::remove_var("GATEWAYD_BREAKER_THRESHOLD");
    }
}
