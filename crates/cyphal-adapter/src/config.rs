use std::net::Ipv4Addr;
use std::time::Duration;

/// Configuration for a Cyphal/UDP adapter instance, matching the
/// `gateway.cyphal` section of the control-plane config (spec §6).
#[derive(Debug, Clone)]
pub struct CyphalAdapterConfig {
    pub local_node_id: u16,
    pub multicast_group: Ipv4Addr,
    pub primary_port: u16,
    pub redundant_ports: Vec<u16>,
    pub transfer_dedup_window: Duration,
    pub bind_address: Ipv4Addr,
}

impl Default for CyphalAdapterConfig {
    fn default() -> Self {
        Self {
            local_node_id: 1,
            multicast_group: Ipv4Addr::new(239, 65, 83, 72),
            primary_port: 9382,
            redundant_ports: vec![9383, 9384],
            transfer_dedup_window: Duration::from_secs(5),
            bind_address: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl CyphalAdapterConfig {
    /// Applies `CYPHAL_ADAPTER_*` environment overrides on top of defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(val) = std::env::var("CYPHAL_ADAPTER_NODE_ID") {
            if let Ok(parsed) = val.parse() {
                cfg.local_node_id = parsed;
            }
        }
        if let Ok(val) = std::env::var("CYPHAL_ADAPTER_PRIMARY_PORT") {
            if let Ok(parsed) = val.parse() {
                cfg.primary_port = parsed;
            }
        }
        cfg
    }

    pub fn all_ports(&self) -> Vec<u16> {
        let mut ports = vec![self.primary_port];
        ports.extend(self.redundant_ports.iter().copied());
        ports
    }
}
