use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingStrategy {
    /// Best-scoring available protocol.
    Direct,
    /// Try best; on a retriable failure, try the next within
    /// `fallback_timeout`, up to `max_retries`.
    Failover,
    /// Send on the top-N protocols concurrently; first ACK wins.
    Redundant { n: usize },
    /// Prefer mesh-capable protocols; otherwise behave like `Direct`.
    Mesh,
}

#[derive(Debug, Clone, Copy)]
pub struct FailoverConfig {
    pub fallback_timeout: Duration,
    pub max_retries: u8,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            fallback_timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}
