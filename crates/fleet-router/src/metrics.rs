use fleet_proto::SourceProtocol;
use std::time::{Duration, Instant};

pub const DEFAULT_EWMA_ALPHA: f64 = 0.1;
const STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Per-protocol routing health, updated after every send attempt (spec
/// §3/§4.3). Decays toward neutral defaults once stale for longer than
/// `STALE_AFTER`, so a protocol that stops reporting doesn't freeze at a
/// stale optimistic (or pessimistic) score forever.
#[derive(Debug, Clone)]
pub struct RoutingMetrics {
    pub protocol: SourceProtocol,
    pub latency_ewma_ms: f64,
    pub success_rate_ewma: f64,
    pub bandwidth_estimate_bps: f64,
    pub reliability: f64,
    pub cost: f64,
    pub congestion: f64,
    pub last_updated: Instant,
}

impl RoutingMetrics {
    pub fn new(protocol: SourceProtocol) -> Self {
        Self {
            protocol,
            latency_ewma_ms: 50.0,
            success_rate_ewma: 1.0,
            bandwidth_estimate_bps: 1_000_000.0,
            reliability: 1.0,
            cost: 0.5,
            congestion: 0.0,
            last_updated: Instant::now(),
        }
    }

    /// Fold in one send outcome. `latency_ms` is ignored on failure since
    /// there's no meaningful round-trip to measure.
    pub fn record(&mut self, alpha: f64, success: bool, latency_ms: Option<f64>) {
        self.decay_if_stale();
        let outcome = if success { 1.0 } else { 0.0 };
        self.success_rate_ewma = ewma(self.success_rate_ewma, outcome, alpha);
        if let Some(latency) = latency_ms {
            self.latency_ewma_ms = ewma(self.latency_ewma_ms, latency, alpha);
        }
        self.reliability = ewma(self.reliability, outcome, alpha);
        self.last_updated = Instant::now();
    }

    pub fn record_congestion(&mut self, alpha: f64, sample: f64) {
        self.congestion = ewma(self.congestion, sample, alpha);
        self.last_updated = Instant::now();
    }

    fn decay_if_stale(&mut self) {
        if self.last_updated.elapsed() > STALE_AFTER {
            let fresh = RoutingMetrics::new(self.protocol);
            self.latency_ewma_ms = fresh.latency_ewma_ms;
            self.success_rate_ewma = fresh.success_rate_ewma;
            self.reliability = fresh.reliability;
            self.congestion = fresh.congestion;
        }
    }
}

fn ewma(previous: f64, sample: f64, alpha: f64) -> f64 {
    alpha * sample + (1.0 - alpha) * previous
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_moves_success_rate_toward_outcome() {
        let mut metrics = RoutingMetrics::new(SourceProtocol::Mavlink);
        metrics.record(0.1, false, None);
        assert!(metrics.success_rate_ewma < 1.0);
        assert!((metrics.success_rate_ewma - 0.9).abs() < 1e-9);
    }

    #[test]
    fn stale_metrics_decay_to_neutral_defaults() {
        let mut metrics = RoutingMetrics::new(SourceProtocol::Mavlink);
        metrics.success_rate_ewma = 0.1;
        metrics.last_updated = Instant::now() - Duration::from_secs(10 * 60);
        metrics.decay_if_stale();
        assert_eq!(metrics.success_rate_ewma, 1.0);
    }
}
