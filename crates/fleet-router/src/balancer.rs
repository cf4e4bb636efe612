use crate::metrics::RoutingMetrics;
use fleet_proto::SourceProtocol;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalanceAlgorithm {
    RoundRobin,
    Weighted,
    LeastCongested,
    LeastLatency,
    Adaptive,
}

/// Picks among equivalently-scored protocols once the router's scoring
/// pass has narrowed the candidate set (spec §4.3). Round-robin keeps a
/// cursor shared across calls; the rest are pure functions of the current
/// metrics snapshot.
pub struct LoadBalancer {
    algorithm: LoadBalanceAlgorithm,
    round_robin_cursor: AtomicUsize,
}

impl LoadBalancer {
    pub fn new(algorithm: LoadBalanceAlgorithm) -> Self {
        Self {
            algorithm,
            round_robin_cursor: AtomicUsize::new(0),
        }
    }

    /// `candidates` must be non-empty. Returns the chosen protocol.
    pub fn select(&self, candidates: &[RoutingMetrics], best_score: f64, scores: &[f64]) -> SourceProtocol {
        debug_assert_eq!(candidates.len(), scores.len());
        match self.algorithm {
            LoadBalanceAlgorithm::RoundRobin => {
                let idx = self.round_robin_cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
                candidates[idx].protocol
            }
            LoadBalanceAlgorithm::Weighted => candidates
                .iter()
                .max_by(|a, b| {
                    weighted_score(a)
                        .partial_cmp(&weighted_score(b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|m| m.protocol)
                .unwrap_or(candidates[0].protocol),
            LoadBalanceAlgorithm::LeastCongested => candidates
                .iter()
                .min_by(|a, b| {
                    a.congestion
                        .partial_cmp(&b.congestion)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|m| m.protocol)
                .unwrap_or(candidates[0].protocol),
            LoadBalanceAlgorithm::LeastLatency => candidates
                .iter()
                .min_by(|a, b| {
                    a.latency_ewma_ms
                        .partial_cmp(&b.latency_ewma_ms)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|m| m.protocol)
                .unwrap_or(candidates[0].protocol),
            LoadBalanceAlgorithm::Adaptive => {
                // Cluster within 90% of the best score, then randomize to
                // avoid herding every sender onto the single top pick.
                let threshold = best_score * 0.9;
                let cluster: Vec<usize> = scores
                    .iter()
                    .enumerate()
                    .filter(|(_, &s)| s >= threshold)
                    .map(|(i, _)| i)
                    .collect();
                let pick = if cluster.is_empty() {
                    0
                } else {
                    cluster[rand::thread_rng().gen_range(0..cluster.len())]
                };
                candidates[pick].protocol
            }
        }
    }
}

fn weighted_score(metrics: &RoutingMetrics) -> f64 {
    (1.0 / (metrics.latency_ewma_ms + 1.0)) * metrics.success_rate_ewma
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics_with(protocol: SourceProtocol, latency: f64, success: f64) -> RoutingMetrics {
        let mut m = RoutingMetrics::new(protocol);
        m.latency_ewma_ms = latency;
        m.success_rate_ewma = success;
        m
    }

    #[test]
    fn round_robin_cycles_through_candidates() {
        let balancer = LoadBalancer::new(LoadBalanceAlgorithm::RoundRobin);
        let candidates = vec![
            metrics_with(SourceProtocol::Mavlink, 10.0, 1.0),
            metrics_with(SourceProtocol::Cyphal, 10.0, 1.0),
        ];
        let scores = vec![80.0, 80.0];
        let first = balancer.select(&candidates, 80.0, &scores);
        let second = balancer.select(&candidates, 80.0, &scores);
        assert_ne!(first, second);
    }

    #[test]
    fn least_latency_picks_the_faster_protocol() {
        let balancer = LoadBalancer::new(LoadBalanceAlgorithm::LeastLatency);
        let candidates = vec![
            metrics_with(SourceProtocol::Mavlink, 50.0, 1.0),
            metrics_with(SourceProtocol::Cyphal, 5.0, 1.0),
        ];
        let scores = vec![60.0, 90.0];
        assert_eq!(balancer.select(&candidates, 90.0, &scores), SourceProtocol::Cyphal);
    }
}
