use crate::metrics::RoutingMetrics;
use fleet_proto::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    Primary,
    Backup,
    Avoid,
}

/// Priority-weighted combination of latency/reliability/bandwidth/cost
/// into a 0-100 score (spec §4.3). Weights favor latency+reliability for
/// time-critical traffic and bandwidth+cost for background traffic.
struct Weights {
    latency: f64,
    reliability: f64,
    bandwidth: f64,
    cost: f64,
}

fn weights_for(priority: Priority) -> Weights {
    match priority {
        Priority::Critical => Weights {
            latency: 0.4,
            reliability: 0.4,
            bandwidth: 0.1,
            cost: 0.1,
        },
        Priority::High => Weights {
            latency: 0.35,
            reliability: 0.35,
            bandwidth: 0.15,
            cost: 0.15,
        },
        Priority::Normal => Weights {
            latency: 0.25,
            reliability: 0.25,
            bandwidth: 0.25,
            cost: 0.25,
        },
        Priority::Low => Weights {
            latency: 0.15,
            reliability: 0.2,
            bandwidth: 0.3,
            cost: 0.35,
        },
        Priority::Background => Weights {
            latency: 0.1,
            reliability: 0.1,
            bandwidth: 0.3,
            cost: 0.25,
        },
    }
}

/// Score one protocol's metrics for `priority`, 0-100. Higher is better.
/// Deterministic given the metrics snapshot and priority (L3).
pub fn score(metrics: &RoutingMetrics, priority: Priority) -> f64 {
    let weights = weights_for(priority);
    let latency_score = 100.0 / (1.0 + metrics.latency_ewma_ms / 100.0);
    let reliability_score = metrics.reliability * 100.0;
    let bandwidth_score = (metrics.bandwidth_estimate_bps / 1_000_000.0).min(1.0) * 100.0;
    let cost_score = (1.0 - metrics.cost.clamp(0.0, 1.0)) * 100.0;
    let congestion_penalty = metrics.congestion.clamp(0.0, 1.0) * 20.0;

    (weights.latency * latency_score
        + weights.reliability * reliability_score
        + weights.bandwidth * bandwidth_score
        + weights.cost * cost_score
        - congestion_penalty)
        .clamp(0.0, 100.0)
}

pub fn recommendation(score: f64) -> Recommendation {
    if score >= 80.0 {
        Recommendation::Primary
    } else if score >= 50.0 {
        Recommendation::Backup
    } else {
        Recommendation::Avoid
    }
}

/// Rank candidates by score (descending), breaking ties by lower
/// latency_ewma then by protocol name for stability (spec §4.3: "tie-break
/// is stable by protocol name to avoid flapping").
pub fn rank<'a>(
    candidates: &'a [(RoutingMetrics, f64)],
) -> Vec<&'a (RoutingMetrics, f64)> {
    let mut ranked: Vec<&(RoutingMetrics, f64)> = candidates.iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.0.latency_ewma_ms
                    .partial_cmp(&b.0.latency_ewma_ms)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.0.protocol.to_string().cmp(&b.0.protocol.to_string()))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_proto::SourceProtocol;

    #[test]
    fn critical_priority_weighs_latency_and_reliability_heavily() {
        let mut fast_unreliable = RoutingMetrics::new(SourceProtocol::Mavlink);
        fast_unreliable.latency_ewma_ms = 5.0;
        fast_unreliable.reliability = 0.5;

        let mut slow_reliable = RoutingMetrics::new(SourceProtocol::Cyphal);
        slow_reliable.latency_ewma_ms = 5.0;
        slow_reliable.reliability = 1.0;

        let critical = Priority::Critical;
        assert!(score(&slow_reliable, critical) > score(&fast_unreliable, critical));
    }

    #[test]
    fn scoring_is_deterministic_for_same_inputs_l3() {
        let metrics = RoutingMetrics::new(SourceProtocol::Mavlink);
        let a = score(&metrics, Priority::Normal);
        let b = score(&metrics, Priority::Normal);
        assert_eq!(a, b);
    }

    #[test]
    fn recommendation_thresholds_match_spec() {
        assert_eq!(recommendation(85.0), Recommendation::Primary);
        assert_eq!(recommendation(60.0), Recommendation::Backup);
        assert_eq!(recommendation(10.0), Recommendation::Avoid);
    }
}
