use rand::seq::SliceRandom;
use rand::Rng;

pub const FEATURE_COUNT: usize = 13;
pub const NUM_TREES: usize = 100;
pub const SUBSAMPLE_SIZE: usize = 256;
pub const MAX_DEPTH: u32 = 8; // ceil(log2(256))
pub const ANOMALY_THRESHOLD: f64 = 0.6;

pub type FeatureVector = [f64; FEATURE_COUNT];

/// Fixed feature extraction order (spec §4.4): altitude, velocity triplet,
/// acceleration triplet, battery voltage, signal strength, gps accuracy,
/// wind speed, packet loss, latency. Missing readings are imputed as 0.0
/// rather than excluded, since the forest needs a fixed-width vector.
pub fn extract_features(sample: &fleet_proto::TelemetrySample) -> FeatureVector {
    let v = sample.motion.velocity_mps.unwrap_or([0.0; 3]);
    let a = sample.motion.acceleration_mps2.unwrap_or([0.0; 3]);
    [
        sample.position.alt_m.unwrap_or(0.0),
        v[0],
        v[1],
        v[2],
        a[0],
        a[1],
        a[2],
        sample.systems.battery_voltage_v.unwrap_or(0.0),
        sample.systems.signal_strength_dbm.unwrap_or(0.0),
        sample.systems.gps_accuracy_m.unwrap_or(0.0),
        sample.environment.wind_speed_mps.unwrap_or(0.0),
        sample.comms.packet_loss_pct.unwrap_or(0.0),
        sample.comms.latency_ms.unwrap_or(0.0),
    ]
}

enum Node {
    Leaf { size: usize },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn build(data: &[FeatureVector], depth: u32, rng: &mut impl Rng) -> Self {
        Self {
            root: Self::build_node(data, depth, rng),
        }
    }

    fn build_node(data: &[FeatureVector], depth: u32, rng: &mut impl Rng) -> Node {
        if depth >= MAX_DEPTH || data.len() <= 1 {
            return Node::Leaf { size: data.len() };
        }

        let feature = rng.gen_range(0..FEATURE_COUNT);
        let values: Vec<f64> = data.iter().map(|v| v[feature]).collect();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if (max - min).abs() < f64::EPSILON {
            return Node::Leaf { size: data.len() };
        }

        let threshold = rng.gen_range(min..max);
        let (left_data, right_data): (Vec<FeatureVector>, Vec<FeatureVector>) =
            data.iter().cloned().partition(|v| v[feature] < threshold);

        if left_data.is_empty() || right_data.is_empty() {
            return Node::Leaf { size: data.len() };
        }

        Node::Split {
            feature,
            threshold,
            left: Box::new(Self::build_node(&left_data, depth + 1, rng)),
            right: Box::new(Self::build_node(&right_data, depth + 1, rng)),
        }
    }

    fn path_length(&self, point: &FeatureVector) -> f64 {
        Self::path_length_node(&self.root, point, 0)
    }

    fn path_length_node(node: &Node, point: &FeatureVector, depth: u32) -> f64 {
        match node {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if point[*feature] < *threshold {
                    Self::path_length_node(left, point, depth + 1)
                } else {
                    Self::path_length_node(right, point, depth + 1)
                }
            }
        }
    }
}

/// Expected path length of an unsuccessful search in a binary search tree
/// of `n` nodes (the standard isolation-forest normalization constant).
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        0.0
    } else {
        let n = n as f64;
        2.0 * (harmonic(n - 1.0)) - (2.0 * (n - 1.0) / n)
    }
}

fn harmonic(n: f64) -> f64 {
    if n <= 0.0 {
        0.0
    } else {
        n.ln() + 0.5772156649
    }
}

/// Behavioral anomaly detector (spec §4.4): 100 isolation trees over a
/// 256-sample subsample, refit on demand from the caller's rolling window.
pub struct IsolationForestDetector {
    trees: Vec<IsolationTree>,
}

impl IsolationForestDetector {
    /// Fit a fresh forest from `window`. Offline-style: the caller decides
    /// when to refit (typically on a timer or every N new samples), never
    /// incrementally within a single score call.
    pub fn fit(window: &[FeatureVector]) -> Option<Self> {
        if window.len() < 2 {
            return None;
        }
        let mut rng = rand::thread_rng();
        let subsample_size = SUBSAMPLE_SIZE.min(window.len());
        let mut trees = Vec::with_capacity(NUM_TREES);
        for _ in 0..NUM_TREES {
            let mut pool: Vec<FeatureVector> = window.to_vec();
            pool.shuffle(&mut rng);
            pool.truncate(subsample_size);
            trees.push(IsolationTree::build(&pool, 0, &mut rng));
        }
        Some(Self { trees })
    }

    /// Anomaly score in [0, 1]; `> ANOMALY_THRESHOLD` flags the point.
    pub fn score(&self, point: &FeatureVector) -> f64 {
        let n = self.trees.len() as f64;
        let avg_path: f64 = self.trees.iter().map(|t| t.path_length(point)).sum::<f64>() / n;
        let c = average_path_length(SUBSAMPLE_SIZE);
        if c <= 0.0 {
            return 0.0;
        }
        2f64.powf(-avg_path / c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nominal_point(seed: f64) -> FeatureVector {
        [
            50.0 + seed,
            1.0,
            0.0,
            0.0,
            0.1,
            0.0,
            0.0,
            12.0,
            -60.0,
            1.5,
            3.0,
            0.5,
            20.0,
        ]
    }

    #[test]
    fn clustered_point_scores_lower_than_an_outlier() {
        let window: Vec<FeatureVector> = (0..300).map(|i| nominal_point((i % 5) as f64 * 0.1)).collect();
        let forest = IsolationForestDetector::fit(&window).expect("forest fits");

        let inlier = nominal_point(0.0);
        let outlier = [
            500.0, 80.0, 60.0, -40.0, 30.0, -25.0, 15.0, 2.0, -120.0, 90.0, 120.0, 95.0, 3000.0,
        ];

        assert!(forest.score(&outlier) > forest.score(&inlier));
    }
}
