use std::collections::VecDeque;

pub const MIN_WINDOW: usize = 10;
pub const Z_THRESHOLD: f64 = 3.0;

/// Rolling mean/std tracker for one scalar metric (spec §4.4: "statistical
/// z-score against the drone's rolling mean/std, window >= 10 samples,
/// flagged at |z| > 3").
#[derive(Debug, Default)]
pub struct ZScoreTracker {
    window: VecDeque<f64>,
    capacity: usize,
}

impl ZScoreTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity: capacity.max(MIN_WINDOW),
        }
    }

    pub fn observe(&mut self, value: f64) -> Option<f64> {
        let z = if self.window.len() >= MIN_WINDOW {
            Some(self.z_score(value))
        } else {
            None
        };
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(value);
        z
    }

    fn z_score(&self, value: f64) -> f64 {
        let n = self.window.len() as f64;
        let mean = self.window.iter().sum::<f64>() / n;
        let variance = self.window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        if std_dev < f64::EPSILON {
            0.0
        } else {
            (value - mean) / std_dev
        }
    }

    pub fn is_anomalous(&self, value: f64) -> bool {
        self.window.len() >= MIN_WINDOW && self.z_score(value).abs() > Z_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_outlier_past_three_sigma() {
        let mut tracker = ZScoreTracker::new(20);
        for _ in 0..12 {
            tracker.observe(10.0);
        }
        assert!(tracker.is_anomalous(1000.0));
        assert!(!tracker.is_anomalous(10.1));
    }

    #[test]
    fn requires_minimum_window_before_flagging() {
        let mut tracker = ZScoreTracker::new(20);
        for _ in 0..5 {
            tracker.observe(10.0);
        }
        assert!(!tracker.is_anomalous(10_000.0));
    }
}
