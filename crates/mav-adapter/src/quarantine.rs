use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Tracks CRC/signature failures per source address and quarantines a
/// source for `duration` once it crosses `threshold` failures (§4.1:
/// "repeated CRC/signature failures from a source trip a per-source
/// quarantine").
pub struct QuarantineTracker {
    threshold: u32,
    duration: Duration,
    failures: HashMap<SocketAddr, u32>,
    quarantined_until: HashMap<SocketAddr, Instant>,
}

impl QuarantineTracker {
    pub fn new(threshold: u32, duration: Duration) -> Self {
        Self {
            threshold,
            duration,
            failures: HashMap::new(),
            quarantined_until: HashMap::new(),
        }
    }

    pub fn is_quarantined(&mut self, source: SocketAddr) -> bool {
        match self.quarantined_until.get(&source) {
            Some(until) if Instant::now() < *until => true,
            Some(_) => {
                self.quarantined_until.remove(&source);
                self.failures.remove(&source);
                false
            }
            None => false,
        }
    }

    /// Record a CRC or signature failure from `source`. Returns `true` if
    /// this call tripped the quarantine.
    pub fn record_failure(&mut self, source: SocketAddr) -> bool {
        let count = self.failures.entry(source).or_insert(0);
        *count += 1;
        if *count >= self.threshold {
            self.quarantined_until
                .insert(source, Instant::now() + self.duration);
            true
        } else {
            false
        }
    }

    pub fn record_success(&mut self, source: SocketAddr) {
        self.failures.remove(&source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_after_threshold_failures() {
        let mut tracker = QuarantineTracker::new(3, Duration::from_secs(60));
        let addr: SocketAddr = "127.0.0.1:14550".parse().unwrap();
        assert!(!tracker.record_failure(addr));
        assert!(!tracker.record_failure(addr));
        assert!(tracker.record_failure(addr));
        assert!(tracker.is_quarantined(addr));
    }

    #[test]
    fn success_resets_failure_count() {
        let mut tracker = QuarantineTracker::new(3, Duration::from_secs(60));
        let addr: SocketAddr = "127.0.0.1:14550".parse().unwrap();
        tracker.record_failure(addr);
        tracker.record_failure(addr);
        tracker.record_success(addr);
        assert!(!tracker.record_failure(addr));
    }
}
