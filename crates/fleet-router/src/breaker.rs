use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Per-protocol circuit breaker (spec §3/§4.3, invariant P3: "while a
/// protocol's breaker is open, no outbound send is attempted on that
/// protocol"). `next_retry_time` gates the open→half_open transition; a
/// half_open breaker admits exactly one probe via `try_probe`.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    pub state: BreakerState,
    pub failure_count: u32,
    pub last_failure_time: Option<Instant>,
    pub next_retry_time: Option<Instant>,
    pub threshold: u32,
    pub recovery_time: Duration,
    backoff_exponent: u32,
    probe_in_flight: bool,
}

const MAX_RECOVERY_TIME: Duration = Duration::from_secs(5 * 60);

impl CircuitBreaker {
    pub fn new(threshold: u32, recovery_time: Duration) -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            last_failure_time: None,
            next_retry_time: None,
            threshold,
            recovery_time,
            backoff_exponent: 0,
            probe_in_flight: false,
        }
    }

    /// Re-evaluate `open -> half_open` against the clock. Call before
    /// deciding whether a send may proceed.
    pub fn tick(&mut self) {
        if self.state == BreakerState::Open {
            if let Some(retry_at) = self.next_retry_time {
                if Instant::now() >= retry_at {
                    self.state = BreakerState::HalfOpen;
                    self.probe_in_flight = false;
                }
            }
        }
    }

    /// True if a send may be attempted right now. `half_open` admits
    /// exactly one in-flight probe.
    pub fn may_send(&mut self) -> bool {
        self.tick();
        match self.state {
            BreakerState::Closed => true,
            BreakerState::Open => false,
            BreakerState::HalfOpen => {
                if self.probe_in_flight {
                    false
                } else {
                    self.probe_in_flight = true;
                    true
                }
            }
        }
    }

    pub fn record_success(&mut self) {
        self.failure_count = 0;
        self.backoff_exponent = 0;
        self.state = BreakerState::Closed;
        self.probe_in_flight = false;
        self.next_retry_time = None;
    }

    pub fn record_failure(&mut self) {
        self.last_failure_time = Some(Instant::now());
        self.probe_in_flight = false;

        match self.state {
            BreakerState::HalfOpen => self.trip(),
            BreakerState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= self.threshold {
                    self.trip();
                }
            }
            BreakerState::Open => {}
        }
    }

    fn trip(&mut self) {
        self.state = BreakerState::Open;
        let backoff = self
            .recovery_time
            .saturating_mul(1u32 << self.backoff_exponent.min(8));
        let wait = backoff.min(MAX_RECOVERY_TIME);
        self.next_retry_time = Some(Instant::now() + wait);
        self.backoff_exponent = (self.backoff_exponent + 1).min(8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_after_threshold_consecutive_failures_p3() {
        let mut breaker = CircuitBreaker::new(3, Duration::from_millis(10));
        assert!(breaker.may_send());
        breaker.record_failure();
        assert!(breaker.may_send());
        breaker.record_failure();
        assert!(breaker.may_send());
        breaker.record_failure();
        assert_eq!(breaker.state, BreakerState::Open);
        assert!(!breaker.may_send());
    }

    #[test]
    fn half_open_admits_exactly_one_probe() {
        let mut breaker = CircuitBreaker::new(1, Duration::from_millis(5));
        breaker.record_failure();
        assert_eq!(breaker.state, BreakerState::Open);
        std::thread::sleep(Duration::from_millis(10));
        assert!(breaker.may_send());
        assert_eq!(breaker.state, BreakerState::HalfOpen);
        assert!(!breaker.may_send());
    }

    #[test]
    fn probe_success_closes_breaker() {
        let mut breaker = CircuitBreaker::new(1, Duration::from_millis(5));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(10));
        assert!(breaker.may_send());
        breaker.record_success();
        assert_eq!(breaker.state, BreakerState::Closed);
        assert!(breaker.may_send());
    }

    #[test]
    fn probe_failure_reopens_with_backoff() {
        let mut breaker = CircuitBreaker::new(1, Duration::from_millis(5));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(10));
        assert!(breaker.may_send());
        breaker.record_failure();
        assert_eq!(breaker.state, BreakerState::Open);
        assert!(breaker.next_retry_time.unwrap() > Instant::now() + Duration::from_millis(5));
    }
}
