use fleet_proto::DroneId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    Nominal,
    Degraded,
    Lost,
}

/// Per-drone heartbeat liveness tracker (§4.1): no inbound frame for 5s
/// emits `degraded`; 30s emits `lost` and marks the drone unreachable on
/// this protocol.
pub struct LivenessTracker {
    degraded_after: Duration,
    lost_after: Duration,
    last_seen: HashMap<DroneId, Instant>,
    state: HashMap<DroneId, LivenessState>,
}

impl LivenessTracker {
    pub fn new(degraded_after: Duration, lost_after: Duration) -> Self {
        Self {
            degraded_after,
            lost_after,
            last_seen: HashMap::new(),
            state: HashMap::new(),
        }
    }

    pub fn record_frame(&mut self, drone: DroneId) {
        self.last_seen.insert(drone, Instant::now());
        self.state.insert(drone, LivenessState::Nominal);
    }

    /// Re-evaluate every tracked drone against the current clock, returning
    /// the drones whose state changed this tick along with the new state.
    pub fn tick(&mut self) -> Vec<(DroneId, LivenessState)> {
        let now = Instant::now();
        let mut changes = Vec::new();
        for (drone, last) in self.last_seen.iter() {
            let elapsed = now.duration_since(*last);
            let new_state = if elapsed >= self.lost_after {
                LivenessState::Lost
            } else if elapsed >= self.degraded_after {
                LivenessState::Degraded
            } else {
                LivenessState::Nominal
            };
            let prev = self.state.get(drone).copied().unwrap_or(LivenessState::Nominal);
            if prev != new_state {
                changes.push((*drone, new_state));
            }
        }
        for (drone, state) in &changes {
            self.state.insert(*drone, *state);
        }
        changes
    }

    pub fn state_of(&self, drone: DroneId) -> LivenessState {
        self.state.get(&drone).copied().unwrap_or(LivenessState::Nominal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_degraded_then_lost() {
        let mut tracker = LivenessTracker::new(Duration::from_millis(0), Duration::from_millis(5));
        let drone = DroneId(1);
        tracker.record_frame(drone);
        std::thread::sleep(Duration::from_millis(2));
        let changes = tracker.tick();
        assert_eq!(changes, vec![(drone, LivenessState::Degraded)]);

        std::thread::sleep(Duration::from_millis(6));
        let changes = tracker.tick();
        assert_eq!(changes, vec![(drone, LivenessState::Lost)]);
    }

    #[test]
    fn fresh_frame_resets_to_nominal() {
        let mut tracker = LivenessTracker::new(Duration::from_millis(0), Duration::from_secs(30));
        let drone = DroneId(1);
        tracker.record_frame(drone);
        std::thread::sleep(Duration::from_millis(2));
        tracker.tick();
        assert_eq!(tracker.state_of(drone), LivenessState::Degraded);
        tracker.record_frame(drone);
        assert_eq!(tracker.state_of(drone), LivenessState::Nominal);
    }
}
