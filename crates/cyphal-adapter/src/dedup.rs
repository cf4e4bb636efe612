use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Deduplicates Cyphal transfers received across redundant ports, keyed by
/// `(node_id, transfer_id)` (spec §4.1). A transfer seen on the primary
/// port and again moments later on a redundant port is delivered exactly
/// once.
pub struct TransferDedup {
    window: Duration,
    seen: HashMap<(u16, u64), Instant>,
}

impl TransferDedup {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// Returns `true` if this transfer has not been seen within the window
    /// (and should be delivered), `false` if it is a redundant-port
    /// duplicate.
    pub fn admit(&mut self, node_id: u16, transfer_id: u64) -> bool {
        self.evict_stale();
        let key = (node_id, transfer_id);
        if self.seen.contains_key(&key) {
            false
        } else {
            self.seen.insert(key, Instant::now());
            true
        }
    }

    fn evict_stale(&mut self) {
        if let Some(cutoff) = Instant::now().checked_sub(self.window) {
            self.seen.retain(|_, seen_at| *seen_at >= cutoff);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redundant_port_duplicate_is_suppressed() {
        let mut dedup = TransferDedup::new(Duration::from_secs(5));
        assert!(dedup.admit(7, 100));
        assert!(!dedup.admit(7, 100));
        assert!(dedup.admit(7, 101));
        assert!(dedup.admit(8, 100));
    }
}
