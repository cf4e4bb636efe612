use crate::error::FramingError;
use crate::ids::{DroneId, MessageIdGenerator};
use crate::message::{SourceProtocol, UnifiedMessage};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const REPLAY_WINDOW: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ReplayKey {
    drone_id: DroneId,
    protocol: SourceProtocol,
    sequence: u32,
}

/// Single-writer stage that turns adapter frames into canonical
/// `UnifiedMessage`s: it deduplicates replays within a rolling 10-minute
/// window per `(drone_id, source_protocol, external_seq)` (P2), assigns the
/// internal monotonic `message_id` (P1), and stamps arrival time.
///
/// One `Normalizer` exists per inbound adapter task, but all share one
/// `MessageIdGenerator` so `message_id` ordering is meaningful across
/// adapters, matching §4.2's "logically one stage" framing.
pub struct Normalizer {
    id_gen: std::sync::Arc<MessageIdGenerator>,
    seen: HashMap<ReplayKey, Instant>,
    replay_rejected_count: u64,
}

impl Normalizer {
    pub fn new(id_gen: std::sync::Arc<MessageIdGenerator>) -> Self {
        Self {
            id_gen,
            seen: HashMap::new(),
            replay_rejected_count: 0,
        }
    }

    pub fn replay_rejected_count(&self) -> u64 {
        self.replay_rejected_count
    }

    /// Normalize one inbound message: reject replays, assign `message_id`,
    /// stamp `timestamp`. Returns `FramingError::ReplayRejected` for a
    /// duplicate `(drone_id, protocol, seq)` observed within the window.
    pub fn normalize(&mut self, mut msg: UnifiedMessage) -> Result<UnifiedMessage, FramingError> {
        self.evict_stale();

        if let Some(seq) = msg.external_sequence_number {
            let key = ReplayKey {
                drone_id: msg.drone_id,
                protocol: msg.source_protocol,
                sequence: seq,
            };
            if self.seen.contains_key(&key) {
                self.replay_rejected_count += 1;
                return Err(FramingError::ReplayRejected);
            }
            self.seen.insert(key, Instant::now());
        }

        msg.message_id = self.id_gen.next();
        msg.timestamp = UnifiedMessage::now_millis();
        Ok(msg)
    }

    fn evict_stale(&mut self) {
        let cutoff = Instant::now().checked_sub(REPLAY_WINDOW);
        if let Some(cutoff) = cutoff {
            self.seen.retain(|_, seen_at| *seen_at >= cutoff);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{DeliveryOptions, MessagePayload, Priority};

    fn sample_message(drone: u64, protocol: SourceProtocol, seq: u32) -> UnifiedMessage {
        UnifiedMessage {
            message_id: crate::ids::MessageId(0),
            drone_id: DroneId(drone),
            source_protocol: protocol,
            timestamp: 0,
            priority: Priority::Normal,
            payload: MessagePayload::Heartbeat,
            delivery: DeliveryOptions::default(),
            external_sequence_number: Some(seq),
        }
    }

    #[test]
    fn duplicate_sequence_is_rejected_p2() {
        let mut normalizer = Normalizer::new(std::sync::Arc::new(MessageIdGenerator::new()));
        let first = normalizer
            .normalize(sample_message(1, SourceProtocol::Mavlink, 42))
            .expect("first delivery accepted");
        let second = normalizer.normalize(sample_message(1, SourceProtocol::Mavlink, 42));
        assert!(matches!(second, Err(FramingError::ReplayRejected)));
        assert_eq!(normalizer.replay_rejected_count(), 1);
        assert_eq!(first.message_id.0, 1);
    }

    #[test]
    fn message_ids_are_strictly_increasing_p1() {
        let mut normalizer = Normalizer::new(std::sync::Arc::new(MessageIdGenerator::new()));
        let a = normalizer
            .normalize(sample_message(1, SourceProtocol::Mavlink, 1))
            .unwrap();
        let b = normalizer
            .normalize(sample_message(2, SourceProtocol::Cyphal, 1))
            .unwrap();
        assert!(a.message_id.0 < b.message_id.0);
    }

    #[test]
    fn different_protocols_do_not_collide() {
        let mut normalizer = Normalizer::new(std::sync::Arc::new(MessageIdGenerator::new()));
        assert!(normalizer
            .normalize(sample_message(1, SourceProtocol::Mavlink, 7))
            .is_ok());
        assert!(normalizer
            .normalize(sample_message(1, SourceProtocol::Cyphal, 7))
            .is_ok());
    }
}
