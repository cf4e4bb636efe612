//! Scenario 4: a duplicate HEARTBEAT (same drone, same protocol, same
//! external sequence number) within the replay window must be rejected by
//! the normalizer exactly once, leaving the `replay_rejected` counter at 1
//! and emitting only the first occurrence downstream.

use fleet_proto::{
    DeliveryOptions, DroneId, MessageIdGenerator, MessagePayload, Normalizer, Priority,
    SourceProtocol, UnifiedMessage,
};
use std::sync::Arc;

fn raw_heartbeat(drone: u64, seq: u32) -> UnifiedMessage {
    UnifiedMessage {
        message_id: fleet_proto::MessageId(0),
        drone_id: DroneId(drone),
        source_protocol: SourceProtocol::Mavlink,
        timestamp: 0,
        priority: Priority::Normal,
        payload: MessagePayload::Heartbeat,
        delivery: DeliveryOptions::default(),
        external_sequence_number: Some(seq),
    }
}

#[test]
fn duplicate_heartbeat_within_window_is_rejected_once() {
    let mut normalizer = Normalizer::new(Arc::new(MessageIdGenerator::new()));

    let first = normalizer.normalize(raw_heartbeat(7, 42));
    assert!(first.is_ok());

    let duplicate = normalizer.normalize(raw_heartbeat(7, 42));
    assert!(duplicate.is_err());

    let next = normalizer.normalize(raw_heartbeat(7, 43));
    assert!(next.is_ok());

    assert_eq!(normalizer.replay_rejected_count(), 1);
}
