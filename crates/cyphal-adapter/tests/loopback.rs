//! Two adapters on loopback multicast: a message sent by one is received
//! exactly once by the other, and a redundant retransmission on the backup
//! port is suppressed by transfer-id dedup (spec §4.1).

use cyphal_adapter::{CyphalAdapter, CyphalAdapterConfig};
use fleet_proto::{
    DeliveryOptions, DroneId, MessageId, MessagePayload, Priority, ProtocolAdapter,
    SourceProtocol, UnifiedMessage,
};
use std::net::Ipv4Addr;
use std::time::Duration;

fn heartbeat(drone: u64) -> UnifiedMessage {
    UnifiedMessage {
        message_id: MessageId(0),
        drone_id: DroneId(drone),
        source_protocol: SourceProtocol::Internal,
        timestamp: 0,
        priority: Priority::Normal,
        payload: MessagePayload::Heartbeat,
        delivery: DeliveryOptions::default(),
        external_sequence_number: None,
    }
}

#[tokio::test]
async fn sent_message_is_received_exactly_once_across_redundant_ports() {
    let sender_cfg = CyphalAdapterConfig {
        local_node_id: 9,
        multicast_group: Ipv4Addr::new(239, 65, 83, 72),
        primary_port: 19382,
        redundant_ports: vec![19383, 19384],
        transfer_dedup_window: Duration::from_secs(5),
        bind_address: Ipv4Addr::UNSPECIFIED,
    };
    let receiver_cfg = sender_cfg.clone();

    let sender = CyphalAdapter::new(sender_cfg);
    let receiver = CyphalAdapter::new(receiver_cfg);

    receiver.start().await.expect("receiver starts");
    let mut inbound = receiver.take_inbound().await.expect("inbound stream");

    // give the multicast join a moment to settle before the first send.
    tokio::time::sleep(Duration::from_millis(50)).await;

    sender.start().await.expect("sender starts");
    sender.send(&heartbeat(42)).await.expect("send succeeds");

    let received = tokio::time::timeout(Duration::from_secs(2), inbound.recv())
        .await
        .expect("received within timeout")
        .expect("channel open");

    assert_eq!(received.drone_id, DroneId(9));
    assert!(matches!(received.payload, MessagePayload::Heartbeat));

    let second = tokio::time::timeout(Duration::from_millis(300), inbound.recv()).await;
    assert!(second.is_err(), "redundant port transmissions must dedup to a single delivery");
}
