//! Scenario 5: strategy=redundant, N=2, both protocols healthy. One
//! command send fans out to both; the first ACK satisfies the caller.

use async_trait::async_trait;
use fleet_proto::{
    CommandPayload, DeliveryOptions, DroneId, MessageId, MessagePayload, Priority, ProtocolAdapter,
    SourceProtocol, TransportError, UnifiedMessage,
};
use fleet_router::{Router, RouterConfig, RoutingStrategy};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct TimedAdapter {
    protocol: SourceProtocol,
    delay: Duration,
    sends: Arc<AtomicU32>,
}

#[async_trait]
impl ProtocolAdapter for TimedAdapter {
    fn protocol(&self) -> SourceProtocol {
        self.protocol
    }
    async fn start(&self) -> Result<(), TransportError> {
        Ok(())
    }
    async fn stop(&self) -> Result<(), TransportError> {
        Ok(())
    }
    async fn send(&self, _message: &UnifiedMessage) -> Result<(), TransportError> {
        tokio::time::sleep(self.delay).await;
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn is_available(&self) -> bool {
        true
    }
}

fn command_message() -> UnifiedMessage {
    UnifiedMessage {
        message_id: MessageId(1),
        drone_id: DroneId(1),
        source_protocol: SourceProtocol::Internal,
        timestamp: 0,
        priority: Priority::Critical,
        payload: MessagePayload::Command(CommandPayload {
            command: "RTL".to_string(),
            params: vec![],
            confirmation: 0,
        }),
        delivery: DeliveryOptions::default(),
        external_sequence_number: None,
    }
}

#[tokio::test]
async fn first_ack_satisfies_redundant_send() {
    let sends = Arc::new(AtomicU32::new(0));

    let fast = Arc::new(TimedAdapter {
        protocol: SourceProtocol::Mavlink,
        delay: Duration::from_millis(5),
        sends: sends.clone(),
    });
    let slow = Arc::new(TimedAdapter {
        protocol: SourceProtocol::Cyphal,
        delay: Duration::from_millis(200),
        sends: sends.clone(),
    });

    let config = RouterConfig {
        default_strategy: RoutingStrategy::Redundant { n: 2 },
        ..RouterConfig::default()
    };
    let router = Router::new(config);
    router.register(fast.clone()).await;
    router.register(slow.clone()).await;

    let started = std::time::Instant::now();
    let winner = router.route(&command_message(), None).await.expect("one ack satisfies the send");
    let elapsed = started.elapsed();

    assert_eq!(winner, SourceProtocol::Mavlink);
    assert!(elapsed < Duration::from_millis(100), "should return as soon as the fast adapter acks");
}
