use crate::error::BackpressureError;
use crate::message::UnifiedMessage;
use tokio::sync::{broadcast, mpsc};

/// Default per-consumer channel depth (§4.2, §5).
pub const DEFAULT_BUS_DEPTH: usize = 4096;

/// The bus is the single serialization point telemetry passes through
/// before reaching detectors and the alert engine. Two overload policies
/// coexist behind one API:
///
/// - detector consumers subscribe via [`TelemetryBus::subscribe_lossy`],
///   backed by `tokio::sync::broadcast`, which drops the oldest entry for a
///   lagging reader rather than blocking the writer.
/// - the alert engine (and anything else that must never silently drop a
///   telemetry-derived event) takes the non-lossy path via
///   [`TelemetryBus::subscribe_backpressured`], an owned `mpsc::Receiver`
///   the publisher awaits on, applying backpressure instead of dropping.
///
/// A slow lossy consumer can never block a fast one: `broadcast` readers
/// each hold their own cursor into the ring, and a non-lossy subscriber is
/// a dedicated `mpsc` channel independent of the broadcast ring.
pub struct TelemetryBus {
    lossy: broadcast::Sender<UnifiedMessage>,
    backpressured: Vec<mpsc::Sender<UnifiedMessage>>,
    depth: usize,
}

impl TelemetryBus {
    pub fn new(depth: usize) -> Self {
        let (lossy, _rx) = broadcast::channel(depth.max(1));
        Self {
            lossy,
            backpressured: Vec::new(),
            depth,
        }
    }

    pub fn subscribe_lossy(&self) -> broadcast::Receiver<UnifiedMessage> {
        self.lossy.subscribe()
    }

    /// Register a non-dropping consumer. Returns the receiving half; the
    /// caller owns its lifetime (dropping it deregisters the consumer on
    /// the next publish, since `mpsc::Sender::send` will then fail).
    pub fn subscribe_backpressured(&mut self) -> mpsc::Receiver<UnifiedMessage> {
        let (tx, rx) = mpsc::channel(self.depth);
        self.backpressured.push(tx);
        rx
    }

    /// Publish to every lossy subscriber (best-effort, drop-oldest on lag)
    /// and await delivery to every backpressured subscriber in turn.
    pub async fn publish(&mut self, message: UnifiedMessage) -> Result<(), BackpressureError> {
        // broadcast::Sender::send only fails when there are zero
        // subscribers, which is a normal idle state, not an error.
        let _ = self.lossy.send(message.clone());

        self.backpressured.retain(|_| true);
        let mut dead = Vec::new();
        for (idx, tx) in self.backpressured.iter().enumerate() {
            if tx.send(message.clone()).await.is_err() {
                dead.push(idx);
            }
        }
        for idx in dead.into_iter().rev() {
            self.backpressured.remove(idx);
        }
        Ok(())
    }

    pub fn lossy_subscriber_count(&self) -> usize {
        self.lossy.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{DroneId, MessageId};
    use crate::message::{DeliveryOptions, MessagePayload, Priority, SourceProtocol};

    fn msg(id: u64) -> UnifiedMessage {
        UnifiedMessage {
            message_id: MessageId(id),
            drone_id: DroneId(1),
            source_protocol: SourceProtocol::Internal,
            timestamp: 0,
            priority: Priority::Normal,
            payload: MessagePayload::Heartbeat,
            delivery: DeliveryOptions::default(),
            external_sequence_number: None,
        }
    }

    #[tokio::test]
    async fn lossy_subscriber_drops_oldest_under_overload_p5() {
        let mut bus = TelemetryBus::new(4);
        let mut rx = bus.subscribe_lossy();
        for i in 0..10 {
            bus.publish(msg(i)).await.unwrap();
        }
        // The receiver lagged; it should observe a Lagged error rather than
        // block the publisher (which already returned above).
        let mut saw_lagged = false;
        loop {
            match rx.try_recv() {
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    saw_lagged = true;
                    continue;
                }
                Err(_) => break,
            }
        }
        assert!(saw_lagged, "lagging lossy consumer should see a Lagged marker, not a block");
    }

    #[tokio::test]
    async fn backpressured_consumer_receives_every_message() {
        let mut bus = TelemetryBus::new(4);
        let mut rx = bus.subscribe_backpressured();
        for i in 0..4 {
            bus.publish(msg(i)).await.unwrap();
        }
        for expected in 0..4 {
            let got = rx.recv().await.unwrap();
            assert_eq!(got.message_id.0, expected);
        }
    }
}
