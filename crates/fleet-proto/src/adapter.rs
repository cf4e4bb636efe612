use crate::error::{RoutingError, TransportError};
use crate::message::{SourceProtocol, UnifiedMessage};
use async_trait::async_trait;

/// Shared capability set both protocol adapters implement. Per §9, this
/// replaces a class-hierarchy base with an explicit trait so the gateway
/// can hold heterogeneous adapters behind one `Vec<Box<dyn ProtocolAdapter>>`.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    fn protocol(&self) -> SourceProtocol;

    /// Start the adapter's I/O task(s). Idempotent: calling `start` twice
    /// without an intervening `stop` is a no-op.
    async fn start(&self) -> Result<(), TransportError>;

    /// Stop the adapter, draining in-flight sends with a grace period and
    /// closing sockets (§5 shutdown semantics).
    async fn stop(&self) -> Result<(), TransportError>;

    /// Encode and transmit one outbound `UnifiedMessage`. Fallible with an
    /// explicit cause (timeout, unreachable, encode_error, quarantined);
    /// the router treats any `Err` as retriable unless it is
    /// `RoutingError::CircuitOpen`, which it never passes to adapters.
    async fn send(&self, message: &UnifiedMessage) -> Result<(), TransportError>;

    /// True while this adapter can accept sends (started and not
    /// quarantined).
    fn is_available(&self) -> bool;
}

/// Convenience used by the router to turn a transport failure into the
/// routing-error vocabulary it reports to callers.
pub fn classify_send_failure(err: &TransportError) -> RoutingError {
    match err {
        TransportError::Timeout | TransportError::Unreachable => {
            RoutingError::RetriesExhausted(1)
        }
        _ => RoutingError::NoAvailableProtocol,
    }
}
