use thiserror::Error;

/// Transport-level failures, local to a single adapter/connection attempt.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("socket error: {0}")]
    Socket(String),
    #[error("operation timed out")]
    Timeout,
    #[error("destination unreachable")]
    Unreachable,
    #[error("CRC check failed")]
    CrcFailure,
    #[error("signature verification failed")]
    SignatureFailure,
}

/// Framing/decoding failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FramingError {
    #[error("frame truncated")]
    Truncated,
    #[error("unknown message id {0}")]
    UnknownMessageId(u32),
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("replay rejected: duplicate (drone, protocol, seq) within window")]
    ReplayRejected,
}

/// Routing failures, surfaced verbatim to the caller of `send` (§7: "the
/// router itself never swallows them").
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    #[error("no protocol available for this message")]
    NoAvailableProtocol,
    #[error("circuit open for protocol {0}")]
    CircuitOpen(String),
    #[error("retries exhausted after {0} attempts")]
    RetriesExhausted(u32),
}

/// Bus/backpressure failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackpressureError {
    #[error("consumer queue full, message dropped")]
    QueueFull,
    #[error("admission denied: rate limit exceeded for drone {0}")]
    AdmissionDenied(String),
}

/// Detection pipeline failures. Per §7 these never escalate to critical
/// alerts; they become `info` findings carrying `model_status` metadata.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectionError {
    #[error("insufficient history: have {have}, need {need}")]
    InsufficientHistory { have: usize, need: usize },
    #[error("model not ready")]
    ModelNotReady,
}

/// Alert-engine failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlertError {
    #[error("template render error: {0}")]
    TemplateError(String),
    #[error("no recipient available")]
    RecipientUnavailable,
}

/// Component lifecycle misuse.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("component is shutting down")]
    ShuttingDown,
    #[error("component not started")]
    NotStarted,
}

/// Umbrella error a binary-level caller can match on without naming every
/// crate's error type. Library code should keep returning its own
/// specific error; only `apps/gatewayd`'s wiring layer converts into this.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Framing(#[from] FramingError),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Backpressure(#[from] BackpressureError),
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Alert(#[from] AlertError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Error category used as the key for the `/status` counters map (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorCategory {
    Transport,
    Framing,
    Routing,
    Backpressure,
    Detection,
    Alert,
    Lifecycle,
}

impl GatewayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GatewayError::Transport(_) => ErrorCategory::Transport,
            GatewayError::Framing(_) => ErrorCategory::Framing,
            GatewayError::Routing(_) => ErrorCategory::Routing,
            GatewayError::Backpressure(_) => ErrorCategory::Backpressure,
            GatewayError::Detection(_) => ErrorCategory::Detection,
            GatewayError::Alert(_) => ErrorCategory::Alert,
            GatewayError::Lifecycle(_) => ErrorCategory::Lifecycle,
        }
    }
}
