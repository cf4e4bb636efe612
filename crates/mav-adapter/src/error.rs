use fleet_proto::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum MavAdapterError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("source {0} quarantined after repeated frame failures")]
    Quarantined(String),
}

impl From<MavAdapterError> for TransportError {
    fn from(err: MavAdapterError) -> Self {
        match err {
            MavAdapterError::ConnectionFailed(_) => TransportError::Unreachable,
            MavAdapterError::Transport(inner) => inner,
            MavAdapterError::Encode(_) => TransportError::Socket("encode failed".into()),
            MavAdapterError::Quarantined(_) => TransportError::Unreachable,
        }
    }
}
