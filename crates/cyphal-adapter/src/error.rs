use crate::frame::FrameError;
use fleet_proto::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum CyphalAdapterError {
    #[error("multicast join failed: {0}")]
    JoinFailed(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<CyphalAdapterError> for TransportError {
    fn from(err: CyphalAdapterError) -> Self {
        match err {
            CyphalAdapterError::JoinFailed(msg) => TransportError::Socket(msg),
            CyphalAdapterError::Frame(frame_err) => TransportError::Socket(frame_err.to_string()),
            CyphalAdapterError::Transport(inner) => inner,
        }
    }
}
