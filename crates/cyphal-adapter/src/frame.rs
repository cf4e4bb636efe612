use serde::{Deserialize, Serialize};

/// Cyphal priority levels, per the protocol's eight-level scheme (narrower
/// than `fleet_proto::Priority`'s five; mapped at the adapter boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CyphalPriority {
    Exceptional,
    Immediate,
    Fast,
    High,
    Nominal,
    Low,
    Slow,
    Optional,
}

impl From<fleet_proto::Priority> for CyphalPriority {
    fn from(p: fleet_proto::Priority) -> Self {
        match p {
            fleet_proto::Priority::Critical => CyphalPriority::Immediate,
            fleet_proto::Priority::High => CyphalPriority::Fast,
            fleet_proto::Priority::Normal => CyphalPriority::Nominal,
            fleet_proto::Priority::Low => CyphalPriority::Low,
            fleet_proto::Priority::Background => CyphalPriority::Optional,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    Message,
    Request,
    Response,
}

/// One Cyphal/UDP datagram: a fixed header plus the bincode-serialized
/// `fleet_proto::UnifiedMessage` payload. One transfer never spans more
/// than one datagram in this adapter (large telemetry payloads are kept
/// well under common multicast MTUs by construction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyphalFrame {
    pub node_id: u16,
    pub transfer_id: u64,
    pub subject_or_service_id: u16,
    pub kind: TransferKind,
    pub priority: CyphalPriority,
    pub payload: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame encode failed: {0}")]
    Encode(String),
    #[error("frame decode failed: {0}")]
    Decode(String),
}

pub fn encode_frame(frame: &CyphalFrame) -> Result<Vec<u8>, FrameError> {
    bincode::serialize(frame).map_err(|err| FrameError::Encode(err.to_string()))
}

pub fn decode_frame(bytes: &[u8]) -> Result<CyphalFrame, FrameError> {
    bincode::deserialize(bytes).map_err(|err| FrameError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips_through_bincode() {
        let frame = CyphalFrame {
            node_id: 12,
            transfer_id: 9001,
            subject_or_service_id: 100,
            kind: TransferKind::Message,
            priority: CyphalPriority::Nominal,
            payload: vec![1, 2, 3, 4],
        };
        let bytes = encode_frame(&frame).unwrap();
        let decoded = decode_frame(&bytes).unwrap();
        assert_eq!(decoded.node_id, frame.node_id);
        assert_eq!(decoded.transfer_id, frame.transfer_id);
        assert_eq!(decoded.payload, frame.payload);
    }
}
