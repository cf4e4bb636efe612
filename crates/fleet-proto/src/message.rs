use crate::ids::{DroneId, MessageId};
use crate::telemetry::TelemetrySample;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wire protocol a message originated from (or, for outbound, should be
/// encoded for).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceProtocol {
    Mavlink,
    Cyphal,
    Internal,
}

impl std::fmt::Display for SourceProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceProtocol::Mavlink => "mavlink",
            SourceProtocol::Cyphal => "cyphal",
            SourceProtocol::Internal => "internal",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Telemetry,
    Command,
    Mission,
    Status,
    Heartbeat,
    Ack,
}

/// Ordered delivery priority. `Ord` follows declaration order, so
/// `Priority::Background < Priority::Critical` holds directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Background,
    Low,
    Normal,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOptions {
    pub ack_required: bool,
    pub ttl_seconds: u32,
    pub retries_remaining: u8,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            ack_required: false,
            ttl_seconds: 30,
            retries_remaining: 0,
        }
    }
}

/// A single outbound command/parameter/mission-item instruction directed at
/// a drone. `confirmation` mirrors MAVLink's COMMAND_LONG confirmation
/// counter; adapters that don't need it (Cyphal service calls) ignore it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandPayload {
    pub command: String,
    pub params: Vec<f64>,
    pub confirmation: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionItemPayload {
    pub seq: u16,
    pub total: u16,
    pub command: u16,
    pub frame: u8,
    pub autocontinue: bool,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub params: [f32; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamPayload {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DroneStatus {
    Nominal,
    Degraded,
    Lost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPayload {
    pub status: DroneStatus,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckResult {
    Accepted,
    Rejected,
    InProgress,
    TimedOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckPayload {
    pub in_reply_to: MessageId,
    pub result: AckResult,
}

/// Typed content of a `UnifiedMessage`, tagged by `MessageKind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessagePayload {
    Telemetry(TelemetrySample),
    Command(CommandPayload),
    Mission(MissionItemPayload),
    Status(StatusPayload),
    Heartbeat,
    Ack(AckPayload),
}

impl MessagePayload {
    pub fn kind(&self) -> MessageKind {
        match self {
            MessagePayload::Telemetry(_) => MessageKind::Telemetry,
            MessagePayload::Command(_) => MessageKind::Command,
            MessagePayload::Mission(_) => MessageKind::Mission,
            MessagePayload::Status(_) => MessageKind::Status,
            MessagePayload::Heartbeat => MessageKind::Heartbeat,
            MessagePayload::Ack(_) => MessageKind::Ack,
        }
    }
}

/// The canonical internal record every adapter normalizes into (inbound)
/// or decodes from (outbound). See fleet-proto::normalizer for the
/// dedup/ordering invariants that apply once a message reaches the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedMessage {
    pub message_id: MessageId,
    pub drone_id: DroneId,
    pub source_protocol: SourceProtocol,
    pub timestamp: u64,
    pub priority: Priority,
    pub payload: MessagePayload,
    pub delivery: DeliveryOptions,
    /// Sequence number as assigned by the originating protocol, used by the
    /// normalizer's replay-rejection window. `None` for internally
    /// generated messages (outbound commands, synthetic status).
    pub external_sequence_number: Option<u32>,
}

impl UnifiedMessage {
    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    pub fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
