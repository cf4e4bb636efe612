//! Shared data model for the drone fleet gateway: the canonical
//! `UnifiedMessage` record, normalized telemetry, capability registry, the
//! telemetry bus, and the cross-crate error taxonomy.

pub mod adapter;
pub mod bus;
pub mod capabilities;
pub mod error;
pub mod ids;
pub mod message;
pub mod normalizer;
pub mod telemetry;

pub use adapter::ProtocolAdapter;
pub use bus::TelemetryBus;
pub use capabilities::{CapabilityRegistry, DroneCapabilities};
pub use error::{
    AlertError, BackpressureError, DetectionError, ErrorCategory, FramingError, GatewayError,
    LifecycleError, RoutingError, TransportError,
};
pub use ids::{AlertId, DroneId, FindingId, MessageId, MessageIdGenerator, Uuid};
pub use message::{
    AckPayload, AckResult, CommandPayload, DeliveryOptions, DroneStatus, MessageKind,
    MessagePayload, MissionItemPayload, ParamPayload, Priority, SourceProtocol, StatusPayload,
    UnifiedMessage,
};
pub use normalizer::Normalizer;
pub use telemetry::{Comms, Environment, FlightMode, MissionStatus, Motion, Position, Systems, TelemetrySample};
