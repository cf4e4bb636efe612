//! MAVLink v2 protocol adapter: wire framing, unit conversion, and
//! per-drone liveness/quarantine state on top of the `mavlink` crate.

mod adapter;
mod assembly;
mod config;
mod error;
mod liveness;
mod modes;
mod outbound;
mod quarantine;
mod signing;

pub use adapter::MavAdapter;
pub use config::MavAdapterConfig;
pub use error::MavAdapterError;
pub use liveness::{LivenessState, LivenessTracker};
pub use quarantine::QuarantineTracker;
pub use signing::{HmacSigner, Signer};

/// Re-exports of otherwise crate-private wire-level functions, for
/// integration tests that exercise encode/decode without going through a
/// live connection.
#[doc(hidden)]
pub mod test_support {
    pub use crate::assembly::apply_message;
    pub use crate::outbound::encode;
}
