//! Cyphal/UDP protocol adapter: subject/service multicast messaging with
//! port redundancy and transfer-id deduplication.

mod adapter;
mod config;
mod dedup;
mod error;
mod frame;

pub use adapter::CyphalAdapter;
pub use config::CyphalAdapterConfig;
pub use dedup::TransferDedup;
pub use error::CyphalAdapterError;
pub use frame::{decode_frame, encode_frame, CyphalFrame, CyphalPriority, FrameError, TransferKind};
