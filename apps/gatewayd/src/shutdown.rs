//! Drains adapters, cancels escalation timers, and stops every task group
//! on a shutdown signal (spec §5: "drains adapters ... flush outbound
//! queue with 2s grace, stops timers, closes the telemetry bus").

use std::sync::Arc;
use std::time::Duration;

use fleet_proto::ProtocolAdapter;
use tracing::{info, warn};

use crate::state::GatewayState;

const ADAPTER_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Waits for Ctrl-C; callers drain via [`shutdown`] once this returns.
pub async fn wait_for_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("shutdown signal received, draining");
}

pub async fn shutdown(state: Arc<GatewayState>, adapters: Vec<Arc<dyn ProtocolAdapter>>) {
    state.cancel.cancel();

    for adapter in &adapters {
        match tokio::time::timeout(ADAPTER_DRAIN_GRACE, adapter.stop()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(protocol = %adapter.protocol(), "adapter stop reported an error: {err}"),
            Err(_) => warn!(protocol = %adapter.protocol(), "adapter did not stop within the grace period"),
        }
    }

    info!("shutdown complete");
}
