//! Process-wide shared state: the router, alert engine, telemetry bus,
//! capability registry, and the bounded per-drone finding history the
//! `/drones/{id}/*` endpoints read from.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use fleet_alert::{Alert, SharedAlertEngine};
use fleet_detect::Finding;
use fleet_proto::{CapabilityRegistry, DroneId, ErrorCategory, MessageIdGenerator, TelemetryBus};
use fleet_router::Router;
use std::sync::atomic::AtomicBool;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;

/// Findings kept per drone for `/drones/{id}/anomalies|predictions|threats`,
/// capped so a noisy drone can't grow memory unbounded (spec P5).
const FINDING_HISTORY_CAPACITY: usize = 500;

/// Depth of the `/stream` fan-out channels. A lagging subscriber drops the
/// oldest frame rather than stalling publication, same drop-oldest policy
/// as `TelemetryBus::subscribe_lossy`.
const STREAM_CHANNEL_DEPTH: usize = 1024;

pub struct GatewayState {
    pub router: Arc<Router>,
    pub alert_engine: SharedAlertEngine,
    pub telemetry_bus: Arc<Mutex<TelemetryBus>>,
    pub capabilities: Arc<CapabilityRegistry>,
    pub findings_by_drone: DashMap<DroneId, VecDeque<Finding>>,
    pub error_counters: DashMap<ErrorCategory, AtomicU64>,
    pub finding_feed: broadcast::Sender<Finding>,
    pub alert_feed: broadcast::Sender<Alert>,
    pub config: Mutex<GatewayConfig>,
    pub id_gen: Arc<MessageIdGenerator>,
    pub running: AtomicBool,
    pub cancel: CancellationToken,
}

impl GatewayState {
    pub fn new(
        router: Arc<Router>,
        alert_engine: SharedAlertEngine,
        telemetry_bus: Arc<Mutex<TelemetryBus>>,
        capabilities: Arc<CapabilityRegistry>,
        config: GatewayConfig,
        id_gen: Arc<MessageIdGenerator>,
        cancel: CancellationToken,
    ) -> Self {
        let (finding_feed, _) = broadcast::channel(STREAM_CHANNEL_DEPTH);
        let (alert_feed, _) = broadcast::channel(STREAM_CHANNEL_DEPTH);
        Self {
            router,
            alert_engine,
            telemetry_bus,
            capabilities,
            findings_by_drone: DashMap::new(),
            error_counters: DashMap::new(),
            finding_feed,
            alert_feed,
            config: Mutex::new(config),
            id_gen,
            running: AtomicBool::new(true),
            cancel,
        }
    }

    pub fn record_finding(&self, finding: Finding) {
        let _ = self.finding_feed.send(finding.clone());
        let mut entry = self.findings_by_drone.entry(finding.drone_id).or_default();
        if entry.len() >= FINDING_HISTORY_CAPACITY {
            entry.pop_front();
        }
        entry.push_back(finding);
    }

    pub fn publish_alert(&self, alert: Alert) {
        let _ = self.alert_feed.send(alert);
    }

    pub fn findings_for(&self, drone_id: DroneId, limit: usize) -> Vec<Finding> {
        self.findings_by_drone
            .get(&drone_id)
            .map(|entry| entry.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn record_error(&self, category: ErrorCategory) {
        self.error_counters.entry(category).or_insert_with(|| AtomicU64::new(0)).fetch_add(1, Ordering::Relaxed);
    }

    pub fn error_counts(&self) -> Vec<(ErrorCategory, u64)> {
        self.error_counters.iter().map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed))).collect()
    }

    /// Hands out a lossy subscription for `/stream`. `subscribe_lossy` only
    /// needs `&TelemetryBus`, but the bus lives behind a `Mutex` because
    /// `publish`/`subscribe_backpressured` elsewhere need `&mut`; the lock
    /// here is held only long enough to call it.
    pub async fn subscribe_stream(&self) -> broadcast::Receiver<fleet_proto::UnifiedMessage> {
        self.telemetry_bus.lock().await.subscribe_lossy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_alert::{AlertEngine, CorrelationEngine};
    use fleet_detect::finding::FindingType;
    use fleet_proto::CapabilityRegistry;

    fn test_state() -> GatewayState {
        let (alert_engine, _fired_rx) = AlertEngine::new(
            CorrelationEngine::new(vec![]),
            Default::default(),
            Vec::new(),
            Vec::new(),
            fleet_alert::NotificationTemplate { name: "t".into(), body: "{drone_id}".into() },
        );
        GatewayState::new(
            Arc::new(Router::new(fleet_router::RouterConfig::default())),
            Arc::new(Mutex::new(alert_engine)),
            Arc::new(Mutex::new(TelemetryBus::new(16))),
            Arc::new(CapabilityRegistry::new()),
            GatewayConfig::default(),
            Arc::new(MessageIdGenerator::new()),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn finding_history_evicts_oldest_past_capacity() {
        let state = test_state();
        for i in 0..(FINDING_HISTORY_CAPACITY + 10) {
            state.record_finding(Finding::new(DroneId(1), FindingType::BehavioralAnomaly, 0.5, format!("n{i}")));
        }
        let kept = state.findings_for(DroneId(1), usize::MAX);
        assert_eq!(kept.len(), FINDING_HISTORY_CAPACITY);
        assert_eq!(kept.last().unwrap().detail, "n10");
    }

    #[tokio::test]
    async fn error_counters_accumulate_per_category() {
        let state = test_state();
        state.record_error(ErrorCategory::Routing);
        state.record_error(ErrorCategory::Routing);
        state.record_error(ErrorCategory::Transport);
        let counts: std::collections::HashMap<_, _> = state.error_counts().into_iter().collect();
        assert_eq!(counts[&ErrorCategory::Routing], 2);
        assert_eq!(counts[&ErrorCategory::Transport], 1);
    }

    #[tokio::test]
    async fn finding_feed_receives_recorded_findings() {
        let state = test_state();
        let mut rx = state.finding_feed.subscribe();
        state.record_finding(Finding::new(DroneId(2), FindingType::Jamming, 0.7, "interference"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.drone_id, DroneId(2));
    }
}
