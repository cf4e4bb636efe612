use std::time::Duration;

use fleet_proto::AlertId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationLevel {
    pub delay: Duration,
    pub recipients: Vec<String>,
    pub actions: Vec<String>,
    pub requires_ack: bool,
    pub auto_resolve: bool,
}

/// Loaded directly from the `alerts.escalation_rules` config section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EscalationRule {
    pub levels: Vec<EscalationLevel>,
}

#[derive(Debug, Clone)]
pub struct EscalationFired {
    pub alert_id: AlertId,
    pub level_index: usize,
    pub level: EscalationLevel,
}

/// One timer chain per alert. Levels fire strictly in order (`P4`); the
/// chain survives duplicate findings on the same alert because nothing
/// here resets it, only [`EscalationTimers::cancel`] (ack/resolve, spec
/// §4.6: "acknowledge/resolve cancels all pending timers") stops it. This
/// type only schedules — what `requires_ack`/`auto_resolve` mean for a
/// fired level is decided by `AlertEngine::on_level_fired`, which holds
/// the alert's actual ack state.
pub struct EscalationTimers {
    handles: std::collections::HashMap<AlertId, CancellationToken>,
}

impl Default for EscalationTimers {
    fn default() -> Self {
        Self { handles: std::collections::HashMap::new() }
    }
}

impl EscalationTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the timer chain for one alert, feeding fired levels to
    /// `fired_tx` in order. The returned cancellation is stored internally
    /// and also returned so callers may hold their own handle if desired.
    pub fn start(&mut self, alert_id: AlertId, rule: EscalationRule, fired_tx: mpsc::Sender<EscalationFired>) -> CancellationToken {
        let cancel = CancellationToken::new();
        self.handles.insert(alert_id, cancel.clone());
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            for (level_index, level) in rule.levels.into_iter().enumerate() {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        debug!(?alert_id, level_index, "escalation chain cancelled");
                        return;
                    }
                    _ = tokio::time::sleep(level.delay) => {
                        let fired = EscalationFired { alert_id, level_index, level: level.clone() };
                        if fired_tx.send(fired).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });
        cancel
    }

    /// Cancels the pending timer chain for an alert (ack/resolve). A
    /// no-op if no chain is running, e.g. a second resolve call (`P6`).
    pub fn cancel(&mut self, alert_id: AlertId) {
        if let Some(token) = self.handles.remove(&alert_id) {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(delays_ms: &[u64]) -> EscalationRule {
        EscalationRule {
            levels: delays_ms
                .iter()
                .map(|&ms| EscalationLevel {
                    delay: Duration::from_millis(ms),
                    recipients: vec!["oncall".into()],
                    actions: vec![],
                    requires_ack: false,
                    auto_resolve: false,
                })
                .collect(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn levels_fire_in_order() {
        let mut timers = EscalationTimers::new();
        let (tx, mut rx) = mpsc::channel(8);
        let alert_id = AlertId::new();
        timers.start(alert_id, rule(&[10, 20, 30]), tx);

        for expected_level in 0..3 {
            tokio::time::advance(Duration::from_millis(35)).await;
            let fired = rx.recv().await.unwrap();
            assert_eq!(fired.level_index, expected_level);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_pending_levels_scenario_6() {
        let mut timers = EscalationTimers::new();
        let (tx, mut rx) = mpsc::channel(8);
        let alert_id = AlertId::new();
        timers.start(alert_id, rule(&[10, 900_000, 1_800_000]), tx);

        tokio::time::advance(Duration::from_millis(15)).await;
        let first = rx.recv().await.unwrap();
        assert_eq!(first.level_index, 0);

        timers.cancel(alert_id);
        tokio::time::advance(Duration::from_secs(3_600)).await;
        assert!(rx.try_recv().is_err());
    }
}
