use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use fleet_detect::Finding;
use fleet_proto::AlertId;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::alert::{Alert, AlertStatus};
use crate::correlation::{CorrelationEngine, CorrelationOutcome};
use crate::escalation::{EscalationFired, EscalationLevel, EscalationRule, EscalationTimers};
use crate::notifier::{send_with_retry, Notifier};
use crate::recipient::Recipient;
use crate::template::NotificationTemplate;

/// Ties correlation, the alert state machine, escalation timers, and
/// notifier dispatch together. One engine instance owns every active
/// alert; findings arrive over an internal channel from the detection
/// pipeline.
pub struct AlertEngine {
    correlation: CorrelationEngine,
    alerts: HashMap<AlertId, Alert>,
    escalation_timers: EscalationTimers,
    escalation_rule: EscalationRule,
    recipients: Vec<Recipient>,
    notifiers: Vec<Arc<dyn Notifier>>,
    template: NotificationTemplate,
    fired_tx: mpsc::Sender<EscalationFired>,
}

impl AlertEngine {
    /// Returns the engine plus the receiving half of its escalation-fired
    /// channel. The receiver is handed to [`run_escalation_loop`]
    /// separately so that loop never needs to hold the engine's lock
    /// across an `.await` on `recv()` (it only locks briefly per event).
    pub fn new(
        correlation: CorrelationEngine,
        escalation_rule: EscalationRule,
        recipients: Vec<Recipient>,
        notifiers: Vec<Arc<dyn Notifier>>,
        template: NotificationTemplate,
    ) -> (Self, mpsc::Receiver<EscalationFired>) {
        let (fired_tx, fired_rx) = mpsc::channel(256);
        let engine = Self {
            correlation,
            alerts: HashMap::new(),
            escalation_timers: EscalationTimers::new(),
            escalation_rule,
            recipients,
            notifiers,
            template,
            fired_tx,
        };
        (engine, fired_rx)
    }

    pub fn active_alerts(&self) -> Vec<&Alert> {
        self.alerts.values().filter(|a| a.is_actionable()).collect()
    }

    /// Every alert regardless of status, for `GET /alerts` listing.
    pub fn all_alerts(&self) -> Vec<&Alert> {
        self.alerts.values().collect()
    }

    pub fn get(&self, alert_id: AlertId) -> Option<&Alert> {
        self.alerts.get(&alert_id)
    }

    pub async fn handle_finding(&mut self, finding: Finding, now: DateTime<Utc>) -> Option<AlertId> {
        let active: Vec<Alert> = self.alerts.values().cloned().collect();
        let outcome = self.correlation.ingest(finding.clone(), now, &active);
        match outcome {
            CorrelationOutcome::Suppressed => {
                info!(finding_id = ?finding.finding_id, "finding suppressed by correlation rule");
                None
            }
            CorrelationOutcome::Merge { existing_alert } => {
                if let Some(alert) = self.alerts.get_mut(&existing_alert) {
                    alert.finding_refs.push(finding.finding_id);
                }
                Some(existing_alert)
            }
            CorrelationOutcome::EscalateSeverity { severity } => {
                let mut alert = Alert::new(finding.drone_id, vec![finding.finding_id], severity, now);
                let alert_id = alert.id;
                alert.escalate(now).ok();
                self.alerts.insert(alert_id, alert);
                self.start_escalation(alert_id);
                self.dispatch(alert_id, Some(&finding), now).await;
                Some(alert_id)
            }
            CorrelationOutcome::NewAlert { severity } => {
                let alert = Alert::new(finding.drone_id, vec![finding.finding_id], severity, now);
                let alert_id = alert.id;
                self.alerts.insert(alert_id, alert);
                self.start_escalation(alert_id);
                self.dispatch(alert_id, Some(&finding), now).await;
                Some(alert_id)
            }
        }
    }

    fn start_escalation(&mut self, alert_id: AlertId) {
        self.escalation_timers.start(alert_id, self.escalation_rule.clone(), self.fired_tx.clone());
    }

    pub async fn acknowledge(&mut self, alert_id: AlertId, by: &str, now: DateTime<Utc>) -> Result<(), crate::error::AlertTransitionError> {
        let result = {
            let alert = self.alerts.get_mut(&alert_id).ok_or(crate::error::AlertTransitionError::NotFound)?;
            alert.acknowledge(by, now)
        };
        if result.is_ok() {
            self.escalation_timers.cancel(alert_id);
        }
        result
    }

    pub async fn resolve(&mut self, alert_id: AlertId, by: &str, now: DateTime<Utc>) -> Result<(), crate::error::AlertTransitionError> {
        let result = {
            let alert = self.alerts.get_mut(&alert_id).ok_or(crate::error::AlertTransitionError::NotFound)?;
            alert.resolve(by, now)
        };
        if result.is_ok() {
            self.escalation_timers.cancel(alert_id);
        }
        result
    }

    pub async fn suppress(&mut self, alert_id: AlertId, until: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), crate::error::AlertTransitionError> {
        let result = {
            let alert = self.alerts.get_mut(&alert_id).ok_or(crate::error::AlertTransitionError::NotFound)?;
            alert.suppress(until, now)
        };
        if result.is_ok() {
            self.escalation_timers.cancel(alert_id);
        }
        result
    }

    /// Reacts to one escalation level's timer firing. `requires_ack` holds
    /// the chain at this level — no state bump, no notification — until an
    /// operator acknowledges, since the timer chain itself has no way to
    /// pause (`escalation::EscalationTimers` just schedules in order).
    /// `auto_resolve` takes priority over that: an unacknowledged alert
    /// whose level says to auto-resolve is closed out here rather than
    /// escalated further.
    async fn on_level_fired(&mut self, event: EscalationFired) {
        let now = Utc::now();
        let acknowledged = match self.alerts.get(&event.alert_id) {
            Some(alert) if alert.is_actionable() => alert.status == AlertStatus::Acknowledged,
            _ => return,
        };

        if event.level.auto_resolve && !acknowledged {
            if let Some(alert) = self.alerts.get_mut(&event.alert_id) {
                let _ = alert.resolve("escalation:auto_resolve", now);
            }
            self.escalation_timers.cancel(event.alert_id);
            info!(alert_id = ?event.alert_id, level = event.level_index, "alert auto-resolved by escalation level without acknowledgement");
            return;
        }

        if event.level.requires_ack && !acknowledged {
            warn!(alert_id = ?event.alert_id, level = event.level_index, "escalation level requires acknowledgement, holding notification");
            return;
        }

        let escalated = match self.alerts.get_mut(&event.alert_id) {
            Some(alert) => alert.escalate(now).is_ok(),
            None => false,
        };
        if !escalated {
            return;
        }
        self.dispatch_level(event.alert_id, &event.level, now).await;
    }

    /// Initial notification for a freshly created or re-escalated alert,
    /// before any escalation level has fired — no level context exists
    /// yet, so every configured recipient is notified.
    async fn dispatch(&self, alert_id: AlertId, finding: Option<&Finding>, now: DateTime<Utc>) {
        self.notify(alert_id, finding, now, self.recipients.iter().collect(), &[]).await;
    }

    /// Notification for a fired escalation level: narrows to the level's
    /// own `recipients` (matched by [`Recipient::name`]) when it names
    /// any, falling back to the full roster for a level left empty, and
    /// logs the level's `actions` alongside the notifications.
    async fn dispatch_level(&self, alert_id: AlertId, level: &EscalationLevel, now: DateTime<Utc>) {
        let recipients: Vec<&Recipient> = if level.recipients.is_empty() {
            self.recipients.iter().collect()
        } else {
            self.recipients.iter().filter(|r| level.recipients.iter().any(|name| name == &r.name)).collect()
        };
        self.notify(alert_id, None, now, recipients, &level.actions).await;
    }

    async fn notify(&self, alert_id: AlertId, finding: Option<&Finding>, now: DateTime<Utc>, recipients: Vec<&Recipient>, actions: &[String]) {
        let Some(alert) = self.alerts.get(&alert_id) else { return };
        let body = match self.template.render(alert.drone_id, alert.severity, finding) {
            Ok(body) => body,
            Err(err) => {
                warn!(?err, "template render failed, skipping this dispatch attempt");
                return;
            }
        };
        for action in actions {
            info!(alert_id = ?alert_id, action, "running escalation level action");
        }
        for recipient in recipients {
            let Some(contact) = recipient.select_contact(alert.severity, now) else {
                continue;
            };
            if let Some(notifier) = self.notifiers.iter().find(|n| n.method() == contact.method) {
                let retry_interval = StdDuration::from_secs(u64::from(recipient.retry_interval_minutes) * 60);
                let _ = send_with_retry(notifier.as_ref(), &contact.address, &body, recipient.retry_attempts, retry_interval).await;
            }
        }
    }
}

/// Shared-handle wrapper so the ingest side (detection pipeline) and the
/// escalation-timer loop can both hold a reference to one engine instance
/// (spec §5: "one alert engine, one escalation-timer service" task groups
/// exchanging state by message, coordinated here via a single-owner lock).
pub type SharedAlertEngine = Arc<Mutex<AlertEngine>>;

/// Drains escalation-fired events and dispatches notifications. Locks
/// `engine` only for the duration of each event's handling, never across
/// the `recv()` await, so `handle_finding`/`acknowledge`/`resolve` on the
/// same engine are never blocked by this loop waiting on the next timer.
pub async fn run_escalation_loop(engine: SharedAlertEngine, mut fired_rx: mpsc::Receiver<EscalationFired>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            fired = fired_rx.recv() => {
                match fired {
                    Some(event) => engine.lock().await.on_level_fired(event).await,
                    None => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fleet_detect::FindingType;
    use fleet_proto::DroneId;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::escalation::EscalationLevel;
    use crate::notifier::NotifyError;
    use crate::recipient::{Contact, ContactMethod, WorkingHours};

    struct CountingNotifier {
        method: ContactMethod,
        count: AtomicU32,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        fn method(&self) -> ContactMethod {
            self.method
        }

        async fn send(&self, _address: &str, _body: &str) -> Result<(), NotifyError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn recipient(name: &str, method: ContactMethod) -> Recipient {
        Recipient {
            name: name.into(),
            timezone: "UTC".into(),
            working_hours: WorkingHours { start_hour: 0, end_hour: 24, days: vec![] },
            on_call: true,
            contacts: vec![Contact { method, address: format!("{name}@example.com"), priority: 1, active: true }],
            retry_attempts: 0,
            retry_interval_minutes: 0,
        }
    }

    fn engine_with(recipients: Vec<Recipient>, notifiers: Vec<Arc<dyn Notifier>>) -> (AlertEngine, mpsc::Receiver<EscalationFired>) {
        AlertEngine::new(
            CorrelationEngine::new(vec![]),
            EscalationRule { levels: vec![] },
            recipients,
            notifiers,
            NotificationTemplate { name: "t".into(), body: "{drone_id} {severity}".into() },
        )
    }

    fn emergency_finding() -> Finding {
        Finding::new(DroneId(1), FindingType::GpsSpoofing, 0.95, "spoofed fix")
    }

    fn level(recipients: Vec<String>, requires_ack: bool, auto_resolve: bool) -> EscalationLevel {
        EscalationLevel { delay: StdDuration::from_secs(0), recipients, actions: vec![], requires_ack, auto_resolve }
    }

    #[tokio::test]
    async fn auto_resolve_closes_unacknowledged_alert() {
        let oncall = recipient("oncall", ContactMethod::Push);
        let notifier = Arc::new(CountingNotifier { method: ContactMethod::Push, count: AtomicU32::new(0) });
        let (mut engine, _fired_rx) = engine_with(vec![oncall], vec![notifier]);

        let now = Utc::now();
        let alert_id = engine.handle_finding(emergency_finding(), now).await.unwrap();

        let fired = EscalationFired { alert_id, level_index: 0, level: level(vec![], false, true) };
        engine.on_level_fired(fired).await;

        assert_eq!(engine.get(alert_id).unwrap().status, AlertStatus::Resolved);
    }

    #[tokio::test]
    async fn requires_ack_holds_notification_until_acknowledged() {
        let oncall = recipient("oncall", ContactMethod::Push);
        let notifier = Arc::new(CountingNotifier { method: ContactMethod::Push, count: AtomicU32::new(0) });
        let (mut engine, _fired_rx) = engine_with(vec![oncall], vec![notifier.clone()]);

        let now = Utc::now();
        let alert_id = engine.handle_finding(emergency_finding(), now).await.unwrap();
        assert_eq!(notifier.count.load(Ordering::SeqCst), 1, "initial dispatch notifies immediately");

        let fired = EscalationFired { alert_id, level_index: 0, level: level(vec![], true, false) };
        engine.on_level_fired(fired).await;

        assert_eq!(engine.get(alert_id).unwrap().escalation_level, 0, "held level must not escalate");
        assert_eq!(notifier.count.load(Ordering::SeqCst), 1, "no further notification while ack is outstanding");
    }

    #[tokio::test]
    async fn escalation_level_notifies_only_its_named_recipients() {
        let oncall = recipient("oncall", ContactMethod::Push);
        let manager = recipient("manager", ContactMethod::Sms);
        let oncall_notifier = Arc::new(CountingNotifier { method: ContactMethod::Push, count: AtomicU32::new(0) });
        let manager_notifier = Arc::new(CountingNotifier { method: ContactMethod::Sms, count: AtomicU32::new(0) });
        let (mut engine, _fired_rx) =
            engine_with(vec![oncall, manager], vec![oncall_notifier.clone(), manager_notifier.clone()]);

        let now = Utc::now();
        let alert_id = engine.handle_finding(emergency_finding(), now).await.unwrap();
        assert_eq!(oncall_notifier.count.load(Ordering::SeqCst), 1);
        assert_eq!(manager_notifier.count.load(Ordering::SeqCst), 1);

        let fired = EscalationFired { alert_id, level_index: 0, level: level(vec!["oncall".into()], false, false) };
        engine.on_level_fired(fired).await;

        assert_eq!(oncall_notifier.count.load(Ordering::SeqCst), 2);
        assert_eq!(manager_notifier.count.load(Ordering::SeqCst), 1, "level named only oncall");
    }
}
