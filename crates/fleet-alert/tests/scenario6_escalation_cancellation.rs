use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_alert::{run_escalation_loop, AlertEngine, AlertStatus, CorrelationEngine, EscalationLevel, EscalationRule, NotificationTemplate};
use fleet_detect::{Finding, FindingType};
use fleet_proto::DroneId;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

fn levels() -> EscalationRule {
    EscalationRule {
        levels: vec![
            EscalationLevel { delay: Duration::from_secs(0), recipients: vec![], actions: vec![], requires_ack: false, auto_resolve: false },
            EscalationLevel { delay: Duration::from_secs(15 * 60), recipients: vec![], actions: vec![], requires_ack: false, auto_resolve: false },
            EscalationLevel { delay: Duration::from_secs(30 * 60), recipients: vec![], actions: vec![], requires_ack: false, auto_resolve: false },
        ],
    }
}

/// Scenario 6: alert with levels at 0/15/30 minutes, acknowledged at 10
/// minutes; levels 2 and 3 must never fire and the alert stays
/// `acknowledged` until resolved.
#[tokio::test(start_paused = true)]
async fn acknowledging_mid_chain_cancels_remaining_levels() {
    let (engine, fired_rx) = AlertEngine::new(
        CorrelationEngine::new(vec![]),
        levels(),
        vec![],
        vec![],
        NotificationTemplate { name: "default".into(), body: "{drone_id} {severity}".into() },
    );
    let engine = Arc::new(Mutex::new(engine));

    let loop_cancel = CancellationToken::new();
    tokio::spawn(run_escalation_loop(engine.clone(), fired_rx, loop_cancel.clone()));

    let now = Utc::now();
    let finding = Finding::new(DroneId(3), FindingType::BatteryDegradation, 0.85, "battery critical");
    let alert_id = {
        let mut guard = engine.lock().await;
        guard.handle_finding(finding, now).await.expect("alert created")
    };

    tokio::time::advance(Duration::from_secs(10 * 60)).await;
    tokio::task::yield_now().await;
    {
        let mut guard = engine.lock().await;
        guard.acknowledge(alert_id, "operator", Utc::now()).await.unwrap();
    }

    tokio::time::advance(Duration::from_secs(60 * 60)).await;
    tokio::task::yield_now().await;

    let guard = engine.lock().await;
    let alert = guard.active_alerts().into_iter().find(|a| a.id == alert_id).expect("still actionable, not resolved");
    assert_eq!(alert.status, AlertStatus::Acknowledged);
    loop_cancel.cancel();
}
