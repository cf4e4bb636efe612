use chrono::{DateTime, Utc};
use fleet_detect::Severity;
use fleet_proto::{DroneId, FindingId};
use serde::{Deserialize, Serialize};

use crate::error::AlertTransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Suppressed,
    Escalated,
}

/// Post-correlation alert: exactly one per correlated finding group (spec
/// §4 glossary). `escalation_level` only ever increases (`P4`); every
/// transition method here is idempotent in the sense that repeating a
/// transition the alert already satisfies is a no-op, not an error
/// (`P6`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: fleet_proto::AlertId,
    pub drone_id: DroneId,
    pub finding_refs: Vec<FindingId>,
    pub severity: Severity,
    pub status: AlertStatus,
    pub escalation_level: u32,
    pub suppress_until: Option<DateTime<Utc>>,
    pub ack_by: Option<String>,
    pub resolve_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(drone_id: DroneId, finding_refs: Vec<FindingId>, severity: Severity, now: DateTime<Utc>) -> Self {
        Self {
            id: fleet_proto::AlertId::new(),
            drone_id,
            finding_refs,
            severity,
            status: AlertStatus::Active,
            escalation_level: 0,
            suppress_until: None,
            ack_by: None,
            resolve_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn acknowledge(&mut self, by: impl Into<String>, now: DateTime<Utc>) -> Result<(), AlertTransitionError> {
        match self.status {
            AlertStatus::Acknowledged => Ok(()),
            AlertStatus::Active | AlertStatus::Escalated => {
                self.status = AlertStatus::Acknowledged;
                self.ack_by = Some(by.into());
                self.updated_at = now;
                Ok(())
            }
            status => Err(AlertTransitionError::InvalidTransition { action: "acknowledge", status }),
        }
    }

    pub fn resolve(&mut self, by: impl Into<String>, now: DateTime<Utc>) -> Result<(), AlertTransitionError> {
        if self.status == AlertStatus::Resolved {
            return Ok(());
        }
        self.status = AlertStatus::Resolved;
        self.resolve_by = Some(by.into());
        self.updated_at = now;
        Ok(())
    }

    pub fn suppress(&mut self, until: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), AlertTransitionError> {
        match self.status {
            AlertStatus::Suppressed => {
                self.suppress_until = Some(until);
                Ok(())
            }
            AlertStatus::Active => {
                self.status = AlertStatus::Suppressed;
                self.suppress_until = Some(until);
                self.updated_at = now;
                Ok(())
            }
            status => Err(AlertTransitionError::InvalidTransition { action: "suppress", status }),
        }
    }

    /// Called by the escalation timer; suppression-expiry is handled by
    /// the same polling/timer service since it is time-driven, not
    /// event-driven.
    pub fn expire_suppression(&mut self, now: DateTime<Utc>) {
        if self.status == AlertStatus::Suppressed {
            self.status = AlertStatus::Active;
            self.suppress_until = None;
            self.updated_at = now;
        }
    }

    pub fn escalate(&mut self, now: DateTime<Utc>) -> Result<(), AlertTransitionError> {
        match self.status {
            AlertStatus::Active => {
                self.status = AlertStatus::Escalated;
                self.escalation_level += 1;
                self.updated_at = now;
                Ok(())
            }
            AlertStatus::Escalated => {
                self.escalation_level += 1;
                self.updated_at = now;
                Ok(())
            }
            status => Err(AlertTransitionError::InvalidTransition { action: "escalate", status }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status == AlertStatus::Resolved
    }

    /// Whether the alert can still receive escalation/ack actions (spec:
    /// "still eligible for ack/resolve" while escalated).
    pub fn is_actionable(&self) -> bool {
        !self.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert() -> Alert {
        Alert::new(DroneId(1), vec![], Severity::High, Utc::now())
    }

    #[test]
    fn acknowledge_is_idempotent_p6() {
        let mut a = alert();
        let now = Utc::now();
        a.acknowledge("operator", now).unwrap();
        a.acknowledge("operator", now).unwrap();
        assert_eq!(a.status, AlertStatus::Acknowledged);
    }

    #[test]
    fn cannot_acknowledge_resolved_alert() {
        let mut a = alert();
        let now = Utc::now();
        a.resolve("operator", now).unwrap();
        assert!(a.acknowledge("operator", now).is_err());
    }

    #[test]
    fn escalation_level_is_monotonic_p4() {
        let mut a = alert();
        let now = Utc::now();
        a.escalate(now).unwrap();
        a.escalate(now).unwrap();
        a.escalate(now).unwrap();
        assert_eq!(a.escalation_level, 3);
    }

    #[test]
    fn suppression_expires_back_to_active() {
        let mut a = alert();
        let now = Utc::now();
        a.suppress(now, now).unwrap();
        assert_eq!(a.status, AlertStatus::Suppressed);
        a.expire_suppression(now);
        assert_eq!(a.status, AlertStatus::Active);
    }
}
