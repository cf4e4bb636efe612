//! Correlation, the per-alert state machine, escalation timers, and
//! recipient/notifier dispatch for findings emitted by `fleet-detect`.

pub mod alert;
pub mod correlation;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod notifier;
pub mod recipient;
pub mod template;

pub use alert::{Alert, AlertStatus};
pub use correlation::{CorrelationAction, CorrelationEngine, CorrelationOutcome, CorrelationRule};
pub use engine::{run_escalation_loop, AlertEngine, SharedAlertEngine};
pub use error::{AlertTransitionError, FleetAlertError};
pub use escalation::{EscalationFired, EscalationLevel, EscalationRule, EscalationTimers};
pub use notifier::{send_with_retry, NotifyError, Notifier};
pub use recipient::{Contact, ContactMethod, Recipient, WorkingHours};
pub use template::NotificationTemplate;
