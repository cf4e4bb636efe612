use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlertTransitionError {
    #[error("cannot {action} an alert in status {status:?}")]
    InvalidTransition { action: &'static str, status: crate::alert::AlertStatus },
    #[error("no alert with that id")]
    NotFound,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FleetAlertError {
    #[error(transparent)]
    Transition(#[from] AlertTransitionError),
    #[error(transparent)]
    Alert(#[from] fleet_proto::AlertError),
}
