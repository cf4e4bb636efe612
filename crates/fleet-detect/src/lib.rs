//! Anomaly, threat, and component-failure detection over normalized
//! telemetry: an isolation forest and rolling z-score trackers feed a
//! shared severity/classification model, fanned out from the telemetry
//! bus's lossy side.

pub mod failure;
pub mod finding;
pub mod isolation_forest;
pub mod pipeline;
pub mod ring;
pub mod severity;
pub mod threat;
pub mod zscore;

pub use failure::{BatteryHealthModel, BatteryReading, FailurePrediction, MotorHealthModel, MotorReading};
pub use finding::{Finding, FindingType};
pub use isolation_forest::IsolationForestDetector;
pub use pipeline::DetectionPipeline;
pub use ring::RingBuffer;
pub use severity::{severity_for_score, Classification, Severity};
pub use zscore::ZScoreTracker;
