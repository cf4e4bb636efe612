use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleet_detect::{Finding, FindingType, Severity};
use fleet_proto::DroneId;
use serde::{Deserialize, Serialize};

use crate::alert::Alert;

pub const MAX_WINDOW: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_HISTORY_CAPACITY: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationAction {
    SuppressDuplicates,
    CreateIncident,
    EscalateSeverity,
    MergeAlerts,
}

/// One correlation rule (spec §4.6): scans the rolling alert window for
/// findings matching on type set / severity set / source substring within
/// `max_time_diff`, triggers its `action` once `min_occurrences` matches
/// accumulate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationRule {
    pub name: String,
    pub type_set: Vec<FindingType>,
    pub severity_set: Vec<Severity>,
    pub source_substring: Option<String>,
    pub max_time_diff: Duration,
    pub min_occurrences: usize,
    pub action: CorrelationAction,
}

impl CorrelationRule {
    fn matches(&self, finding: &Finding) -> bool {
        let type_ok = self.type_set.is_empty() || self.type_set.contains(&finding.finding_type);
        let severity_ok = self.severity_set.is_empty() || self.severity_set.contains(&finding.severity);
        let source_ok = self
            .source_substring
            .as_ref()
            .map(|needle| finding.detail.contains(needle.as_str()))
            .unwrap_or(true);
        type_ok && severity_ok && source_ok
    }
}

struct WindowEntry {
    finding: Finding,
    received_at: DateTime<Utc>,
}

/// Holds the rolling window of recent findings per drone and decides, for
/// each new finding, whether it should be suppressed as a duplicate,
/// merged into an existing alert, or should spawn/escalate one.
pub struct CorrelationEngine {
    rules: Vec<CorrelationRule>,
    windows: std::collections::HashMap<DroneId, VecDeque<WindowEntry>>,
    history_capacity: usize,
}

#[derive(Debug)]
pub enum CorrelationOutcome {
    NewAlert { severity: Severity },
    Suppressed,
    Merge { existing_alert: fleet_proto::AlertId },
    EscalateSeverity { severity: Severity },
}

impl CorrelationEngine {
    pub fn new(rules: Vec<CorrelationRule>) -> Self {
        Self { rules, windows: std::collections::HashMap::new(), history_capacity: DEFAULT_HISTORY_CAPACITY }
    }

    pub fn ingest(&mut self, finding: Finding, now: DateTime<Utc>, active_alerts: &[Alert]) -> CorrelationOutcome {
        let window = self.windows.entry(finding.drone_id).or_default();
        window.retain(|entry| now.signed_duration_since(entry.received_at).to_std().unwrap_or_default() <= MAX_WINDOW);

        let mut escalate_to = None;
        let mut suppress = false;
        let mut merge_target = None;

        for rule in &self.rules {
            if !rule.matches(&finding) {
                continue;
            }
            let occurrences = window
                .iter()
                .filter(|entry| rule.matches(&entry.finding))
                .filter(|entry| {
                    now.signed_duration_since(entry.received_at).to_std().unwrap_or_default() <= rule.max_time_diff
                })
                .count()
                + 1;
            if occurrences < rule.min_occurrences {
                continue;
            }
            match rule.action {
                CorrelationAction::SuppressDuplicates => suppress = true,
                CorrelationAction::EscalateSeverity => {
                    let severity = if occurrences >= 3 { Severity::Critical } else { Severity::High };
                    escalate_to = Some(escalate_to.map_or(severity, |s: Severity| s.max(severity)));
                }
                CorrelationAction::MergeAlerts => {
                    if let Some(existing) = active_alerts.iter().find(|a| a.drone_id == finding.drone_id && a.is_actionable()) {
                        merge_target = Some(existing.id);
                    }
                }
                CorrelationAction::CreateIncident => {}
            }
        }

        if window.len() == self.history_capacity {
            window.pop_front();
        }
        window.push_back(WindowEntry { finding: finding.clone(), received_at: now });

        if suppress {
            CorrelationOutcome::Suppressed
        } else if let Some(existing_alert) = merge_target {
            CorrelationOutcome::Merge { existing_alert }
        } else if let Some(severity) = escalate_to {
            CorrelationOutcome::EscalateSeverity { severity }
        } else {
            CorrelationOutcome::NewAlert { severity: finding.severity }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_proto::DroneId;

    fn finding(finding_type: FindingType, severity_score: f64) -> Finding {
        Finding::new(DroneId(1), finding_type, severity_score, "test finding")
    }

    #[test]
    fn repeated_matching_findings_escalate_severity() {
        let rule = CorrelationRule {
            name: "repeat-spoof".into(),
            type_set: vec![FindingType::GpsSpoofing],
            severity_set: vec![],
            source_substring: None,
            max_time_diff: Duration::from_secs(60),
            min_occurrences: 2,
            action: CorrelationAction::EscalateSeverity,
        };
        let mut engine = CorrelationEngine::new(vec![rule]);
        let now = Utc::now();
        let outcome1 = engine.ingest(finding(FindingType::GpsSpoofing, 0.7), now, &[]);
        assert!(matches!(outcome1, CorrelationOutcome::NewAlert { .. }));
        let outcome2 = engine.ingest(finding(FindingType::GpsSpoofing, 0.75), now, &[]);
        assert!(matches!(outcome2, CorrelationOutcome::EscalateSeverity { severity: Severity::High }));
    }

    #[test]
    fn duplicate_suppression_rule_suppresses_after_threshold() {
        let rule = CorrelationRule {
            name: "dup".into(),
            type_set: vec![FindingType::Jamming],
            severity_set: vec![],
            source_substring: None,
            max_time_diff: Duration::from_secs(60),
            min_occurrences: 3,
            action: CorrelationAction::SuppressDuplicates,
        };
        let mut engine = CorrelationEngine::new(vec![rule]);
        let now = Utc::now();
        engine.ingest(finding(FindingType::Jamming, 0.65), now, &[]);
        engine.ingest(finding(FindingType::Jamming, 0.65), now, &[]);
        let outcome = engine.ingest(finding(FindingType::Jamming, 0.65), now, &[]);
        assert!(matches!(outcome, CorrelationOutcome::Suppressed));
    }
}
