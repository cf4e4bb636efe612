use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    High,
    Critical,
    Emergency,
}

/// Shared score→severity mapping used by every detector (spec §4.4). `L2`:
/// a higher score never maps to a lower severity.
pub fn severity_for_score(score: f64) -> Severity {
    if score >= 0.9 {
        Severity::Emergency
    } else if score >= 0.8 {
        Severity::Critical
    } else if score >= 0.6 {
        Severity::High
    } else if score >= 0.4 {
        Severity::Warning
    } else {
        Severity::Info
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Unclassified,
    Confidential,
    Secret,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_match_spec() {
        assert_eq!(severity_for_score(0.95), Severity::Emergency);
        assert_eq!(severity_for_score(0.85), Severity::Critical);
        assert_eq!(severity_for_score(0.65), Severity::High);
        assert_eq!(severity_for_score(0.45), Severity::Warning);
        assert_eq!(severity_for_score(0.1), Severity::Info);
    }

    #[test]
    fn severity_is_monotonic_in_score_l2() {
        let scores = [0.0, 0.2, 0.41, 0.6, 0.61, 0.8, 0.81, 0.9, 0.95, 1.0];
        let mut prev = severity_for_score(scores[0]);
        for &s in &scores[1..] {
            let sev = severity_for_score(s);
            assert!(sev >= prev, "severity must not decrease as score increases");
            prev = sev;
        }
    }
}
