use std::collections::HashMap;

use fleet_detect::{Finding, Severity};
use fleet_proto::DroneId;
use serde::{Deserialize, Serialize};

use crate::error::FleetAlertError;

/// Placeholder-substitution notification body. Placeholders are plain
/// `{name}` tokens replaced by straight string substitution (spec §4.6:
/// no templating engine required, just `{drone_id}`/`{severity}`/
/// `{finding_type}` and friends).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub name: String,
    pub body: String,
}

impl NotificationTemplate {
    pub fn render(&self, drone_id: DroneId, severity: Severity, finding: Option<&Finding>) -> Result<String, FleetAlertError> {
        let mut values: HashMap<&str, String> = HashMap::new();
        values.insert("drone_id", drone_id.to_string());
        values.insert("severity", format!("{severity:?}").to_lowercase());
        if let Some(finding) = finding {
            values.insert("finding_type", format!("{:?}", finding.finding_type));
            values.insert("detail", finding.detail.clone());
            values.insert("score", format!("{:.2}", finding.score));
        }

        let mut rendered = self.body.clone();
        for (key, value) in &values {
            rendered = rendered.replace(&format!("{{{key}}}"), value);
        }

        if rendered.contains('{') && rendered.contains('}') {
            return Err(FleetAlertError::Alert(fleet_proto::AlertError::TemplateError(format!(
                "unresolved placeholder in template {}",
                self.name
            ))));
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_detect::FindingType;

    #[test]
    fn substitutes_known_placeholders() {
        let template = NotificationTemplate {
            name: "default".into(),
            body: "Drone {drone_id} raised a {severity} alert: {detail}".into(),
        };
        let finding = Finding::new(DroneId(42), FindingType::Jamming, 0.7, "link degraded");
        let rendered = template.render(DroneId(42), Severity::High, Some(&finding)).unwrap();
        assert_eq!(rendered, "Drone drone-42 raised a high alert: link degraded");
    }

    #[test]
    fn unresolved_placeholder_is_a_template_error() {
        let template = NotificationTemplate {
            name: "broken".into(),
            body: "Unknown {not_a_field}".into(),
        };
        assert!(template.render(DroneId(1), Severity::Info, None).is_err());
    }
}
