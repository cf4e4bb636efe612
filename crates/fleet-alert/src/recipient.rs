use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use fleet_detect::Severity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    Push,
    Sms,
    Email,
    Voice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub method: ContactMethod,
    pub address: String,
    pub priority: u8,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start_hour: u32,
    pub end_hour: u32,
    pub days: Vec<Weekday>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub timezone: String,
    pub working_hours: WorkingHours,
    pub on_call: bool,
    pub contacts: Vec<Contact>,
    pub retry_attempts: u32,
    pub retry_interval_minutes: u32,
}

impl Recipient {
    /// Highest-priority contact method that is active and available given
    /// timezone/working-hours/working-days/on-call, or the first available
    /// method regardless of hours for `Severity::Emergency` (spec §4.6).
    pub fn select_contact(&self, severity: Severity, now: DateTime<Utc>) -> Option<&Contact> {
        let mut candidates: Vec<&Contact> = self.contacts.iter().filter(|c| c.active).collect();
        candidates.sort_by_key(|c| c.priority);

        if severity == Severity::Emergency {
            return candidates.into_iter().next();
        }

        if !self.is_available(now) {
            return None;
        }
        candidates.into_iter().next()
    }

    fn is_available(&self, now: DateTime<Utc>) -> bool {
        if !self.on_call {
            return false;
        }
        let tz: Tz = self.timezone.parse().unwrap_or(chrono_tz::UTC);
        let local = now.with_timezone(&tz);
        let weekday = local.weekday();
        if !self.working_hours.days.contains(&weekday) {
            return false;
        }
        let hour = local.hour();
        hour >= self.working_hours.start_hour && hour < self.working_hours.end_hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn recipient(on_call: bool) -> Recipient {
        Recipient {
            name: "alice".into(),
            timezone: "UTC".into(),
            working_hours: WorkingHours { start_hour: 9, end_hour: 17, days: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] },
            on_call,
            contacts: vec![
                Contact { method: ContactMethod::Sms, address: "+1555".into(), priority: 1, active: true },
                Contact { method: ContactMethod::Email, address: "a@example.com".into(), priority: 2, active: true },
            ],
            retry_attempts: 3,
            retry_interval_minutes: 5,
        }
    }

    #[test]
    fn off_hours_yields_no_contact_for_normal_severity() {
        let recipient_obj = recipient(true);
        // 2024-01-01 is a Monday; 02:00 UTC is outside 09:00-17:00.
        let off_hours = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        assert!(recipient_obj.select_contact(Severity::Warning, off_hours).is_none());
    }

    #[test]
    fn emergency_overrides_working_hours() {
        let recipient_obj = recipient(true);
        let off_hours = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        let contact = recipient_obj.select_contact(Severity::Emergency, off_hours);
        assert!(contact.is_some());
        assert_eq!(contact.unwrap().method, ContactMethod::Sms);
    }

    #[test]
    fn within_hours_picks_highest_priority_contact() {
        let recipient_obj = recipient(true);
        let in_hours = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let contact = recipient_obj.select_contact(Severity::Warning, in_hours).unwrap();
        assert_eq!(contact.method, ContactMethod::Sms);
    }
}
