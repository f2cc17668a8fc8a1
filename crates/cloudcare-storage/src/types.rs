//! Record types held by the emergency store.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// ============================================================================
// Directory records
// ============================================================================

/// Patient as seen by the emergency service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// External patient identifier (e.g. "P-1001")
    pub patient_id: String,
    pub name: String,
    /// Set while the patient has an unresolved emergency
    #[serde(default)]
    pub emergency_flag: bool,
    #[serde(default)]
    pub emergency_type: Option<String>,
    #[serde(default)]
    pub emergency_notes: Option<String>,
}

impl PatientRecord {
    pub fn new(patient_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            name: name.into(),
            emergency_flag: false,
            emergency_type: None,
            emergency_notes: None,
        }
    }
}

/// Emergency marker written onto a patient while an alert is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyFlag {
    pub emergency_type: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalRecord {
    pub hospital_id: String,
    /// Alerts reference hospitals by name
    pub name: String,
}

impl HospitalRecord {
    pub fn new(hospital_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            hospital_id: hospital_id.into(),
            name: name.into(),
        }
    }
}

// ============================================================================
// Emergency alerts
// ============================================================================

/// Lifecycle state of an emergency alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Responding,
    Resolved,
    FalseAlarm,
}

impl AlertStatus {
    /// Statuses that still require attention.
    pub const OPEN: [AlertStatus; 3] = [
        AlertStatus::Active,
        AlertStatus::Acknowledged,
        AlertStatus::Responding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Responding => "responding",
            AlertStatus::Resolved => "resolved",
            AlertStatus::FalseAlarm => "false_alarm",
        }
    }

    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            other => Err(format!(
                "unknown severity '{other}', expected one of critical, high, medium, low"
            )),
        }
    }
}

/// A stored emergency alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub alert_id: String,
    pub patient_id: String,
    /// `HospitalRecord::hospital_id` of the hospital the alert was routed to
    pub hospital_id: Option<String>,
    /// Free-form type such as "cardiac_arrest", "fall", "critical_vitals"
    pub alert_type: String,
    pub severity: Severity,
    pub description: String,
    /// Origin of the alert: "wearable", "manual", "system"...
    pub triggered_by: String,
    pub trigger_data: Option<serde_json::Value>,
    pub location: Option<String>,
    pub status: AlertStatus,
    #[serde(default)]
    pub responders: Vec<String>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub response_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub resolved_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl EmergencyAlert {
    /// Add a responder unless already listed.
    pub fn add_responder(&mut self, responder_id: &str) {
        if !self.responders.iter().any(|r| r == responder_id) {
            self.responders.push(responder_id.to_string());
        }
    }

    /// Move to `status` and bump `updated_at`.
    pub fn transition(&mut self, status: AlertStatus, at: OffsetDateTime) {
        self.status = status;
        self.updated_at = at;
        match status {
            AlertStatus::Acknowledged => self.response_time = Some(at),
            AlertStatus::Resolved | AlertStatus::FalseAlarm => self.resolved_at = Some(at),
            AlertStatus::Active | AlertStatus::Responding => {}
        }
    }
}

/// Selection criteria for listing and counting alerts.
///
/// `skip` and `limit` only apply to listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFilter {
    pub patient_id: Option<String>,
    /// Empty means any status
    pub statuses: Vec<AlertStatus>,
    pub severity: Option<Severity>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl AlertFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_patient(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }

    pub fn with_status(mut self, status: AlertStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = AlertStatus>) -> Self {
        self.statuses.extend(statuses);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn paged(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, alert: &EmergencyAlert) -> bool {
        if let Some(ref patient_id) = self.patient_id {
            if &alert.patient_id != patient_id {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&alert.status) {
            return false;
        }
        if let Some(severity) = self.severity {
            if alert.severity != severity {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn alert(status: AlertStatus, severity: Severity) -> EmergencyAlert {
        let now = datetime!(2024-05-01 10:00:00 UTC);
        EmergencyAlert {
            alert_id: "A1".into(),
            patient_id: "P-1".into(),
            hospital_id: None,
            alert_type: "fall".into(),
            severity,
            description: "Patient fell".into(),
            triggered_by: "wearable".into(),
            trigger_data: None,
            location: None,
            status,
            responders: Vec::new(),
            notes: None,
            response_time: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&AlertStatus::FalseAlarm).unwrap(),
            "\"false_alarm\""
        );
        assert!(AlertStatus::Responding.is_open());
        assert!(!AlertStatus::Resolved.is_open());
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("catastrophic".parse::<Severity>().is_err());
    }

    #[test]
    fn test_add_responder_is_idempotent() {
        let mut a = alert(AlertStatus::Active, Severity::High);
        a.add_responder("dr-1");
        a.add_responder("dr-1");
        a.add_responder("dr-2");
        assert_eq!(a.responders, vec!["dr-1", "dr-2"]);
    }

    #[test]
    fn test_transition_sets_timestamps() {
        let at = datetime!(2024-05-01 10:05:00 UTC);
        let mut a = alert(AlertStatus::Active, Severity::High);

        a.transition(AlertStatus::Acknowledged, at);
        assert_eq!(a.response_time, Some(at));
        assert_eq!(a.updated_at, at);

        a.transition(AlertStatus::FalseAlarm, at);
        assert_eq!(a.resolved_at, Some(at));
    }

    #[test]
    fn test_filter_matches() {
        let a = alert(AlertStatus::Active, Severity::Critical);

        assert!(AlertFilter::new().matches(&a));
        assert!(AlertFilter::new().with_status(AlertStatus::Active).matches(&a));
        assert!(!AlertFilter::new().with_status(AlertStatus::Resolved).matches(&a));
        assert!(AlertFilter::new().with_severity(Severity::Critical).matches(&a));
        assert!(!AlertFilter::new().with_severity(Severity::Low).matches(&a));
        assert!(!AlertFilter::new().for_patient("P-2").matches(&a));
    }

    #[test]
    fn test_alert_json_uses_rfc3339() {
        let json = serde_json::to_value(alert(AlertStatus::Active, Severity::Medium)).unwrap();
        assert_eq!(json["created_at"], "2024-05-01T10:00:00Z");
        assert_eq!(json["status"], "active");
        assert_eq!(json["severity"], "medium");
        assert!(json["resolved_at"].is_null());
    }
}
