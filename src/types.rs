//! Core types for the proctor-alert system
//!
//! All persisted and wire-facing types use camelCase JSON serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier types for the entities the core routes between.
///
/// The surrounding CRUD layer owns the actual records; the core only
/// needs stable integer keys to route alerts.
pub type UserId = i64;
pub type ExamId = i64;
pub type SessionId = i64;
pub type AlertId = i64;

/// Detector modality that produced a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Face,
    Object,
    Audio,
    Gaze,
}

/// Severity of a persisted alert
///
/// Ordered: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Aggregate risk classification for one surveillance tick
///
/// `None` is reserved for ticks where no signal triggered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// Role of an authenticated principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    /// Instructors and admins see every alert regardless of explicit
    /// subscription state.
    pub fn oversees_everything(&self) -> bool {
        matches!(self, Role::Instructor | Role::Admin)
    }
}

/// Lifecycle state of an exam session
///
/// `Completed` and `Terminated` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Terminated,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

/// A normalized, single-modality observation for one surveillance tick
///
/// Signals are ephemeral: produced by the signal adapter, consumed by
/// the risk aggregator, never persisted. `kind` holds a canonical
/// classifier string (see [`crate::signal::kind`]); `detected: false`
/// with the reserved `unavailable` kind means "no evidence", which is
/// distinct from a positive observation of absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub modality: Modality,

    /// Canonical classifier string (e.g. "multiple_faces")
    pub kind: String,

    /// Classifier confidence in [0, 1]
    pub confidence: f64,

    /// Whether the classifier positively observed its subject
    pub detected: bool,
}

impl Signal {
    /// Create a signal with a clamped confidence
    pub fn new(modality: Modality, kind: impl Into<String>, confidence: f64, detected: bool) -> Self {
        Self {
            modality,
            kind: kind.into(),
            confidence: confidence.clamp(0.0, 1.0),
            detected,
        }
    }
}

/// A persisted, severity-classified record of a policy violation candidate
///
/// Created only through [`crate::store::AlertStore::append`], which
/// assigns the monotonic id and timestamp. Never deleted, only marked
/// resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Store-assigned monotonic identifier
    pub id: AlertId,

    /// Owning session, if one was resolvable at creation time
    pub session_id: Option<SessionId>,

    /// Alert type tag (e.g. "multiple_faces", "desktop_violation")
    #[serde(rename = "type")]
    pub alert_type: String,

    pub severity: Severity,

    pub description: String,

    /// Server time at append
    pub created_at: DateTime<Utc>,

    /// Mutable; flipped by [`crate::store::AlertStore::resolve`]
    #[serde(default)]
    pub resolved: bool,
}

/// An alert draft handed to the store for id/timestamp assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    pub session_id: Option<SessionId>,
    pub alert_type: String,
    pub severity: Severity,
    pub description: String,
}

impl NewAlert {
    pub fn new(
        session_id: Option<SessionId>,
        alert_type: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            alert_type: alert_type.into(),
            severity,
            description: description.into(),
        }
    }
}

/// One student's monitored attempt at one exam
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub exam_id: ExamId,
    pub student_id: UserId,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// A violation reported by a non-detector caller (e.g. the desktop client)
///
/// Skips the risk aggregator: type, severity, and description are
/// caller-supplied. Session context is optional — the hub resolves it
/// from `session_id` or from `exam_id` + `student_id` when possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationReport {
    #[serde(rename = "type", default = "default_violation_type")]
    pub alert_type: String,

    #[serde(default = "default_violation_severity")]
    pub severity: Severity,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_id: Option<ExamId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<UserId>,
}

fn default_violation_type() -> String {
    "desktop_violation".to_string()
}

fn default_violation_severity() -> Severity {
    Severity::Medium
}

/// Outcome of one surveillance tick: persisted alerts plus the tick risk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub session_id: SessionId,
    pub risk: RiskLevel,
    pub alerts: Vec<Alert>,
}

/// Counters for the monitoring dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub active_sessions: usize,
    pub unresolved_critical_alerts: usize,
    pub connected_observers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
        let parsed: Severity = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(parsed, Severity::High);
    }

    #[test]
    fn test_risk_level_default_is_none() {
        assert_eq!(RiskLevel::default(), RiskLevel::None);
        assert_eq!(serde_json::to_string(&RiskLevel::None).unwrap(), "\"none\"");
    }

    #[test]
    fn test_role_oversight() {
        assert!(Role::Admin.oversees_everything());
        assert!(Role::Instructor.oversees_everything());
        assert!(!Role::Student.oversees_everything());
    }

    #[test]
    fn test_session_status_terminal() {
        assert!(!SessionStatus::Active.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Terminated.is_terminal());
    }

    #[test]
    fn test_signal_clamps_confidence() {
        let high = Signal::new(Modality::Face, "face_presence", 1.7, true);
        assert_eq!(high.confidence, 1.0);

        let low = Signal::new(Modality::Audio, "suspicious_audio", -0.2, false);
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn test_alert_serialization_shape() {
        let alert = Alert {
            id: 7,
            session_id: Some(42),
            alert_type: "multiple_faces".to_string(),
            severity: Severity::High,
            description: "Multiple faces detected in the camera frame".to_string(),
            created_at: Utc::now(),
            resolved: false,
        };

        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains("\"sessionId\":42"));
        assert!(json.contains("\"type\":\"multiple_faces\""));
        assert!(json.contains("\"severity\":\"high\""));
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"resolved\":false"));

        let parsed: Alert = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, alert);
    }

    #[test]
    fn test_violation_report_defaults() {
        let report: ViolationReport =
            serde_json::from_str(r#"{"description": "Forbidden application opened"}"#).unwrap();
        assert_eq!(report.alert_type, "desktop_violation");
        assert_eq!(report.severity, Severity::Medium);
        assert!(report.session_id.is_none());
        assert!(report.exam_id.is_none());
    }

    #[test]
    fn test_violation_report_camel_case_fields() {
        let report: ViolationReport = serde_json::from_str(
            r#"{"description": "x", "examId": 3, "studentId": 9, "severity": "critical"}"#,
        )
        .unwrap();
        assert_eq!(report.exam_id, Some(3));
        assert_eq!(report.student_id, Some(9));
        assert_eq!(report.severity, Severity::Critical);
    }

    #[test]
    fn test_session_roundtrip() {
        let session = Session {
            id: 1,
            exam_id: 2,
            student_id: 3,
            status: SessionStatus::Active,
            started_at: Utc::now(),
            ended_at: None,
        };

        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"examId\":2"));
        assert!(json.contains("\"status\":\"active\""));
        assert!(!json.contains("endedAt"));

        let parsed: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, session);
    }
}
