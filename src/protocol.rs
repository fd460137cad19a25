//! Wire protocol for the persistent observer channel
//!
//! Internally tagged messages with snake_case type tags and camelCase
//! fields. The transport layer (out of scope here) frames these as JSON
//! over whatever bidirectional channel it maintains; the core only
//! produces and consumes the typed values.

use crate::types::{Alert, AlertId, ExamId, Role, SessionId, Severity, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Control messages sent by a connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Follow every alert for an exam
    #[serde(rename_all = "camelCase")]
    SubscribeExam { exam_id: ExamId },

    /// Follow every alert for a session
    #[serde(rename_all = "camelCase")]
    SubscribeSession { session_id: SessionId },

    /// Liveness probe, answered with `pong`
    Ping,
}

/// Messages pushed to a connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Welcome message sent once on connect
    #[serde(rename_all = "camelCase")]
    Connected { user_id: UserId, role: Role },

    /// Acknowledges a subscribe request
    #[serde(rename_all = "camelCase")]
    Subscribed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exam_id: Option<ExamId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },

    Pong,

    /// An alert push
    Alert { alert: AlertPayload },
}

impl ServerMessage {
    pub fn alert(alert: &Alert, exam_id: Option<ExamId>) -> Self {
        ServerMessage::Alert {
            alert: AlertPayload::from_alert(alert, exam_id),
        }
    }

    pub fn subscribed_exam(exam_id: ExamId) -> Self {
        ServerMessage::Subscribed {
            exam_id: Some(exam_id),
            session_id: None,
        }
    }

    pub fn subscribed_session(session_id: SessionId) -> Self {
        ServerMessage::Subscribed {
            exam_id: None,
            session_id: Some(session_id),
        }
    }
}

/// The alert body pushed to observers
///
/// Mirrors [`Alert`] plus the owning exam resolved at dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    pub id: AlertId,
    pub session_id: Option<SessionId>,
    pub exam_id: Option<ExamId>,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: Severity,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
}

impl AlertPayload {
    pub fn from_alert(alert: &Alert, exam_id: Option<ExamId>) -> Self {
        Self {
            id: alert.id,
            session_id: alert.session_id,
            exam_id,
            alert_type: alert.alert_type.clone(),
            severity: alert.severity,
            description: alert.description.clone(),
            created_at: alert.created_at,
            resolved: alert.resolved,
        }
    }
}
