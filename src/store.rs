//! Alert store — durable append-only record of alerts
//!
//! `AlertStore` is the persistence seam: the hub talks to the trait, and
//! deployments can back it with a database without touching the
//! dispatch path. The bundled `MemoryAlertStore` serves single-process
//! use and tests.
//!
//! Append is the only path that introduces an alert id; callers never
//! pick ids, and ids are strictly increasing across all sessions.

use crate::error::{AlertError, Result};
use crate::types::{Alert, AlertId, NewAlert, SessionId, Severity};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

/// Persistence seam for alerts
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Persist a draft, assigning its id and timestamp
    ///
    /// The sole id authority. A failure here is fatal to the alert —
    /// it must not be delivered without an id.
    async fn append(&self, draft: NewAlert) -> Result<Alert>;

    /// All alerts for a session, in creation order
    async fn by_session(&self, session_id: SessionId) -> Result<Vec<Alert>>;

    /// Mark an alert resolved, returning the updated record
    async fn resolve(&self, alert_id: AlertId) -> Result<Alert>;

    /// Most recent alerts across all sessions, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<Alert>>;

    /// Count of unresolved alerts at high or critical severity
    async fn unresolved_critical(&self) -> Result<usize>;
}

struct StoreInner {
    alerts: Vec<Alert>,
    next_id: AlertId,
}

/// In-memory alert store for single-process use and testing
///
/// One lock guards both the alert log and the id counter, so
/// concurrent appends serialize through a single authority.
pub struct MemoryAlertStore {
    inner: RwLock<StoreInner>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                alerts: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Total number of stored alerts
    pub async fn len(&self) -> usize {
        self.inner.read().await.alerts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.alerts.is_empty()
    }
}

impl Default for MemoryAlertStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn append(&self, draft: NewAlert) -> Result<Alert> {
        let mut inner = self.inner.write().await;

        let alert = Alert {
            id: inner.next_id,
            session_id: draft.session_id,
            alert_type: draft.alert_type,
            severity: draft.severity,
            description: draft.description,
            created_at: Utc::now(),
            resolved: false,
        };
        inner.next_id += 1;
        inner.alerts.push(alert.clone());

        tracing::debug!(
            alert_id = alert.id,
            session_id = ?alert.session_id,
            alert_type = %alert.alert_type,
            severity = ?alert.severity,
            "Alert appended"
        );

        Ok(alert)
    }

    async fn by_session(&self, session_id: SessionId) -> Result<Vec<Alert>> {
        let inner = self.inner.read().await;
        Ok(inner
            .alerts
            .iter()
            .filter(|a| a.session_id == Some(session_id))
            .cloned()
            .collect())
    }

    async fn resolve(&self, alert_id: AlertId) -> Result<Alert> {
        let mut inner = self.inner.write().await;
        let alert = inner
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or(AlertError::AlertNotFound(alert_id))?;

        alert.resolved = true;
        Ok(alert.clone())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Alert>> {
        let inner = self.inner.read().await;
        Ok(inner.alerts.iter().rev().take(limit).cloned().collect())
    }

    async fn unresolved_critical(&self) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner
            .alerts
            .iter()
            .filter(|a| !a.resolved && a.severity >= Severity::High)
            .count())
    }
}
