//! Alert hub — the high-level facade wiring aggregation, persistence,
//! sessions, and fan-out
//!
//! `AlertHub` owns the alert store behind the `AlertStore` seam and
//! shares the subscription registry with its dispatcher. The transport
//! layer drives it with plain async calls: `connect` hands back the
//! receiving half of the connection's outbound channel, `handle_message`
//! processes client control messages, and `disconnect` is the one
//! teardown entry point, safe to call from any close path.

use crate::dispatch::{DeliveryReport, Dispatcher};
use crate::error::{AlertError, Result};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::{Connection, ConnectionId, SubscriptionRegistry};
use crate::risk::{self, DEFAULT_VERIFICATION_THRESHOLD};
use crate::session::SessionLedger;
use crate::store::AlertStore;
use crate::types::{
    Alert, AlertId, DashboardStats, ExamId, NewAlert, Role, Session, SessionId, Signal,
    TickReport, UserId, ViolationReport,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Tunables for the hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Upper bound on one push to one connection; a connection that
    /// cannot drain within this window is treated as disconnected
    pub send_timeout: Duration,

    /// Capacity of each connection's outbound channel
    pub channel_capacity: usize,

    /// Confidence floor for identity-match signals
    pub verification_threshold: f64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_millis(250),
            channel_capacity: 64,
            verification_threshold: DEFAULT_VERIFICATION_THRESHOLD,
        }
    }
}

/// High-level alert aggregation and fan-out facade
pub struct AlertHub {
    store: Box<dyn AlertStore>,
    sessions: SessionLedger,
    registry: Arc<SubscriptionRegistry>,
    dispatcher: Dispatcher,
    config: HubConfig,
}

impl AlertHub {
    /// Create a hub over an alert store with default configuration
    pub fn new(store: impl AlertStore + 'static) -> Self {
        Self::with_config(store, HubConfig::default())
    }

    pub fn with_config(store: impl AlertStore + 'static, config: HubConfig) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = Dispatcher::new(registry.clone(), config.send_timeout);
        Self {
            store: Box::new(store),
            sessions: SessionLedger::new(),
            registry,
            dispatcher,
            config,
        }
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Register a new observer connection for an authenticated principal
    ///
    /// Returns the connection handle and the receiving half of its
    /// outbound channel; the transport pumps the receiver to the
    /// physical socket. Instructors and admins are eagerly subscribed
    /// to every currently active session and its exam; sessions created
    /// later are still covered by the dispatcher's role-based fan-out.
    /// The `connected` welcome message is queued before returning.
    pub async fn connect(
        &self,
        user_id: UserId,
        role: Role,
    ) -> (Connection, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let connection = Connection::new(user_id, role, tx);
        self.registry.register(connection.clone()).await;

        if role.oversees_everything() {
            let active = self.sessions.active().await;
            for session in &active {
                self.registry.subscribe_session(connection.id(), session.id).await;
                self.registry.subscribe_exam(connection.id(), session.exam_id).await;
            }
            tracing::info!(
                user_id,
                role = ?role,
                sessions = active.len(),
                "Observer auto-subscribed to active sessions"
            );
        }

        self.send_to(&connection, ServerMessage::Connected { user_id, role })
            .await;

        (connection, rx)
    }

    /// Process one client control message
    ///
    /// Subscribing to an unknown exam or session is not an error — the
    /// subscription becomes live once matching alerts appear. Messages
    /// from connections that already tore down are dropped.
    pub async fn handle_message(&self, connection_id: &ConnectionId, message: ClientMessage) {
        let connection = match self.registry.get(connection_id).await {
            Some(c) => c,
            None => {
                tracing::debug!(connection = %connection_id, "Message from unknown connection dropped");
                return;
            }
        };

        match message {
            ClientMessage::SubscribeExam { exam_id } => {
                self.registry.subscribe_exam(connection_id, exam_id).await;
                self.send_to(&connection, ServerMessage::subscribed_exam(exam_id))
                    .await;
            }
            ClientMessage::SubscribeSession { session_id } => {
                self.registry.subscribe_session(connection_id, session_id).await;
                self.send_to(&connection, ServerMessage::subscribed_session(session_id))
                    .await;
            }
            ClientMessage::Ping => {
                self.send_to(&connection, ServerMessage::Pong).await;
            }
        }
    }

    /// Tear down a connection; idempotent across racing close paths
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        self.registry.unregister(connection_id).await;
    }

    async fn send_to(&self, connection: &Connection, message: ServerMessage) {
        let outcome = connection.push(message, self.config.send_timeout).await;
        if outcome.is_dead() {
            self.registry.unregister(connection.id()).await;
        }
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Start a monitored session; requires prior identity verification
    pub async fn start_session(
        &self,
        exam_id: ExamId,
        student_id: UserId,
        identity_verified: bool,
    ) -> Result<Session> {
        self.sessions.create(exam_id, student_id, identity_verified).await
    }

    pub async fn complete_session(&self, session_id: SessionId) -> Result<Session> {
        self.sessions.complete(session_id).await
    }

    pub async fn terminate_session(&self, session_id: SessionId) -> Result<Session> {
        self.sessions.terminate(session_id).await
    }

    pub async fn session(&self, session_id: SessionId) -> Option<Session> {
        self.sessions.get(session_id).await
    }

    pub async fn active_sessions(&self) -> Vec<Session> {
        self.sessions.active().await
    }

    // ── Alert ingestion ──────────────────────────────────────────────

    /// Aggregate one surveillance tick's signals into alerts and fan
    /// them out
    ///
    /// Each triggered draft is appended (a store failure is fatal to
    /// that alert and surfaced) and then delivered best-effort. Alerts
    /// for the same session go out in creation order. A tick against a
    /// completed or terminated session is still recorded — detector
    /// output can race the session end — and dispatched to whoever is
    /// still listening.
    pub async fn observe_tick(
        &self,
        session_id: SessionId,
        signals: &[Signal],
    ) -> Result<TickReport> {
        let session = self
            .sessions
            .get(session_id)
            .await
            .ok_or(AlertError::SessionNotFound(session_id))?;

        let assessment = risk::assess_with_threshold(signals, self.config.verification_threshold);

        let mut alerts = Vec::with_capacity(assessment.drafts.len());
        for draft in assessment.drafts {
            let alert = self
                .store
                .append(NewAlert::new(
                    Some(session_id),
                    draft.alert_type,
                    draft.severity,
                    draft.description,
                ))
                .await?;
            self.dispatcher
                .deliver(&alert, Some(session.exam_id), Some(session.student_id))
                .await;
            alerts.push(alert);
        }

        tracing::info!(
            session_id,
            alerts = alerts.len(),
            risk = ?assessment.risk,
            "Surveillance tick processed"
        );

        Ok(TickReport {
            session_id,
            risk: assessment.risk,
            alerts,
        })
    }

    /// Record and fan out a violation reported by a non-detector caller
    ///
    /// Skips the aggregator: type, severity, and description come from
    /// the caller. The owning session is resolved from the report's
    /// explicit session id or, failing that, from the student's active
    /// session for the given exam. With no resolvable session the alert
    /// is recorded unbound and still reaches every admin/instructor.
    pub async fn report_violation(&self, report: ViolationReport) -> Result<Alert> {
        let session = match report.session_id {
            Some(session_id) => self.sessions.get(session_id).await,
            None => match (report.exam_id, report.student_id) {
                (Some(exam_id), Some(student_id)) => {
                    self.sessions.active_for(exam_id, student_id).await
                }
                _ => None,
            },
        };

        let alert = self
            .store
            .append(NewAlert::new(
                session.as_ref().map(|s| s.id),
                report.alert_type,
                report.severity,
                report.description,
            ))
            .await?;

        let report = self
            .dispatcher
            .deliver(
                &alert,
                session.as_ref().map(|s| s.exam_id),
                session.as_ref().map(|s| s.student_id),
            )
            .await;
        log_violation_delivery(&alert, report);

        Ok(alert)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// All alerts for a session in creation order
    ///
    /// Reconnecting clients use this to backfill alerts missed while
    /// their connection was down.
    pub async fn alerts_for_session(&self, session_id: SessionId) -> Result<Vec<Alert>> {
        if self.sessions.get(session_id).await.is_none() {
            return Err(AlertError::SessionNotFound(session_id));
        }
        self.store.by_session(session_id).await
    }

    pub async fn resolve_alert(&self, alert_id: AlertId) -> Result<Alert> {
        self.store.resolve(alert_id).await
    }

    pub async fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>> {
        self.store.recent(limit).await
    }

    /// Counters for the monitoring dashboard
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        Ok(DashboardStats {
            active_sessions: self.sessions.active().await.len(),
            unresolved_critical_alerts: self.store.unresolved_critical().await?,
            connected_observers: self.registry.connection_count().await,
        })
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.connection_count().await
    }
}

fn log_violation_delivery(alert: &Alert, report: DeliveryReport) {
    tracing::info!(
        alert_id = alert.id,
        session_id = ?alert.session_id,
        delivered = report.delivered,
        purged = report.purged,
        "External violation report dispatched"
    );
}

/// Wrap a connection's outbound receiver in a `Stream`
///
/// Convenience for transports that pump messages with `StreamExt`
/// combinators instead of a `recv` loop.
pub fn message_stream(receiver: mpsc::Receiver<ServerMessage>) -> ReceiverStream<ServerMessage> {
    ReceiverStream::new(receiver)
}
