//! Subscription registry — who is connected, and what they follow
//!
//! Three many-to-many scope maps (user, exam, session) plus the
//! connection directory, all guarded by one coarse lock. Every mutation
//! goes through `register`/`subscribe_*`/`unregister`; `unregister` is
//! the single teardown path and scrubs a connection from every map, so
//! churned connections never leave dangling references behind.
//!
//! Readers take one read-lock snapshot per delivery, so a broadcast is
//! never computed from a half-updated registry.

use crate::protocol::ServerMessage;
use crate::types::{ExamId, Role, SessionId, UserId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::RwLock;

/// Unique identifier for one live connection (`conn-<uuid>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(format!("conn-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one bounded push to one connection
///
/// `TimedOut` and `Closed` both mean the connection is dead to the
/// dispatcher: a receiver that cannot drain within the send timeout is
/// treated the same as a hung-up one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    TimedOut,
    Closed,
}

impl SendOutcome {
    pub fn is_dead(&self) -> bool {
        !matches!(self, SendOutcome::Delivered)
    }
}

/// Cheap-clone handle to a live connection
///
/// The registry owns the scope associations; the transport owns the
/// receiving half of the channel and pumps it to the physical socket.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    user_id: UserId,
    role: Role,
    sender: mpsc::Sender<ServerMessage>,
}

impl Connection {
    pub fn new(user_id: UserId, role: Role, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: ConnectionId::generate(),
            user_id,
            role,
            sender,
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Push a message, bounded by `timeout`
    ///
    /// Never blocks longer than the timeout: a slow receiver must not
    /// stall delivery to anyone else.
    pub async fn push(&self, message: ServerMessage, timeout: Duration) -> SendOutcome {
        match self.sender.send_timeout(message, timeout).await {
            Ok(()) => SendOutcome::Delivered,
            Err(SendTimeoutError::Timeout(_)) => SendOutcome::TimedOut,
            Err(SendTimeoutError::Closed(_)) => SendOutcome::Closed,
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    /// The connection directory: every live handle, with its role
    connections: HashMap<ConnectionId, Connection>,
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
    by_exam: HashMap<ExamId, HashSet<ConnectionId>>,
    by_session: HashMap<SessionId, HashSet<ConnectionId>>,
}

/// Lock-guarded registry of connections and their subscriptions
#[derive(Default)]
pub struct SubscriptionRegistry {
    inner: RwLock<RegistryInner>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under its user; idempotent per connection
    pub async fn register(&self, connection: Connection) {
        let mut inner = self.inner.write().await;
        let id = connection.id().clone();

        if inner.connections.contains_key(&id) {
            return;
        }

        inner
            .by_user
            .entry(connection.user_id())
            .or_default()
            .insert(id.clone());
        tracing::info!(
            connection = %id,
            user_id = connection.user_id(),
            role = ?connection.role(),
            "Connection registered"
        );
        inner.connections.insert(id, connection);
    }

    /// Follow an exam; re-subscribing is a no-op
    ///
    /// Unknown exam ids are accepted — the subscription becomes live
    /// once matching alerts appear. A subscribe racing a teardown is
    /// dropped, never resurrected.
    pub async fn subscribe_exam(&self, connection_id: &ConnectionId, exam_id: ExamId) {
        let mut inner = self.inner.write().await;
        if !inner.connections.contains_key(connection_id) {
            tracing::debug!(connection = %connection_id, exam_id, "Subscribe from unknown connection ignored");
            return;
        }
        inner
            .by_exam
            .entry(exam_id)
            .or_default()
            .insert(connection_id.clone());
    }

    /// Follow a session; re-subscribing is a no-op
    pub async fn subscribe_session(&self, connection_id: &ConnectionId, session_id: SessionId) {
        let mut inner = self.inner.write().await;
        if !inner.connections.contains_key(connection_id) {
            tracing::debug!(connection = %connection_id, session_id, "Subscribe from unknown connection ignored");
            return;
        }
        inner
            .by_session
            .entry(session_id)
            .or_default()
            .insert(connection_id.clone());
    }

    /// The single teardown path: remove a connection from every map
    ///
    /// Idempotent — a second call for the same connection is a no-op.
    /// Returns whether the connection was still registered.
    pub async fn unregister(&self, connection_id: &ConnectionId) -> bool {
        let mut inner = self.inner.write().await;

        let connection = match inner.connections.remove(connection_id) {
            Some(c) => c,
            None => return false,
        };

        if let Some(set) = inner.by_user.get_mut(&connection.user_id()) {
            set.remove(connection_id);
            if set.is_empty() {
                inner.by_user.remove(&connection.user_id());
            }
        }
        inner.by_exam.retain(|_, set| {
            set.remove(connection_id);
            !set.is_empty()
        });
        inner.by_session.retain(|_, set| {
            set.remove(connection_id);
            !set.is_empty()
        });

        tracing::info!(
            connection = %connection_id,
            user_id = connection.user_id(),
            "Connection unregistered"
        );
        true
    }

    /// Compute the delivery set for an alert, in one consistent snapshot
    ///
    /// Union of: subscribers of the session, subscribers of the exam,
    /// the owning student's own connections, and every connection whose
    /// role oversees everything. Deduplicated.
    pub async fn delivery_set(
        &self,
        session_id: Option<SessionId>,
        exam_id: Option<ExamId>,
        student_id: Option<UserId>,
    ) -> Vec<Connection> {
        let inner = self.inner.read().await;
        let mut ids: HashSet<&ConnectionId> = HashSet::new();

        if let Some(set) = session_id.and_then(|s| inner.by_session.get(&s)) {
            ids.extend(set.iter());
        }
        if let Some(set) = exam_id.and_then(|e| inner.by_exam.get(&e)) {
            ids.extend(set.iter());
        }
        if let Some(set) = student_id.and_then(|u| inner.by_user.get(&u)) {
            ids.extend(set.iter());
        }
        // Admins and instructors see everything, subscribed or not
        ids.extend(
            inner
                .connections
                .values()
                .filter(|c| c.role().oversees_everything())
                .map(|c| c.id()),
        );

        ids.into_iter()
            .filter_map(|id| inner.connections.get(id))
            .cloned()
            .collect()
    }

    /// Number of live connections
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Look up a live connection handle
    pub async fn get(&self, connection_id: &ConnectionId) -> Option<Connection> {
        self.inner.read().await.connections.get(connection_id).cloned()
    }

    /// Whether a connection id appears in any scope map
    ///
    /// Used by tests and diagnostics to assert teardown left nothing
    /// behind.
    pub async fn appears_in_any_scope(&self, connection_id: &ConnectionId) -> bool {
        let inner = self.inner.read().await;
        inner.connections.contains_key(connection_id)
            || inner.by_user.values().any(|s| s.contains(connection_id))
            || inner.by_exam.values().any(|s| s.contains(connection_id))
            || inner.by_session.values().any(|s| s.contains(connection_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(user_id: UserId, role: Role) -> (Connection, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(8);
        (Connection::new(user_id, role, tx), rx)
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        let (conn, _rx) = connection(1, Role::Student);

        registry.register(conn.clone()).await;
        registry.register(conn).await;

        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_resubscribe_is_noop() {
        let registry = SubscriptionRegistry::new();
        let (conn, _rx) = connection(1, Role::Student);
        registry.register(conn.clone()).await;

        registry.subscribe_session(conn.id(), 42).await;
        registry.subscribe_session(conn.id(), 42).await;

        let set = registry.delivery_set(Some(42), None, None).await;
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_unknown_connection_ignored() {
        let registry = SubscriptionRegistry::new();
        let (conn, _rx) = connection(1, Role::Student);

        // Never registered
        registry.subscribe_exam(conn.id(), 9).await;
        registry.subscribe_session(conn.id(), 9).await;

        assert!(!registry.appears_in_any_scope(conn.id()).await);
        assert!(registry.delivery_set(Some(9), Some(9), None).await.is_empty());
    }

    #[tokio::test]
    async fn test_unregister_scrubs_every_map() {
        let registry = SubscriptionRegistry::new();
        let (conn, _rx) = connection(1, Role::Student);
        registry.register(conn.clone()).await;
        registry.subscribe_exam(conn.id(), 5).await;
        registry.subscribe_exam(conn.id(), 6).await;
        registry.subscribe_session(conn.id(), 42).await;

        assert!(registry.unregister(conn.id()).await);
        assert!(!registry.appears_in_any_scope(conn.id()).await);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_unregister_twice_is_noop() {
        let registry = SubscriptionRegistry::new();
        let (conn, _rx) = connection(1, Role::Student);
        registry.register(conn.clone()).await;

        assert!(registry.unregister(conn.id()).await);
        assert!(!registry.unregister(conn.id()).await);
    }

    #[tokio::test]
    async fn test_delivery_set_audience() {
        let registry = SubscriptionRegistry::new();

        let (student, _rx1) = connection(10, Role::Student);
        registry.register(student.clone()).await;
        registry.subscribe_session(student.id(), 42).await;

        let (exam_watcher, _rx2) = connection(11, Role::Student);
        registry.register(exam_watcher.clone()).await;
        registry.subscribe_exam(exam_watcher.id(), 7).await;

        let (admin, _rx3) = connection(12, Role::Admin);
        registry.register(admin.clone()).await;

        let (bystander, _rx4) = connection(13, Role::Student);
        registry.register(bystander.clone()).await;
        registry.subscribe_exam(bystander.id(), 99).await;

        let set = registry.delivery_set(Some(42), Some(7), Some(10)).await;
        let ids: Vec<&str> = set.iter().map(|c| c.id().as_str()).collect();

        assert_eq!(set.len(), 3);
        assert!(ids.contains(&student.id().as_str()));
        assert!(ids.contains(&exam_watcher.id().as_str()));
        assert!(ids.contains(&admin.id().as_str()));
        assert!(!ids.contains(&bystander.id().as_str()));
    }

    #[tokio::test]
    async fn test_delivery_set_dedupes_overlapping_scopes() {
        let registry = SubscriptionRegistry::new();
        let (conn, _rx) = connection(10, Role::Student);
        registry.register(conn.clone()).await;
        registry.subscribe_session(conn.id(), 42).await;
        registry.subscribe_exam(conn.id(), 7).await;

        // Subscribed to the session, the exam, and owner of the student id
        let set = registry.delivery_set(Some(42), Some(7), Some(10)).await;
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_instructor_covered_without_subscription() {
        let registry = SubscriptionRegistry::new();
        let (instructor, _rx) = connection(2, Role::Instructor);
        registry.register(instructor.clone()).await;

        let set = registry.delivery_set(Some(1), Some(1), Some(99)).await;
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].user_id(), 2);

        // Even a session-less alert reaches the instructor
        let set = registry.delivery_set(None, None, None).await;
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_push_outcomes() {
        let (conn, mut rx) = connection(1, Role::Student);
        let timeout = Duration::from_millis(20);

        let outcome = conn
            .push(ServerMessage::Pong, timeout)
            .await;
        assert_eq!(outcome, SendOutcome::Delivered);
        assert_eq!(rx.recv().await, Some(ServerMessage::Pong));

        drop(rx);
        let outcome = conn.push(ServerMessage::Pong, timeout).await;
        assert_eq!(outcome, SendOutcome::Closed);
        assert!(outcome.is_dead());
    }

    #[tokio::test]
    async fn test_push_times_out_on_full_channel() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = Connection::new(1, Role::Student, tx);
        let timeout = Duration::from_millis(20);

        // Fill the only slot; the receiver never drains
        assert_eq!(conn.push(ServerMessage::Pong, timeout).await, SendOutcome::Delivered);
        assert_eq!(conn.push(ServerMessage::Pong, timeout).await, SendOutcome::TimedOut);
    }
}
