//! Session ledger — lifecycle of monitored exam sessions
//!
//! Sessions move `active -> completed` (voluntary submission) or
//! `active -> terminated` (administrative action); both end states are
//! terminal. Creation requires the caller to assert that identity
//! verification already succeeded — an unverified party must not start
//! monitored activity.

use crate::error::{AlertError, Result};
use crate::types::{ExamId, Session, SessionId, SessionStatus, UserId};
use chrono::Utc;
use tokio::sync::RwLock;

struct LedgerInner {
    sessions: std::collections::HashMap<SessionId, Session>,
    next_id: SessionId,
}

/// In-memory ledger of exam sessions
pub struct SessionLedger {
    inner: RwLock<LedgerInner>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerInner {
                sessions: std::collections::HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Start a monitored session for a student
    ///
    /// `identity_verified` asserts a prior successful identity check by
    /// the external verification collaborator.
    pub async fn create(
        &self,
        exam_id: ExamId,
        student_id: UserId,
        identity_verified: bool,
    ) -> Result<Session> {
        if !identity_verified {
            return Err(AlertError::IdentityUnverified);
        }

        let mut inner = self.inner.write().await;
        let session = Session {
            id: inner.next_id,
            exam_id,
            student_id,
            status: SessionStatus::Active,
            started_at: Utc::now(),
            ended_at: None,
        };
        inner.next_id += 1;
        inner.sessions.insert(session.id, session.clone());

        tracing::info!(
            session_id = session.id,
            exam_id,
            student_id,
            "Exam session started"
        );
        Ok(session)
    }

    /// Normal submission: `active -> completed`
    pub async fn complete(&self, session_id: SessionId) -> Result<Session> {
        self.finish(session_id, SessionStatus::Completed).await
    }

    /// Administrative termination: `active -> terminated`
    pub async fn terminate(&self, session_id: SessionId) -> Result<Session> {
        self.finish(session_id, SessionStatus::Terminated).await
    }

    async fn finish(&self, session_id: SessionId, status: SessionStatus) -> Result<Session> {
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or(AlertError::SessionNotFound(session_id))?;

        if session.status.is_terminal() {
            return Err(AlertError::SessionClosed {
                session_id,
                status: session.status,
            });
        }

        session.status = status;
        session.ended_at = Some(Utc::now());

        tracing::info!(session_id, status = ?status, "Exam session ended");
        Ok(session.clone())
    }

    pub async fn get(&self, session_id: SessionId) -> Option<Session> {
        self.inner.read().await.sessions.get(&session_id).cloned()
    }

    /// Snapshot of all currently active sessions
    pub async fn active(&self) -> Vec<Session> {
        self.inner
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Active)
            .cloned()
            .collect()
    }

    /// The student's active session for an exam, if any
    ///
    /// Used to bind a session-less violation report to its context.
    pub async fn active_for(&self, exam_id: ExamId, student_id: UserId) -> Option<Session> {
        self.inner
            .read()
            .await
            .sessions
            .values()
            .find(|s| {
                s.exam_id == exam_id
                    && s.student_id == student_id
                    && s.status == SessionStatus::Active
            })
            .cloned()
    }
}

impl Default for SessionLedger {
    fn default() -> Self {
        Self::new()
    }
}
