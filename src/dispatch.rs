//! Broadcast dispatcher — best-effort fan-out of one alert
//!
//! Delivery is independent per connection: each push is bounded by the
//! send timeout and fails alone. Dead connections (closed or too slow
//! to drain) are lazily purged through the registry's single teardown
//! path. Nothing here ever surfaces a failure to the alert producer —
//! alert creation succeeds independent of how many observers actually
//! receive it. There are no retries and no ordering promise across
//! connections; each connection's own channel preserves append order.

use crate::protocol::ServerMessage;
use crate::registry::{Connection, SendOutcome, SubscriptionRegistry};
use crate::types::{Alert, ExamId, UserId};
use std::sync::Arc;
use std::time::Duration;

/// Summary of one fan-out pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Connections in the delivery set
    pub attempted: usize,
    /// Successful pushes
    pub delivered: usize,
    /// Dead connections purged during this pass
    pub purged: usize,
}

/// Fans alerts out to every entitled connection
pub struct Dispatcher {
    registry: Arc<SubscriptionRegistry>,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<SubscriptionRegistry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
        }
    }

    /// Deliver one alert to its audience
    ///
    /// The audience is resolved in one registry snapshot: session
    /// subscribers, exam subscribers, the owning student's connections,
    /// and every admin/instructor connection. Pushes run concurrently.
    pub async fn deliver(
        &self,
        alert: &Alert,
        exam_id: Option<ExamId>,
        student_id: Option<UserId>,
    ) -> DeliveryReport {
        let targets = self
            .registry
            .delivery_set(alert.session_id, exam_id, student_id)
            .await;
        let attempted = targets.len();
        if attempted == 0 {
            return DeliveryReport::default();
        }

        let message = ServerMessage::alert(alert, exam_id);
        let pushes = targets.iter().map(|connection| {
            let message = message.clone();
            async move { (connection, connection.push(message, self.send_timeout).await) }
        });
        let outcomes: Vec<(&Connection, SendOutcome)> = futures::future::join_all(pushes).await;

        let mut delivered = 0;
        let mut purged = 0;
        for (connection, outcome) in outcomes {
            if outcome.is_dead() {
                tracing::warn!(
                    connection = %connection.id(),
                    user_id = connection.user_id(),
                    outcome = ?outcome,
                    alert_id = alert.id,
                    "Dropping dead connection during broadcast"
                );
                self.registry.unregister(connection.id()).await;
                purged += 1;
            } else {
                delivered += 1;
            }
        }

        tracing::debug!(
            alert_id = alert.id,
            session_id = ?alert.session_id,
            attempted,
            delivered,
            purged,
            "Alert dispatched"
        );

        DeliveryReport {
            attempted,
            delivered,
            purged,
        }
    }
}
