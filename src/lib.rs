//! # proctor-alert
//!
//! Real-time security alert aggregation and fan-out for remote exam
//! proctoring.
//!
//! ## Overview
//!
//! `proctor-alert` turns raw per-modality detector output (face
//! presence/identity, suspicious objects, audio anomalies, gaze) into
//! severity-classified alerts and a per-tick session risk level, then
//! pushes each alert to every observer entitled to see it: subscribers
//! of the owning session, subscribers of its exam, the student's own
//! connections, and every connected administrator or instructor.
//!
//! Delivery is best-effort and independent per connection — a slow or
//! dead observer never stalls the rest, and dead connections are lazily
//! purged. The fan-out is single-process and in-memory; the transport
//! (WebSocket, SSE, ...) lives outside the crate and drives it through
//! plain async calls and `tokio::sync::mpsc` channels.
//!
//! ## Quick Start
//!
//! ```rust
//! use proctor_alert::signal::kind;
//! use proctor_alert::{AlertHub, ClientMessage, MemoryAlertStore, Modality, Role, Signal};
//!
//! # async fn example() -> proctor_alert::Result<()> {
//! let hub = AlertHub::new(MemoryAlertStore::new());
//!
//! // A student starts a monitored session after identity verification
//! let session = hub.start_session(7, 42, true).await?;
//!
//! // The student's client connects and follows its own session
//! let (conn, mut events) = hub.connect(42, Role::Student).await;
//! hub.handle_message(
//!     conn.id(),
//!     ClientMessage::SubscribeSession { session_id: session.id },
//! )
//! .await;
//!
//! // One surveillance tick: two faces in frame
//! let signals = [Signal::new(Modality::Face, kind::MULTIPLE_FACES, 0.9, true)];
//! let tick = hub.observe_tick(session.id, &signals).await?;
//! println!("risk {:?}, {} alert(s)", tick.risk, tick.alerts.len());
//!
//! while let Ok(message) = events.try_recv() {
//!     println!("pushed: {:?}", message);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **signal** — normalize opaque detector payloads into `Signal`s
//! - **risk** — trigger table turning one tick's signals into alert
//!   drafts plus a `RiskLevel`
//! - **AlertStore** trait — persistence seam; `MemoryAlertStore` bundled
//! - **SubscriptionRegistry** — connection directory and the
//!   user/exam/session scope maps behind one lock
//! - **Dispatcher** — bounded, concurrent, best-effort fan-out
//! - **AlertHub** — the facade the surrounding server talks to

pub mod dispatch;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod registry;
pub mod risk;
pub mod session;
pub mod signal;
pub mod store;
pub mod types;

// Re-export core types
pub use dispatch::{DeliveryReport, Dispatcher};
pub use error::{AlertError, Result};
pub use hub::{message_stream, AlertHub, HubConfig};
pub use protocol::{AlertPayload, ClientMessage, ServerMessage};
pub use registry::{Connection, ConnectionId, SendOutcome, SubscriptionRegistry};
pub use risk::{assess, assess_with_threshold, AlertDraft, TickAssessment};
pub use session::SessionLedger;
pub use signal::normalize;
pub use store::{AlertStore, MemoryAlertStore};
pub use types::{
    Alert, AlertId, DashboardStats, ExamId, Modality, NewAlert, RiskLevel, Role, Session,
    SessionId, SessionStatus, Severity, Signal, TickReport, UserId, ViolationReport,
};
