//! Thread-safe inboxes between async ingestion and the tick driver.
//!
//! External inputs (route requests, obstacle reports, control commands)
//! arrive on listener tasks and are queued here; the single-threaded tick
//! driver drains the inbox at the start of each tick. No other mutable
//! state crosses the async boundary.

use std::collections::BTreeMap;

use serde::Deserialize;
use tokio::sync::mpsc;

/// A route request: agent id → ordered target names.
///
/// This is exactly the shape route clients put on the wire.
pub type RouteRequest = BTreeMap<String, Vec<String>>;

/// A dynamic-obstacle report from one vehicle.
///
/// Offsets are `(right, forward)` cells in the reporter's local frame.
/// The wire field is `blocked`, with `blocked_offsets` accepted for
/// compatibility with the vision pipeline's envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObstacleReport {
    /// Reporting agent id.
    pub agent_id: String,
    /// Blocked cell offsets in the reporter's local frame.
    #[serde(alias = "blocked_offsets")]
    pub blocked: Vec<(i32, i32)>,
}

/// A message delivered to the supervisor between ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Append waypoints to agents' queues.
    Routes(RouteRequest),
    /// Mark dynamically detected obstacles.
    Obstacles(ObstacleReport),
    /// Stop every agent.
    StopAll,
    /// Resume after a stop.
    Resume,
}

/// Sending half handed to listener tasks.
#[derive(Debug, Clone)]
pub struct InboxSender {
    tx: mpsc::UnboundedSender<InboundMessage>,
}

impl InboxSender {
    /// Queues a message for the next tick. Returns `false` if the inbox
    /// has been dropped.
    pub fn send(&self, message: InboundMessage) -> bool {
        self.tx.send(message).is_ok()
    }
}

/// Receiving half owned by the tick driver.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<InboundMessage>,
}

impl Inbox {
    /// Drains every queued message without blocking.
    pub fn drain(&mut self) -> Vec<InboundMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }
}

/// Creates a connected sender/inbox pair.
#[must_use]
pub fn inbox_channel() -> (InboxSender, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InboxSender { tx }, Inbox { rx })
}
