//! TCP ingestion of route and obstacle messages.
//!
//! One JSON message per connection, UTF-8 encoded. Two shapes are
//! understood:
//!
//! - A bare object mapping agent id → list of target names is a route
//!   request:
//!   `{"AUGV_1": ["Warehouse_1", "Warehouse_7"], "AUGV_2": [...]}`
//! - An envelope with an `action` field carries everything else:
//!   `{"action": "obstacle", "data": {"agent_id": "AUGV_1",
//!   "blocked_offsets": [[0, 2]]}}`, plus `{"action": "stop"}` and
//!   `{"action": "resume"}`
//!
//! Parsing happens on the listener task; the decoded message is forwarded
//! through the inbox, and malformed input is logged and dropped without
//! touching supervisor state.

use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::error::IngestError;
use crate::inbox::{InboundMessage, InboxSender, ObstacleReport, RouteRequest};

/// Decodes one wire message.
///
/// # Errors
///
/// Returns [`IngestError::Malformed`] for invalid JSON or schema
/// mismatches, [`IngestError::UnknownAction`] for an unrecognised
/// envelope action, and [`IngestError::UnrecognisedShape`] for JSON that
/// is neither a route map nor an envelope.
pub fn parse_message(raw: &[u8]) -> Result<InboundMessage, IngestError> {
    let value: Value = serde_json::from_slice(raw)?;
    let Value::Object(object) = &value else {
        return Err(IngestError::UnrecognisedShape);
    };

    if let Some(action) = object.get("action") {
        let action = action.as_str().unwrap_or_default();
        return match action {
            "obstacle" => {
                let data = object.get("data").cloned().unwrap_or(Value::Null);
                let report: ObstacleReport = serde_json::from_value(data)?;
                Ok(InboundMessage::Obstacles(report))
            }
            "stop" => Ok(InboundMessage::StopAll),
            "resume" => Ok(InboundMessage::Resume),
            other => Err(IngestError::UnknownAction(other.to_string())),
        };
    }

    // No envelope: a bare object is a route request. Obstacle reports may
    // also arrive unwrapped.
    if object.contains_key("agent_id") {
        let report: ObstacleReport = serde_json::from_value(value)?;
        return Ok(InboundMessage::Obstacles(report));
    }
    let routes: RouteRequest = serde_json::from_value(value)?;
    Ok(InboundMessage::Routes(routes))
}

/// Reads the single message of one connection and forwards it.
async fn handle_connection(mut stream: TcpStream, sender: InboxSender) {
    let mut raw = Vec::new();
    if let Err(err) = stream.read_to_end(&mut raw).await {
        error!(%err, "failed to read ingestion connection");
        return;
    }
    match parse_message(&raw) {
        Ok(message) => {
            debug!(?message, "ingested message");
            sender.send(message);
        }
        Err(err) => error!(%err, "dropping malformed ingestion message"),
    }
}

/// Accept loop: one message per connection, forwarded to the inbox.
///
/// Runs until the listener fails or the process shuts down.
///
/// # Errors
///
/// Returns [`IngestError::Io`] if accepting a connection fails.
pub async fn serve(listener: TcpListener, sender: InboxSender) -> Result<(), IngestError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "route ingestion listening");
    }
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "ingestion connection accepted");
        let sender = sender.clone();
        tokio::spawn(handle_connection(stream, sender));
    }
}
