//! Error types for the supervisor and its ingestion boundary.

use agv_types::AgentId;

/// Errors from supervisor state management.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SupervisorError {
    /// An agent with this id is already registered.
    #[error("agent {0} is already registered")]
    DuplicateAgent(AgentId),

    /// The referenced agent is not registered.
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),
}

/// Errors from the network ingestion boundary.
///
/// Malformed messages are logged and dropped; they never affect committed
/// plans.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum IngestError {
    /// The connection could not be read.
    #[error("socket read failed: {0}")]
    Io(#[from] std::io::Error),

    /// The message is not valid JSON or fails the schema check.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The message envelope names an action this receiver does not know.
    #[error("unknown action {0:?}")]
    UnknownAction(String),

    /// The message is structurally valid JSON but not a known shape.
    #[error("unrecognised message shape")]
    UnrecognisedShape,
}
