//! Agent identity.

use std::borrow::Borrow;
use std::fmt;

/// Unique identifier of an agent in the fleet.
///
/// Wraps the wire-level string id (e.g. `"AUGV_3"`). Ordered and hashable
/// so it can key deterministic maps.
///
/// # Example
///
/// ```
/// use agv_types::AgentId;
///
/// let id = AgentId::new("AUGV_1");
/// assert_eq!(id.as_str(), "AUGV_1");
/// assert_eq!(id.to_string(), "AUGV_1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AgentId(String);

impl AgentId {
    /// Creates an agent id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AgentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_roundtrip() {
        let id = AgentId::new("AUGV_7");
        assert_eq!(id.as_str(), "AUGV_7");
        assert_eq!(AgentId::from("AUGV_7"), id);
        assert_eq!(AgentId::from(String::from("AUGV_7")), id);
    }

    #[test]
    fn test_agent_id_ordering() {
        let mut ids = vec![AgentId::new("b"), AgentId::new("a"), AgentId::new("c")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "a");
        assert_eq!(ids[2].as_str(), "c");
    }
}
