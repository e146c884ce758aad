//! Correlation types for comparison sessions
//!
//! Every comparator instance owns one analysis session. The session id is
//! attached to log events and errors so that the diagnostics of one
//! contract pair can be told apart when many comparisons run side by side.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single compatibility analysis session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random SessionId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context describing which pair of layouts a session is comparing
#[derive(Debug, Clone)]
pub struct ComparisonContext {
    pub session_id: SessionId,
    /// Free-form name of the unit being upgraded, e.g. a contract name
    pub subject: Option<String>,
}

impl ComparisonContext {
    /// Create a new context with a fresh SessionId
    pub fn new() -> Self {
        Self {
            session_id: SessionId::new(),
            subject: None,
        }
    }

    /// Create a context with an existing SessionId
    pub fn with_session_id(session_id: SessionId) -> Self {
        Self {
            session_id,
            subject: None,
        }
    }

    /// Attach the name of the unit being compared
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

impl Default for ComparisonContext {
    fn default() -> Self {
        Self::new()
    }
}
