//! Session identity and point-in-time session snapshots.

use std::fmt;

use crate::error::ConfigError;

/// Opaque identifier of a tracked session.
///
/// The value is immutable once constructed and compared by value. Validation
/// happens eagerly at construction: the id must be non-empty and must not
/// consist of whitespace only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session id from the given value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptySessionId`] for an empty value and
    /// [`ConfigError::BlankSessionId`] for an all-whitespace value.
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ConfigError::EmptySessionId);
        }
        if value.trim().is_empty() {
            return Err(ConfigError::BlankSessionId);
        }
        Ok(Self(value))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Immutable snapshot of one tracked session: its id and its state at a
/// particular point in time.
///
/// The tracker produces a fresh record whenever it hands a point-in-time view
/// to the storage or listener ports; records are never mutated, only
/// superseded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord<S> {
    /// The session's id.
    pub session_id: SessionId,
    /// The session's state at the time the snapshot was taken.
    pub state: S,
}

impl<S> SessionRecord<S> {
    /// Creates a record from an id and a state.
    #[must_use]
    pub fn new(session_id: SessionId, state: S) -> Self {
        Self { session_id, state }
    }
}
