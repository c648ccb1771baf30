//! Error types for the session tracker.

use thiserror::Error;

/// Structural configuration errors.
///
/// These indicate a defect in the application's static configuration
/// (session ids, transition shapes, transition sets) rather than bad
/// run-time data, and are therefore independent of the tracker's
/// [`Mode`](crate::tracker::Mode): constructing an invalid value fails
/// eagerly, at the point of construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A session id was constructed from an empty string.
    #[error("session id must not be empty")]
    EmptySessionId,

    /// A session id was constructed from an all-whitespace string.
    #[error("session id must not be blank")]
    BlankSessionId,

    /// A transition state path holds fewer than two states.
    #[error("transition state path must contain at least 2 states, got {len}")]
    StatePathTooShort {
        /// The number of states in the rejected path.
        len: usize,
    },

    /// A transition state path holds the same state twice in a row.
    #[error("transition state path holds state {state} twice in a row at position {position}")]
    RepeatedPathState {
        /// Debug rendering of the repeated state.
        state: String,
        /// Zero-based position of the first of the two equal states.
        position: usize,
    },

    /// A state machine was configured with an empty transition set.
    #[error("state machine requires at least one transition")]
    NoTransitions,

    /// Two transitions share the same identity (event plus starting state).
    #[error("duplicate transition identity: event {event} from state {state}")]
    DuplicateTransition {
        /// Debug rendering of the duplicated event.
        event: String,
        /// Debug rendering of the duplicated starting state.
        state: String,
    },
}

/// Errors surfaced by [`SessionTrackerStorage`](crate::storage::SessionTrackerStorage)
/// implementations.
///
/// Storage failures are never retried by the tracker; they propagate to the
/// caller of the public operation that triggered the storage call.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing store failed.
    #[error("storage I/O error")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding the persisted session records failed.
    #[error("failed to encode or decode persisted session records")]
    Codec(#[from] serde_json::Error),

    /// A persisted state ordinal does not map to any known state.
    #[error("persisted state ordinal {ordinal} is out of range for {known} known states")]
    UnknownStateOrdinal {
        /// The out-of-range ordinal read from storage.
        ordinal: usize,
        /// The number of states in the ordinal table.
        known: usize,
    },

    /// A state has no entry in the storage ordinal table.
    #[error("state {state} is missing from the storage ordinal table")]
    UnmappedState {
        /// Debug rendering of the unmapped state.
        state: String,
    },

    /// A persisted session id fails [`SessionId`](crate::record::SessionId)
    /// validation.
    #[error("invalid persisted session id")]
    InvalidSessionId(#[source] ConfigError),

    /// Catch-all for third-party storage backends.
    #[error("storage backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Wraps an arbitrary backend error.
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

/// Errors returned by [`SessionTracker`](crate::tracker::SessionTracker)
/// operations.
///
/// The misuse variants ([`NotInitialized`](Self::NotInitialized),
/// [`CalledFromStorage`](Self::CalledFromStorage)) and
/// [`AutoUntrackState`](Self::AutoUntrackState) are only *returned* in strict
/// modes; relaxed modes log them at error level and turn the operation into a
/// no-op. The internal-consistency variants
/// ([`UnknownSessionNotified`](Self::UnknownSessionNotified),
/// [`UntrackingSessionNotified`](Self::UntrackingSessionNotified)) signal a
/// defect in the tracker/state-machine interaction and are returned in every
/// mode.
#[derive(Debug, Error)]
pub enum SessionTrackerError {
    /// Structural configuration defect.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A public operation was invoked before `initialize`.
    #[error("the tracker must be initialized before calling `{method}`")]
    NotInitialized {
        /// The public operation that was invoked.
        method: &'static str,
    },

    /// A public operation was invoked while a storage call was in flight.
    #[error("`{method}`: misuse detected, calling the tracker from storage callbacks is not allowed")]
    CalledFromStorage {
        /// The public operation that was invoked.
        method: &'static str,
    },

    /// A session was found in, or tracked directly into, an auto-untrack state.
    #[error("session '{session_id}' is in auto-untrack state {state}")]
    AutoUntrackState {
        /// The offending session id.
        session_id: String,
        /// Debug rendering of the auto-untrack state.
        state: String,
    },

    /// A state change was reported for a session the tracker does not hold.
    #[error("state change reported for unknown session '{session_id}'")]
    UnknownSessionNotified {
        /// The session id the change was reported for.
        session_id: String,
    },

    /// A state change was reported for a session that is mid-untracking.
    #[error("state change reported for session '{session_id}' that is already untracking")]
    UntrackingSessionNotified {
        /// The session id the change was reported for.
        session_id: String,
    },

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
