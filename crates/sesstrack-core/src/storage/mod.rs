//! Storage port and the JSON file reference implementation.

mod json_file;

pub use json_file::JsonFileStorage;

use crate::error::StorageError;
use crate::record::{SessionId, SessionRecord};
use crate::tracker::SessionTracker;

/// Synchronous CRUD port for persisted session records.
///
/// The tracker calls these methods from within its own public operations, on
/// whatever thread the application calls the tracker from, and never
/// concurrently. Implementations must perform the write before returning —
/// deferring persistence breaks the tracker's crash-recovery guarantees.
///
/// Every method receives the calling tracker. Implementations have no
/// legitimate use for it: invoking any tracker operation from inside a
/// storage call is misuse, and the tracker rejects it according to its
/// [`Mode`](crate::tracker::Mode) (strict modes return
/// [`SessionTrackerError::CalledFromStorage`](crate::error::SessionTrackerError::CalledFromStorage),
/// relaxed modes log and no-op). The parameter exists because the rejection
/// must be observable and testable, not silently ruled out.
///
/// Errors are never retried by the tracker; they propagate to the caller of
/// the triggering operation.
pub trait SessionTrackerStorage<S, E> {
    /// Reads every persisted session record, in persisted order. An empty
    /// store reads as an empty list.
    ///
    /// Called once, from within
    /// [`SessionTracker::initialize`](crate::tracker::SessionTracker::initialize).
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the store cannot be read or decoded.
    fn read_all_records(
        &self,
        tracker: &mut SessionTracker<S, E>,
    ) -> Result<Vec<SessionRecord<S>>, StorageError>;

    /// Persists a record for a newly tracked session.
    ///
    /// Called from within
    /// [`SessionTracker::track_session`](crate::tracker::SessionTracker::track_session).
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the record cannot be persisted.
    fn create_record(
        &self,
        tracker: &mut SessionTracker<S, E>,
        record: &SessionRecord<S>,
    ) -> Result<(), StorageError>;

    /// Persists a session's new state.
    ///
    /// Called from within
    /// [`SessionTracker::consume_event`](crate::tracker::SessionTracker::consume_event).
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the record cannot be persisted.
    fn update_record(
        &self,
        tracker: &mut SessionTracker<S, E>,
        record: &SessionRecord<S>,
    ) -> Result<(), StorageError>;

    /// Deletes the record of an untracked session.
    ///
    /// Called from within
    /// [`SessionTracker::untrack_session`](crate::tracker::SessionTracker::untrack_session)
    /// and on auto-untrack from within
    /// [`SessionTracker::consume_event`](crate::tracker::SessionTracker::consume_event).
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the record cannot be deleted.
    fn delete_record(
        &self,
        tracker: &mut SessionTracker<S, E>,
        session_id: &SessionId,
    ) -> Result<(), StorageError>;

    /// Deletes every persisted session record.
    ///
    /// Called from within
    /// [`SessionTracker::untrack_all_sessions`](crate::tracker::SessionTracker::untrack_all_sessions).
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the records cannot be deleted.
    fn delete_all_records(&self, tracker: &mut SessionTracker<S, E>) -> Result<(), StorageError>;
}
