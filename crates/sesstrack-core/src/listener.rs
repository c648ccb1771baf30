//! Listener port for session lifecycle notifications.

use crate::record::SessionRecord;
use crate::tracker::SessionTracker;

/// Receives session lifecycle and state change notifications from a
/// [`SessionTracker`].
///
/// Every callback receives the tracker itself so the listener can react by
/// calling back into it; such reentrant calls are explicitly supported. The
/// tracker's bookkeeping (the per-session untracking flag, registry removal
/// before the final notification) guarantees that a reentrant call observes
/// consistent state and never double-processes a session.
///
/// These callbacks are where the application allocates and releases
/// per-session resources (a database connection, a DI scope, a device
/// handle) deterministically.
pub trait SessionTrackerListener<S, E> {
    /// The tracker has added the session to its tracked set, as a result of
    /// [`track_session`](SessionTracker::track_session) or
    /// [`initialize`](SessionTracker::initialize). The right place to create
    /// per-session resources, depending on `record.state`.
    fn on_session_tracking_started(
        &self,
        tracker: &mut SessionTracker<S, E>,
        record: &SessionRecord<S>,
    );

    /// The session's state has changed from `old_state` to `record.state`,
    /// as a result of [`consume_event`](SessionTracker::consume_event).
    fn on_session_state_changed(
        &self,
        tracker: &mut SessionTracker<S, E>,
        record: &SessionRecord<S>,
        old_state: S,
    );

    /// The tracker has removed the session from its tracked set, as a result
    /// of [`untrack_session`](SessionTracker::untrack_session) or of the
    /// session reaching an auto-untrack state. The right place to release
    /// per-session resources.
    fn on_session_tracking_stopped(
        &self,
        tracker: &mut SessionTracker<S, E>,
        record: &SessionRecord<S>,
    );

    /// The tracker has removed every session from its tracked set, as a
    /// result of [`untrack_all_sessions`](SessionTracker::untrack_all_sessions).
    /// `records` holds the removed sessions in tracking order.
    fn on_all_sessions_tracking_stopped(
        &self,
        tracker: &mut SessionTracker<S, E>,
        records: &[SessionRecord<S>],
    );

    /// [`initialize`](SessionTracker::initialize) has completed. `records`
    /// holds the sessions that ended up tracked, in tracking order.
    fn on_tracker_initialized(
        &self,
        tracker: &mut SessionTracker<S, E>,
        records: &[SessionRecord<S>],
    );
}
