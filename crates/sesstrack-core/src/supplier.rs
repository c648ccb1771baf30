//! Transition supplier port.

use crate::record::SessionId;
use crate::transition::Transition;

/// Supplies the transition set for a session's state machine.
///
/// Called once per session while the tracker sets up the session's state
/// machine, i.e. from within
/// [`SessionTracker::initialize`](crate::tracker::SessionTracker::initialize)
/// and [`SessionTracker::track_session`](crate::tracker::SessionTracker::track_session).
///
/// Validation of the returned set happens at state machine construction: an
/// empty set, a duplicate `(event, start_state)` identity, or a malformed
/// state path all fail the session's setup (see
/// [`StateMachine::new`](crate::machine::StateMachine::new) and
/// [`Transition::new`]).
pub trait TransitionSupplier<S, E> {
    /// Returns the transitions applicable to the given session.
    fn state_transitions(&self, session_id: &SessionId) -> Vec<Transition<S, E>>;
}

/// Any `Fn(&SessionId) -> Vec<Transition>` closure is a supplier, which keeps
/// fixed transition tables terse:
///
/// ```
/// use sesstrack_core::{SessionId, Transition, TransitionSupplier};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum State {
///     Inactive,
///     Active,
/// }
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Event {
///     Login,
/// }
///
/// let supplier = |_: &SessionId| {
///     vec![Transition::new(Event::Login, vec![State::Inactive, State::Active]).unwrap()]
/// };
/// let id = SessionId::new("session-1").unwrap();
/// assert_eq!(supplier.state_transitions(&id).len(), 1);
/// ```
impl<S, E, F> TransitionSupplier<S, E> for F
where
    F: Fn(&SessionId) -> Vec<Transition<S, E>>,
{
    fn state_transitions(&self, session_id: &SessionId) -> Vec<Transition<S, E>> {
        self(session_id)
    }
}
