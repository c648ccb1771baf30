//! The session registry: tracks session lifecycles, drives per-session state
//! machines and keeps storage and listeners in lock-step.
//!
//! # Contract
//!
//! The application provides a storage implementation, a transition supplier
//! and a listener; the tracker owns the table of tracked sessions and drives
//! each session's state machine in response to
//! [`consume_event`](SessionTracker::consume_event) calls. Every state
//! transition is persisted synchronously, and the listener is notified around
//! every lifecycle change so the application can allocate and release
//! per-session resources deterministically.
//!
//! Sessions reaching one of the configured auto-untrack states are untracked
//! automatically, with the same storage and listener effects as an explicit
//! [`untrack_session`](SessionTracker::untrack_session) call — including
//! mid-transition: a multi-hop state path stops at the auto-untrack state and
//! the remaining hops never execute.
//!
//! # Ordering guarantees
//!
//! For every state change, the storage write (update or delete) happens
//! before the corresponding listener notification. The one exception is the
//! auto-untrack path, where
//! [`on_session_state_changed`](crate::listener::SessionTrackerListener::on_session_state_changed)
//! fires before the delete-then-
//! [`on_session_tracking_stopped`](crate::listener::SessionTrackerListener::on_session_tracking_stopped)
//! cleanup pair, whose own ordering still holds.
//!
//! # Threading
//!
//! The tracker is a synchronous library: it creates no threads, tasks or
//! timers, and every operation completes before returning. Exclusivity is
//! expressed through `&mut self` — two operations can never interleave, and a
//! caller wanting a compound atomic sequence simply keeps its exclusive
//! borrow across both calls. The tracker is single-threaded (its ports are
//! reference-counted handles); an application using it from several threads
//! owns it on one thread behind a lock of its choosing.
//!
//! # Reentrancy
//!
//! Listener callbacks receive the tracker and may call back into it; this is
//! supported and exercised (for example a listener reacting to a state change
//! by untracking the session). The single disallowed reentrant actor is the
//! storage port: while a storage call is in flight, every public operation is
//! rejected according to the [`Mode`].


use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::error::{ConfigError, SessionTrackerError, StorageError};
use crate::listener::SessionTrackerListener;
use crate::machine::{StateHop, StateMachine};
use crate::record::{SessionId, SessionRecord};
use crate::storage::SessionTrackerStorage;
use crate::supplier::TransitionSupplier;

/// Misuse tolerance and logging volume, two independent axes.
///
/// *Strict* modes return an error on misuse (use before
/// [`initialize`](SessionTracker::initialize), reentrant calls from storage,
/// tracking into an auto-untrack state, state machine misconfiguration);
/// *relaxed* modes log the condition at error level and turn the operation
/// into a no-op with a neutral result. *Verbose* modes add debug logging of
/// operation entry and notable internal decisions (skipped sessions, ignored
/// events).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Misuse returns an error; normal logging volume.
    Strict,
    /// Same as [`Strict`](Self::Strict), with extra diagnostic logging.
    StrictVerbose,
    /// Misuse is logged and the operation no-ops; normal logging volume.
    Relaxed,
    /// Same as [`Relaxed`](Self::Relaxed), with extra diagnostic logging.
    RelaxedVerbose,
}

impl Mode {
    /// Returns whether misuse returns an error rather than no-opping.
    #[must_use]
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Strict | Self::StrictVerbose)
    }

    /// Returns whether extra diagnostic logging is enabled.
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::StrictVerbose | Self::RelaxedVerbose)
    }
}

/// One tracked session: its id, its state machine and whether it is in the
/// process of being removed.
struct SessionEntry<S, E> {
    id: SessionId,
    machine: StateMachine<S, E>,
    untracking: bool,
}

impl<S, E> SessionEntry<S, E>
where
    S: Copy + PartialEq + fmt::Debug,
    E: PartialEq + fmt::Debug,
{
    fn record(&self) -> SessionRecord<S> {
        SessionRecord::new(self.id.clone(), self.machine.current_state())
    }
}

/// The session registry.
///
/// See the [module documentation](self) for the contract. Construct with
/// [`new`](Self::new), call [`initialize`](Self::initialize) once, then drive
/// sessions with [`track_session`](Self::track_session),
/// [`consume_event`](Self::consume_event),
/// [`untrack_session`](Self::untrack_session) and
/// [`untrack_all_sessions`](Self::untrack_all_sessions).
pub struct SessionTracker<S, E> {
    storage: Rc<dyn SessionTrackerStorage<S, E>>,
    supplier: Rc<dyn TransitionSupplier<S, E>>,
    listener: Rc<dyn SessionTrackerListener<S, E>>,
    auto_untrack_states: HashSet<S>,
    mode: Mode,
    initialized: bool,
    /// True strictly for the duration of a single storage call: the
    /// reentrancy guard.
    persisting: bool,
    /// Tracked sessions in tracking order.
    sessions: Vec<SessionEntry<S, E>>,
}

impl<S, E> fmt::Debug for SessionTracker<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTracker")
            .field("mode", &self.mode)
            .field("initialized", &self.initialized)
            .field("persisting", &self.persisting)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl<S, E> SessionTracker<S, E>
where
    S: Copy + Eq + Hash + fmt::Debug + 'static,
    E: PartialEq + fmt::Debug + 'static,
{
    /// Creates an uninitialized tracker.
    ///
    /// Sessions landing in one of `auto_untrack_states` are untracked
    /// automatically; an empty set disables auto-untracking.
    #[must_use]
    pub fn new(
        storage: Rc<dyn SessionTrackerStorage<S, E>>,
        supplier: Rc<dyn TransitionSupplier<S, E>>,
        listener: Rc<dyn SessionTrackerListener<S, E>>,
        auto_untrack_states: HashSet<S>,
        mode: Mode,
    ) -> Self {
        Self {
            storage,
            supplier,
            listener,
            auto_untrack_states,
            mode,
            initialized: false,
            persisting: false,
            sessions: Vec::new(),
        }
    }

    /// Returns the tracker's mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns whether [`initialize`](Self::initialize) has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Loads the persisted sessions and starts tracking them.
    ///
    /// Must be called before any other operation; repeat calls are ignored
    /// with a warning and perform no I/O. Loaded records whose state is in
    /// the auto-untrack set, and records whose state machine cannot be
    /// configured, are rejected: strict modes return the error, relaxed
    /// modes log and skip the session. Each surviving session is added to
    /// the tracked set and announced through
    /// [`on_session_tracking_started`](SessionTrackerListener::on_session_tracking_started);
    /// the tracker becomes initialized only after every record is processed,
    /// and then emits
    /// [`on_tracker_initialized`](SessionTrackerListener::on_tracker_initialized)
    /// with the surviving set.
    ///
    /// # Errors
    ///
    /// In strict modes: [`SessionTrackerError::CalledFromStorage`] when
    /// invoked from a storage callback,
    /// [`SessionTrackerError::AutoUntrackState`] for a loaded session already
    /// in an auto-untrack state, [`SessionTrackerError::Config`] for a state
    /// machine misconfiguration. In every mode:
    /// [`SessionTrackerError::Storage`] when reading the store fails.
    pub fn initialize(&mut self) -> Result<(), SessionTrackerError> {
        if self.initialized {
            warn!("initialize: already initialized, skipping");
            return Ok(());
        }
        if self.persisting {
            let err = SessionTrackerError::CalledFromStorage {
                method: "initialize",
            };
            if self.mode.is_strict() {
                return Err(err);
            }
            error!("{err}");
            return Ok(());
        }
        if self.mode.is_verbose() {
            debug!("initialize: starting");
        }

        let loaded = self.persist(|storage, tracker| storage.read_all_records(tracker))?;

        let mut accepted = Vec::with_capacity(loaded.len());
        for record in loaded {
            if self.auto_untrack_states.contains(&record.state) {
                let err = SessionTrackerError::AutoUntrackState {
                    session_id: record.session_id.to_string(),
                    state: format!("{:?}", record.state),
                };
                if self.mode.is_strict() {
                    return Err(err);
                }
                error!("initialize: {err}, rejecting this session");
                continue;
            }
            accepted.push(record);
        }

        for record in accepted {
            if self.entry_index(&record.session_id).is_some() {
                warn!(
                    "initialize: duplicate record for session '{}' in storage, skipping",
                    record.session_id
                );
                continue;
            }
            let machine = match self.setup_state_machine(&record.session_id, record.state) {
                Ok(machine) => machine,
                Err(err) => {
                    let err = SessionTrackerError::from(err);
                    if self.mode.is_strict() {
                        return Err(err);
                    }
                    error!(
                        "initialize: cannot configure state machine for session '{}': {err}, \
                         skipping",
                        record.session_id
                    );
                    continue;
                }
            };
            self.sessions.push(SessionEntry {
                id: record.session_id.clone(),
                machine,
                untracking: false,
            });
            let listener = Rc::clone(&self.listener);
            listener.on_session_tracking_started(self, &record);
        }

        self.initialized = true;

        let records: Vec<_> = self.sessions.iter().map(SessionEntry::record).collect();
        let listener = Rc::clone(&self.listener);
        listener.on_tracker_initialized(self, &records);

        if self.mode.is_verbose() {
            debug!("initialize: done, tracking {} sessions", self.sessions.len());
        }
        Ok(())
    }

    /// Starts tracking a session in the given initial state.
    ///
    /// An already-tracked id is ignored with a warning. An initial state in
    /// the auto-untrack set is rejected per mode, as is a state machine
    /// misconfiguration. Otherwise the record is persisted (storage
    /// `create`), the session is added to the tracked set, and
    /// [`on_session_tracking_started`](SessionTrackerListener::on_session_tracking_started)
    /// fires — in that order.
    ///
    /// # Errors
    ///
    /// In strict modes: the misuse errors ([`SessionTrackerError::NotInitialized`],
    /// [`SessionTrackerError::CalledFromStorage`]),
    /// [`SessionTrackerError::AutoUntrackState`] and
    /// [`SessionTrackerError::Config`]. In every mode:
    /// [`SessionTrackerError::Storage`] when persisting fails.
    pub fn track_session(
        &mut self,
        session_id: SessionId,
        state: S,
    ) -> Result<(), SessionTrackerError> {
        if !self.enter_op("track_session")? {
            return Ok(());
        }
        if self.mode.is_verbose() {
            debug!("track_session: session_id = '{session_id}', state = {state:?}");
        }
        if self.entry_index(&session_id).is_some() {
            warn!("track_session: session with id '{session_id}' already exists");
            return Ok(());
        }
        if self.auto_untrack_states.contains(&state) {
            let err = SessionTrackerError::AutoUntrackState {
                session_id: session_id.to_string(),
                state: format!("{state:?}"),
            };
            if self.mode.is_strict() {
                return Err(err);
            }
            error!("track_session: {err}, rejecting this session");
            return Ok(());
        }
        let machine = match self.setup_state_machine(&session_id, state) {
            Ok(machine) => machine,
            Err(err) => {
                let err = SessionTrackerError::from(err);
                if self.mode.is_strict() {
                    return Err(err);
                }
                error!(
                    "track_session: cannot configure state machine for session '{session_id}': \
                     {err}, rejecting this session"
                );
                return Ok(());
            }
        };

        let record = SessionRecord::new(session_id.clone(), state);
        self.persist(|storage, tracker| storage.create_record(tracker, &record))?;
        self.sessions.push(SessionEntry {
            id: session_id,
            machine,
            untracking: false,
        });
        let listener = Rc::clone(&self.listener);
        listener.on_session_tracking_started(self, &record);
        Ok(())
    }

    /// Stops tracking the session with the given id.
    ///
    /// An unknown id, or a session already mid-untracking, is ignored with a
    /// log line. Otherwise the session's listeners are detached, its record
    /// is deleted from storage, the session is removed from the tracked set,
    /// and
    /// [`on_session_tracking_stopped`](SessionTrackerListener::on_session_tracking_stopped)
    /// fires with the record at the state the machine was in — in that
    /// order. The session's state is not modified.
    ///
    /// # Errors
    ///
    /// In strict modes: the misuse errors. In every mode:
    /// [`SessionTrackerError::Storage`] when deleting fails.
    pub fn untrack_session(&mut self, session_id: &SessionId) -> Result<(), SessionTrackerError> {
        if !self.enter_op("untrack_session")? {
            return Ok(());
        }
        if self.mode.is_verbose() {
            debug!("untrack_session: session_id = '{session_id}'");
        }
        match self.entry_index(session_id) {
            None => {
                debug!("untrack_session: no session with id '{session_id}' found");
                Ok(())
            }
            Some(index) if self.sessions[index].untracking => {
                warn!("untrack_session: session with id '{session_id}' is already untracking");
                Ok(())
            }
            Some(index) => {
                self.sessions[index].untracking = true;
                self.finish_untracking(session_id)
            }
        }
    }

    /// Stops tracking every session at once.
    ///
    /// An empty tracked set is a no-op. Otherwise: one storage `delete_all`,
    /// then every machine's listeners are detached, the current records are
    /// snapshotted in tracking order, the tracked set is cleared, and
    /// [`on_all_sessions_tracking_stopped`](SessionTrackerListener::on_all_sessions_tracking_stopped)
    /// fires with the snapshot. This is a distinct bulk path; the
    /// per-session untrack routine (and its per-session notifications) is
    /// not involved.
    ///
    /// # Errors
    ///
    /// In strict modes: the misuse errors. In every mode:
    /// [`SessionTrackerError::Storage`] when deleting fails.
    pub fn untrack_all_sessions(&mut self) -> Result<(), SessionTrackerError> {
        if !self.enter_op("untrack_all_sessions")? {
            return Ok(());
        }
        if self.sessions.is_empty() {
            if self.mode.is_verbose() {
                debug!("untrack_all_sessions: no sessions found");
            }
            return Ok(());
        }
        if self.mode.is_verbose() {
            debug!(
                "untrack_all_sessions: untracking {} sessions",
                self.sessions.len()
            );
        }

        self.persist(|storage, tracker| storage.delete_all_records(tracker))?;

        for entry in &mut self.sessions {
            entry.machine.remove_all_listeners();
        }
        let records: Vec<_> = self.sessions.iter().map(SessionEntry::record).collect();
        self.sessions.clear();

        let listener = Rc::clone(&self.listener);
        listener.on_all_sessions_tracking_stopped(self, &records);
        Ok(())
    }

    /// Applies an event to a session's state machine.
    ///
    /// Returns whether the event caused a state change; an event with no
    /// transition matching the session's current state is ignored and causes
    /// no storage or listener activity. An unknown id, or a session already
    /// mid-untracking, is ignored with a warning and returns `false`.
    ///
    /// All side effects of the change — persistence, the
    /// [`on_session_state_changed`](SessionTrackerListener::on_session_state_changed)
    /// notification, and possibly auto-untracking — happen before this call
    /// returns, once per hop of the matched transition's state path.
    ///
    /// # Errors
    ///
    /// In strict modes: the misuse errors. In every mode:
    /// [`SessionTrackerError::Storage`] when persisting a hop fails, and the
    /// internal-consistency errors should the state machine report a change
    /// for a session the tracker no longer holds.
    pub fn consume_event(
        &mut self,
        session_id: &SessionId,
        event: E,
    ) -> Result<bool, SessionTrackerError> {
        if !self.enter_op("consume_event")? {
            return Ok(false);
        }
        if self.mode.is_verbose() {
            debug!("consume_event: session_id = '{session_id}', event = {event:?}");
        }

        let Some(index) = self.entry_index(session_id) else {
            warn!("consume_event: no session with id '{session_id}' found");
            return Ok(false);
        };
        {
            let entry = &mut self.sessions[index];
            if entry.untracking {
                warn!(
                    "consume_event: event {event:?} ignored, session with id '{session_id}' is \
                     already untracking"
                );
                return Ok(false);
            }
            if !entry.machine.apply_event(&event) {
                if self.mode.is_verbose() {
                    debug!(
                        "consume_event: event {event:?} was ignored for session with id \
                         '{session_id}' in state {:?}",
                        entry.machine.current_state()
                    );
                }
                return Ok(false);
            }
        }

        // Drive the staged hops one at a time, re-resolving the entry each
        // round: handling a hop can untrack the session (detaching its
        // listeners, which drops the remaining hops) or remove it outright
        // via a reentrant listener call.
        loop {
            let hop = match self.entry_index(session_id) {
                Some(index) => self.sessions[index].machine.next_hop(),
                None => None,
            };
            match hop {
                Some(hop) => self.handle_state_change(session_id, hop)?,
                None => break,
            }
        }
        Ok(true)
    }

    /// Returns a snapshot of the tracked sessions, in tracking order.
    ///
    /// # Errors
    ///
    /// In strict modes: the misuse errors. Relaxed modes return an empty
    /// list on misuse.
    pub fn session_records(&self) -> Result<Vec<SessionRecord<S>>, SessionTrackerError> {
        if !self.enter_op("session_records")? {
            return Ok(Vec::new());
        }
        let records: Vec<_> = self.sessions.iter().map(SessionEntry::record).collect();
        if self.mode.is_verbose() {
            debug!("session_records: {records:?}");
        }
        Ok(records)
    }

    /// Handles one state hop reported by a session's state machine: persists
    /// the change, notifies the listener, and auto-untracks the session if
    /// the new state calls for it.
    fn handle_state_change(
        &mut self,
        session_id: &SessionId,
        hop: StateHop<S>,
    ) -> Result<(), SessionTrackerError> {
        let Some(index) = self.entry_index(session_id) else {
            // A hop for a session the tracker does not hold means the
            // machine and the table disagree; not a misuse the mode policy
            // covers.
            return Err(SessionTrackerError::UnknownSessionNotified {
                session_id: session_id.to_string(),
            });
        };
        if self.sessions[index].untracking {
            return Err(SessionTrackerError::UntrackingSessionNotified {
                session_id: session_id.to_string(),
            });
        }
        if self.mode.is_verbose() {
            debug!(
                "state change: {:?} -> {:?}, session_id = '{session_id}'",
                hop.from, hop.to
            );
        }

        let record = SessionRecord::new(session_id.clone(), hop.to);
        if self.auto_untrack_states.contains(&hop.to) {
            debug!(
                "state change: {:?} -> {:?}, session_id = '{session_id}', auto-untracking session",
                hop.from, hop.to
            );
            // Flag first, then detach: a reentrant call from the listener
            // notification below must see the session as already being
            // removed, and the machine must execute no further hops.
            self.sessions[index].untracking = true;
            self.sessions[index].machine.remove_all_listeners();
            let listener = Rc::clone(&self.listener);
            listener.on_session_state_changed(self, &record, hop.from);
            // The listener may have removed the session itself, through a
            // reentrant untrack call; only clean up what is still there.
            if self.entry_index(session_id).is_some() {
                self.finish_untracking(session_id)?;
            }
        } else {
            self.persist(|storage, tracker| storage.update_record(tracker, &record))?;
            let listener = Rc::clone(&self.listener);
            listener.on_session_state_changed(self, &record, hop.from);
        }
        Ok(())
    }

    /// The shared untrack routine, used by [`untrack_session`](Self::untrack_session)
    /// and by auto-untrack cleanup: detach listeners, delete the record,
    /// remove the entry, notify. The entry's `untracking` flag is already
    /// set by the caller.
    fn finish_untracking(&mut self, session_id: &SessionId) -> Result<(), SessionTrackerError> {
        let Some(index) = self.entry_index(session_id) else {
            return Ok(());
        };
        self.sessions[index].machine.remove_all_listeners();
        self.persist(|storage, tracker| storage.delete_record(tracker, session_id))?;
        let entry = self.sessions.remove(index);
        let record = SessionRecord::new(entry.id, entry.machine.current_state());
        let listener = Rc::clone(&self.listener);
        listener.on_session_tracking_stopped(self, &record);
        Ok(())
    }

    /// Builds a session's state machine from the supplier's transitions and
    /// registers the tracker as its one change listener.
    fn setup_state_machine(
        &self,
        session_id: &SessionId,
        state: S,
    ) -> Result<StateMachine<S, E>, ConfigError> {
        let transitions = self.supplier.state_transitions(session_id);
        let mut machine = StateMachine::new(state, transitions)?;
        machine.add_listener();
        Ok(machine)
    }

    /// The uniform precondition guard wrapping every public operation:
    /// initialized, and no storage call in flight. Returns `Ok(true)` to
    /// proceed, `Ok(false)` for a relaxed-mode no-op, or the misuse error in
    /// strict modes.
    fn enter_op(&self, method: &'static str) -> Result<bool, SessionTrackerError> {
        if !self.initialized {
            return self.reject_misuse(SessionTrackerError::NotInitialized { method });
        }
        if self.persisting {
            return self.reject_misuse(SessionTrackerError::CalledFromStorage { method });
        }
        Ok(true)
    }

    fn reject_misuse(&self, err: SessionTrackerError) -> Result<bool, SessionTrackerError> {
        if self.mode.is_strict() {
            return Err(err);
        }
        error!("{err}");
        Ok(false)
    }

    /// Runs one storage call with the reentrancy guard held for exactly its
    /// duration.
    fn persist<T>(
        &mut self,
        op: impl FnOnce(&dyn SessionTrackerStorage<S, E>, &mut Self) -> Result<T, StorageError>,
    ) -> Result<T, SessionTrackerError> {
        let storage = Rc::clone(&self.storage);
        self.persisting = true;
        let result = op(storage.as_ref(), self);
        self.persisting = false;
        result.map_err(SessionTrackerError::from)
    }

    fn entry_index(&self, session_id: &SessionId) -> Option<usize> {
        self.sessions.iter().position(|entry| &entry.id == session_id)
    }
}
