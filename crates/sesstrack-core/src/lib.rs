//! Session lifecycle tracking with per-session state machines and
//! synchronous persistence.
//!
//! The crate centers on [`SessionTracker`], a registry of sessions whose
//! lifecycles are driven by application events. The application supplies
//! three ports: a [`SessionTrackerStorage`] that persists the tracked set, a
//! [`TransitionSupplier`] that describes each session's event-driven state
//! graph, and a [`SessionTrackerListener`] that is notified around every
//! lifecycle change. The tracker guarantees that storage and the in-memory
//! tracked set never diverge: every state change is persisted before the
//! corresponding notification fires, and a failed write aborts the change.
//!
//! State graphs are plain data: a list of [`Transition`]s, each pairing an
//! event with the path of states the session walks when that event arrives
//! in the path's first state. Sessions reaching one of the configured
//! auto-untrack states are removed from tracking automatically.
//!
//! [`JsonFileStorage`] is a ready-made storage backend persisting the
//! tracked set to a JSON file; any other backend plugs in through the
//! [`SessionTrackerStorage`] trait.
//!
//! # Example
//!
//! ```
//! use std::collections::HashSet;
//! use std::rc::Rc;
//!
//! use sesstrack_core::{
//!     JsonFileStorage, Mode, SessionId, SessionRecord, SessionTracker,
//!     SessionTrackerListener, Transition,
//! };
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum State {
//!     Inactive,
//!     Active,
//! }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Event {
//!     Login,
//!     Logout,
//! }
//!
//! struct Quiet;
//!
//! impl SessionTrackerListener<State, Event> for Quiet {
//!     fn on_session_tracking_started(
//!         &self,
//!         _: &mut SessionTracker<State, Event>,
//!         _: &SessionRecord<State>,
//!     ) {
//!     }
//!     fn on_session_state_changed(
//!         &self,
//!         _: &mut SessionTracker<State, Event>,
//!         _: &SessionRecord<State>,
//!         _: State,
//!     ) {
//!     }
//!     fn on_session_tracking_stopped(
//!         &self,
//!         _: &mut SessionTracker<State, Event>,
//!         _: &SessionRecord<State>,
//!     ) {
//!     }
//!     fn on_all_sessions_tracking_stopped(
//!         &self,
//!         _: &mut SessionTracker<State, Event>,
//!         _: &[SessionRecord<State>],
//!     ) {
//!     }
//!     fn on_tracker_initialized(
//!         &self,
//!         _: &mut SessionTracker<State, Event>,
//!         _: &[SessionRecord<State>],
//!     ) {
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let storage = JsonFileStorage::new(
//!     dir.path().join("sessions.json"),
//!     vec![State::Inactive, State::Active],
//! );
//! let mut tracker = SessionTracker::new(
//!     Rc::new(storage),
//!     Rc::new(|_: &SessionId| {
//!         vec![
//!             Transition::new(Event::Login, vec![State::Inactive, State::Active]).unwrap(),
//!             Transition::new(Event::Logout, vec![State::Active, State::Inactive]).unwrap(),
//!         ]
//!     }),
//!     Rc::new(Quiet),
//!     HashSet::new(),
//!     Mode::Strict,
//! );
//!
//! tracker.initialize()?;
//! tracker.track_session(SessionId::new("user-1")?, State::Inactive)?;
//! assert!(tracker.consume_event(&SessionId::new("user-1")?, Event::Login)?);
//! assert_eq!(tracker.session_records()?[0].state, State::Active);
//! # Ok(())
//! # }
//! ```
//!
//! # Modes
//!
//! The tracker's [`Mode`] picks a misuse policy (strict: error; relaxed: log
//! and no-op) and a logging volume (verbose or not), independently.
//!
//! # Threading
//!
//! [`SessionTracker`] is single-threaded and synchronous; see its
//! documentation for the reentrancy rules.

pub mod error;
pub mod listener;
pub mod machine;
pub mod record;
pub mod storage;
pub mod supplier;
pub mod tracker;
pub mod transition;

pub use error::{ConfigError, SessionTrackerError, StorageError};
pub use listener::SessionTrackerListener;
pub use machine::{StateHop, StateMachine};
pub use record::{SessionId, SessionRecord};
pub use storage::{JsonFileStorage, SessionTrackerStorage};
pub use supplier::TransitionSupplier;
pub use tracker::{Mode, SessionTracker};
pub use transition::Transition;
