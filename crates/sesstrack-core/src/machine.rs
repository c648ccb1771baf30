//! Per-session finite state machine.
//!
//! One [`StateMachine`] instance exists per tracked session. It owns the
//! session's current state and its validated transition set, and it executes
//! events as a sequence of *hops*: consuming an event whose identity matches
//! `(event, current_state)` stages the matching transition's path, and the
//! owner then drains the staged hops one at a time with [`next_hop`].
//!
//! # Contract
//!
//! - An event with no matching transition identity is ignored;
//!   [`apply_event`] returns `false` and the machine does not move.
//! - A staged path advances one hop per [`next_hop`] call, and only while at
//!   least one listener is subscribed. Removing all listeners stops the
//!   machine immediately after the hop whose handling removed them: any
//!   remaining staged hops are discarded. This is how the tracker
//!   short-circuits a multi-hop transition when a session gets auto-untracked
//!   mid-path.
//! - [`current_state`] always reflects the last hop actually executed.
//!
//! [`apply_event`]: StateMachine::apply_event
//! [`next_hop`]: StateMachine::next_hop
//! [`current_state`]: StateMachine::current_state

use std::collections::VecDeque;
use std::fmt;

use crate::error::ConfigError;
use crate::transition::Transition;

/// One atomic state-to-state advance within a single event consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHop<S> {
    /// The state before the hop.
    pub from: S,
    /// The state after the hop.
    pub to: S,
}

/// A session state machine: current state, transition set, staged hop cursor
/// and listener subscriptions.
#[derive(Debug)]
pub struct StateMachine<S, E> {
    current: S,
    transitions: Vec<Transition<S, E>>,
    staged: VecDeque<S>,
    listeners: usize,
}

impl<S, E> StateMachine<S, E>
where
    S: Copy + PartialEq + fmt::Debug,
    E: PartialEq + fmt::Debug,
{
    /// Creates a machine seeded with `initial` as its current state.
    ///
    /// Per-transition path validation already happened at
    /// [`Transition::new`]; this constructor validates the set as a whole.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoTransitions`] for an empty transition set and
    /// [`ConfigError::DuplicateTransition`] if two transitions share the same
    /// `(event, start_state)` identity.
    pub fn new(initial: S, transitions: Vec<Transition<S, E>>) -> Result<Self, ConfigError> {
        if transitions.is_empty() {
            return Err(ConfigError::NoTransitions);
        }
        for (i, transition) in transitions.iter().enumerate() {
            let duplicate = transitions[..i].iter().any(|earlier| {
                earlier.event() == transition.event()
                    && earlier.start_state() == transition.start_state()
            });
            if duplicate {
                return Err(ConfigError::DuplicateTransition {
                    event: format!("{:?}", transition.event()),
                    state: format!("{:?}", transition.start_state()),
                });
            }
        }
        Ok(Self {
            current: initial,
            transitions,
            staged: VecDeque::new(),
            listeners: 0,
        })
    }

    /// Returns the current state, reflecting the last hop actually executed.
    #[must_use]
    pub fn current_state(&self) -> S {
        self.current
    }

    /// Subscribes one listener.
    pub fn add_listener(&mut self) {
        self.listeners += 1;
    }

    /// Removes every subscribed listener, halting any staged hops.
    pub fn remove_all_listeners(&mut self) {
        self.listeners = 0;
    }

    /// Returns whether at least one listener is subscribed.
    #[must_use]
    pub fn has_listeners(&self) -> bool {
        self.listeners > 0
    }

    /// Stages the transition matching `(event, current_state)`, if any.
    ///
    /// Returns whether a transition matched. Any previously staged
    /// (abandoned) path is discarded first. The machine does not move until
    /// the staged hops are drained with [`next_hop`](Self::next_hop).
    pub fn apply_event(&mut self, event: &E) -> bool {
        self.staged.clear();
        let matched = self
            .transitions
            .iter()
            .find(|t| t.event() == event && *t.start_state() == self.current);
        match matched {
            Some(transition) => {
                self.staged
                    .extend(transition.state_path()[1..].iter().copied());
                true
            }
            None => false,
        }
    }

    /// Executes the next staged hop, advancing the current state.
    ///
    /// Returns `None` once the staged path is exhausted or the listener set
    /// is empty; in the latter case the remaining staged hops are discarded.
    pub fn next_hop(&mut self) -> Option<StateHop<S>> {
        if self.listeners == 0 {
            self.staged.clear();
            return None;
        }
        let to = self.staged.pop_front()?;
        let from = self.current;
        self.current = to;
        Some(StateHop { from, to })
    }
}
