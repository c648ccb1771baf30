//! Validated state machine transition definitions.

use std::fmt;

use crate::error::ConfigError;

/// One state machine transition: an event plus the ordered path of states the
/// machine walks through when the event is consumed.
///
/// The identity of a transition is the combination of its event and its
/// starting state (the first state of the path); a state machine rejects a
/// transition set holding two transitions with the same identity.
///
/// Validation happens eagerly at construction, so malformed configuration
/// surfaces at setup time rather than at event consumption time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<S, E> {
    event: E,
    state_path: Vec<S>,
}

impl<S, E> Transition<S, E>
where
    S: PartialEq + fmt::Debug,
{
    /// Creates a transition from an event and a state path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::StatePathTooShort`] if the path holds fewer
    /// than two states and [`ConfigError::RepeatedPathState`] if the path
    /// holds the same state twice in a row.
    pub fn new(event: E, state_path: Vec<S>) -> Result<Self, ConfigError> {
        if state_path.len() < 2 {
            return Err(ConfigError::StatePathTooShort {
                len: state_path.len(),
            });
        }
        for (position, pair) in state_path.windows(2).enumerate() {
            if pair[0] == pair[1] {
                return Err(ConfigError::RepeatedPathState {
                    state: format!("{:?}", pair[0]),
                    position,
                });
            }
        }
        Ok(Self { event, state_path })
    }

    /// Returns the event that triggers this transition.
    #[must_use]
    pub fn event(&self) -> &E {
        &self.event
    }

    /// Returns the ordered state path.
    #[must_use]
    pub fn state_path(&self) -> &[S] {
        &self.state_path
    }

    /// Returns the starting state (the first state of the path), which
    /// together with the event forms the transition's identity.
    #[must_use]
    pub fn start_state(&self) -> &S {
        &self.state_path[0]
    }
}
