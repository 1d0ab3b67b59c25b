//! Lifecycle state machines
//!
//! Typed flat state machines for component lifecycles. Users define a state
//! enum, implement [`Transitions`] to map inputs to successor states, and
//! drive it through a [`Machine`], which records history for debugging.
//!
//! ```rust
//! use tessera_core::lifecycle::{LifecycleInput, LifecycleState, Machine};
//!
//! let mut lifecycle = Machine::new(LifecycleState::Created);
//! assert_eq!(lifecycle.send(LifecycleInput::Connect), Some(LifecycleState::Connected));
//! // Connecting twice is not a transition
//! assert_eq!(lifecycle.send(LifecycleInput::Connect), None);
//! ```

use std::fmt::Debug;
use std::hash::Hash;

/// Trait for state enums that handle inputs
pub trait Transitions: Copy + PartialEq + Eq + Hash + Debug + 'static {
    /// Input alphabet of the machine
    type Input: Copy + PartialEq + Debug;

    /// Return the successor state, or None if the input is ignored here
    fn on_input(&self, input: Self::Input) -> Option<Self>;
}

/// A state machine instance
#[derive(Clone, Debug)]
pub struct Machine<T: Transitions> {
    current: T,
    /// History of state transitions (for debugging)
    history: Vec<(T, T::Input, T)>,
}

impl<T: Transitions> Machine<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: initial,
            history: Vec::new(),
        }
    }

    /// Get the current state
    pub fn current(&self) -> T {
        self.current
    }

    /// Check if we're in a specific state
    pub fn is_in(&self, state: T) -> bool {
        self.current == state
    }

    /// Check if an input would trigger a transition from the current state
    pub fn can_send(&self, input: T::Input) -> bool {
        self.current.on_input(input).is_some()
    }

    /// Feed an input, returning the new state if a transition happened
    pub fn send(&mut self, input: T::Input) -> Option<T> {
        let from = self.current;
        let to = from.on_input(input)?;
        self.current = to;
        self.history.push((from, input, to));
        tracing::trace!(?from, ?input, ?to, "lifecycle transition");
        Some(to)
    }

    /// Get transition history
    pub fn history(&self) -> &[(T, T::Input, T)] {
        &self.history
    }

    /// Clear transition history
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

/// Mount lifecycle of a component instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    #[default]
    Created,
    Connected,
    Disconnected,
}

/// Host lifecycle hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleInput {
    Connect,
    Disconnect,
}

impl Transitions for LifecycleState {
    type Input = LifecycleInput;

    fn on_input(&self, input: LifecycleInput) -> Option<Self> {
        match (self, input) {
            (LifecycleState::Created, LifecycleInput::Connect) => Some(LifecycleState::Connected),
            (LifecycleState::Connected, LifecycleInput::Disconnect) => {
                Some(LifecycleState::Disconnected)
            }
            (LifecycleState::Disconnected, LifecycleInput::Connect) => {
                Some(LifecycleState::Connected)
            }
            _ => None,
        }
    }
}

impl LifecycleState {
    pub fn is_connected(&self) -> bool {
        matches!(self, LifecycleState::Connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_disconnect_cycle() {
        let mut machine = Machine::new(LifecycleState::Created);

        machine.send(LifecycleInput::Connect);
        assert!(machine.current().is_connected());

        machine.send(LifecycleInput::Disconnect);
        assert!(machine.is_in(LifecycleState::Disconnected));

        machine.send(LifecycleInput::Connect);
        assert!(machine.is_in(LifecycleState::Connected));
    }

    #[test]
    fn test_invalid_input_no_transition() {
        let mut machine = Machine::new(LifecycleState::Created);

        assert!(!machine.can_send(LifecycleInput::Disconnect));
        assert_eq!(machine.send(LifecycleInput::Disconnect), None);
        assert!(machine.is_in(LifecycleState::Created));
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_history() {
        let mut machine = Machine::new(LifecycleState::Created);
        machine.send(LifecycleInput::Connect);
        machine.send(LifecycleInput::Disconnect);

        let history = machine.history();
        assert_eq!(history.len(), 2);
        assert_eq!(
            history[0],
            (
                LifecycleState::Created,
                LifecycleInput::Connect,
                LifecycleState::Connected
            )
        );

        machine.clear_history();
        assert!(machine.history().is_empty());
    }
}
