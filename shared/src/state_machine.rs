//! Link Lifecycle State Machine
//!
//! Defines the valid transitions of the single controller connection.
//! `Disconnected` is both the initial state and the state reached after any
//! close. Transitions only happen in response to an explicit connect request
//! or a transport event.

use std::fmt;

/// Lifecycle state of the controller link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "disconnected"),
            LinkState::Connecting => write!(f, "connecting"),
            LinkState::Connected => write!(f, "connected"),
        }
    }
}

/// Events that can trigger link state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The agent asked the transport to open a connection
    ConnectRequested,
    /// The transport reported a successful open
    Opened,
    /// The transport reported the connection closed (or failed to open)
    Closed,
}

/// Result of a state transition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition was valid and state changed
    Changed { from: LinkState, to: LinkState },
    /// Event was accepted but the state stays the same
    Unchanged(LinkState),
    /// Event is not valid from the current state
    Invalid { from: LinkState, event: LinkEvent },
}

/// State machine for the controller link
#[derive(Debug, Default)]
pub struct LinkStateMachine {
    current_state: LinkState,
    epoch: u64,
}

impl LinkStateMachine {
    /// Create a new state machine in `Disconnected` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current state
    pub fn state(&self) -> LinkState {
        self.current_state
    }

    /// Number of connections that reached `Connected` so far
    ///
    /// The current connection epoch while `Connected`.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_connected(&self) -> bool {
        self.current_state == LinkState::Connected
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: LinkEvent) -> TransitionResult {
        let from = self.current_state;

        match self.get_next_state(event) {
            Some(to) if to == from => TransitionResult::Unchanged(to),
            Some(to) => {
                if to == LinkState::Connected {
                    self.epoch += 1;
                }
                self.current_state = to;
                TransitionResult::Changed { from, to }
            }
            None => TransitionResult::Invalid { from, event },
        }
    }

    /// Get the next state for a given event, if the transition is valid
    fn get_next_state(&self, event: LinkEvent) -> Option<LinkState> {
        use LinkEvent::*;
        use LinkState::*;

        match (self.current_state, event) {
            (Disconnected, ConnectRequested) => Some(Connecting),
            (Connecting, Opened) => Some(Connected),

            // A close while opening is a failed connection attempt
            (Connecting | Connected, Closed) => Some(Disconnected),

            // Duplicate close notifications are harmless
            (Disconnected, Closed) => Some(Disconnected),

            _ => None,
        }
    }
}
