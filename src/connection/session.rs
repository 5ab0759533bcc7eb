//! Link session owning the single controller connection

use crate::transport::{Transport, TransportError, TransportEvent};
use bytes::Bytes;
use rover_shared::{LinkEvent, LinkState, LinkStateMachine, TransitionResult};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Kind of liveness signal received from the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessSignal {
    Ping,
    Pong,
}

/// Events surfaced by [`LinkSession::poll`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Link is now `Connected`
    Opened,
    /// Link is now `Disconnected`
    Closed { reason: String },
    /// Payload received on the live connection
    MessageReceived(Bytes),
    /// Diagnostic only
    LivenessSignalReceived(LivenessSignal),
}

/// Errors returned by session operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Link is {0}, not connected")]
    NotConnected(LinkState),

    #[error("Cannot connect while link is {0}")]
    InvalidState(LinkState),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Owns the transport and tracks the link lifecycle
pub struct LinkSession<T> {
    transport: T,
    fsm: LinkStateMachine,
    /// Transport events not yet surfaced
    pending: VecDeque<TransportEvent>,
    max_events_per_poll: usize,
}

impl<T: Transport> LinkSession<T> {
    /// Create a disconnected session
    ///
    /// `max_events_per_poll` bounds how many transport events one `poll`
    /// processes; surplus events wait for the next call.
    pub fn new(transport: T, max_events_per_poll: usize) -> Self {
        Self {
            transport,
            fsm: LinkStateMachine::new(),
            pending: VecDeque::new(),
            max_events_per_poll: max_events_per_poll.max(1),
        }
    }

    pub fn state(&self) -> LinkState {
        self.fsm.state()
    }

    pub fn is_connected(&self) -> bool {
        self.fsm.is_connected()
    }

    /// Current connection epoch
    pub fn epoch(&self) -> u64 {
        self.fsm.epoch()
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Begin connecting to `endpoint`
    ///
    /// Only valid from `Disconnected`. Success is never reported here: the
    /// outcome arrives from `poll` as `Opened` or `Closed`. A transport that
    /// refuses to even start the attempt yields `Closed` on the next poll.
    pub fn connect(&mut self, endpoint: &str) -> Result<(), SessionError> {
        let state = self.fsm.state();
        if state != LinkState::Disconnected {
            return Err(SessionError::InvalidState(state));
        }

        self.fsm.process_event(LinkEvent::ConnectRequested);
        // Leftovers belong to the previous connection
        self.pending.clear();

        info!(endpoint, transport = self.transport.name(), "Connecting");

        if let Err(e) = self.transport.open(endpoint) {
            warn!("Transport refused to open: {}", e);
            self.pending.push_back(TransportEvent::Closed {
                reason: format!("Open failed: {e}"),
            });
        }

        Ok(())
    }

    /// Drive the transport and surface events in arrival order
    ///
    /// Never blocks. Processes at most `max_events_per_poll` transport events.
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        if self.pending.len() < self.max_events_per_poll {
            self.pending.extend(self.transport.poll());
        }

        let mut events = Vec::new();
        for _ in 0..self.max_events_per_poll {
            let Some(raw) = self.pending.pop_front() else {
                break;
            };
            if let Some(event) = self.apply(raw) {
                events.push(event);
            }
        }
        events
    }

    /// Send a text payload on the live connection
    pub fn send(&mut self, text: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.transport.send(text)?;
        Ok(())
    }

    /// Send a liveness probe on the live connection
    pub fn probe(&mut self) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.transport.send_liveness_signal()?;
        Ok(())
    }

    /// Close the link locally
    ///
    /// Moves straight to `Disconnected` without surfacing a `Closed` event and
    /// drops anything still queued from the connection.
    pub fn close(&mut self) {
        if self.fsm.state() == LinkState::Disconnected {
            return;
        }
        self.transport.close();
        self.fsm.process_event(LinkEvent::Closed);
        self.pending.clear();
        info!("Link closed locally");
    }

    fn ensure_connected(&self) -> Result<(), SessionError> {
        match self.fsm.state() {
            LinkState::Connected => Ok(()),
            state => {
                debug!(%state, "Dropping outbound traffic, link not connected");
                Err(SessionError::NotConnected(state))
            }
        }
    }

    /// Apply one transport event to the state machine
    fn apply(&mut self, event: TransportEvent) -> Option<SessionEvent> {
        match event {
            TransportEvent::Opened => match self.fsm.process_event(LinkEvent::Opened) {
                TransitionResult::Changed { .. } => {
                    info!(epoch = self.fsm.epoch(), "Link opened");
                    Some(SessionEvent::Opened)
                }
                result => {
                    warn!(?result, "Ignoring open event");
                    None
                }
            },
            TransportEvent::Closed { reason } => match self.fsm.process_event(LinkEvent::Closed) {
                TransitionResult::Changed { from, .. } => {
                    warn!(%reason, "Link closed (was {})", from);
                    Some(SessionEvent::Closed { reason })
                }
                _ => {
                    debug!(%reason, "Ignoring duplicate close");
                    None
                }
            },
            event if !self.fsm.is_connected() => {
                let kind = match event {
                    TransportEvent::Message(_) => "message",
                    TransportEvent::Ping => "ping",
                    _ => "pong",
                };
                warn!(state = %self.fsm.state(), "Discarding {} outside a live connection", kind);
                None
            }
            TransportEvent::Message(payload) => Some(SessionEvent::MessageReceived(payload)),
            TransportEvent::Ping => Some(SessionEvent::LivenessSignalReceived(LivenessSignal::Ping)),
            TransportEvent::Pong => Some(SessionEvent::LivenessSignalReceived(LivenessSignal::Pong)),
        }
    }
}
