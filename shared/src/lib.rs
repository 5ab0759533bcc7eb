//! Rover Shared Protocol Types
//!
//! This crate provides the wire-level types shared between the on-device
//! agent and a controller: the inbound command codec, the outbound device
//! messages and the link lifecycle state machine.

pub mod codec;
pub mod state_machine;

pub use codec::{Command, DeviceMessage, ParseError};
pub use state_machine::{LinkEvent, LinkState, LinkStateMachine, TransitionResult};

/// Link policy parameters
pub mod link {
    /// Interval between keepalive probes in milliseconds
    pub const KEEPALIVE_INTERVAL_MS: u64 = 15_000;

    /// Pause between two iterations of the agent loop
    pub const POLL_INTERVAL_MS: u64 = 10;

    /// Upper bound on a single connection attempt
    pub const CONNECT_TIMEOUT_MS: u64 = 5_000;

    /// Maximum number of events surfaced by one session poll
    pub const MAX_EVENTS_PER_POLL: usize = 16;

    /// Initial delay between retries (association and reconnection)
    pub const RETRY_DELAY_MS: u64 = 1_000;

    /// Retry delay ceiling for exponential backoff
    pub const MAX_RETRY_DELAY_MS: u64 = 30_000;

    /// Client type announced to the controller during identification
    pub const CLIENT_TYPE: &str = "esp";
}

/// Servo parameters
pub mod servo {
    /// Lowest nominal servo angle in degrees
    pub const MIN_ANGLE: i32 = 0;

    /// Highest nominal servo angle in degrees
    pub const MAX_ANGLE: i32 = 180;

    /// Check whether an angle lies inside the nominal servo range
    pub fn in_range(angle: i32) -> bool {
        (MIN_ANGLE..=MAX_ANGLE).contains(&angle)
    }
}
