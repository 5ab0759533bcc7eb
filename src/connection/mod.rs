//! Controller link management
//!
//! This module handles:
//! - The single link session and its lifecycle state
//! - Keepalive probing while the link is idle
//! - Exponential backoff for retried operations

mod backoff;
mod keepalive;
mod session;

pub use backoff::Backoff;
pub use keepalive::KeepaliveTimer;
pub use session::{LinkSession, SessionEvent};
