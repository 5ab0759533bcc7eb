//! Keepalive scheduling for the controller link
//!
//! A single cooperative timer checked once per loop iteration. While the link
//! is down the reference point still advances whenever the interval elapses,
//! and the agent resets it on every `Opened`, so a fresh connection gets its
//! first probe one full interval after opening rather than a burst.

use crate::connection::LinkSession;
use crate::transport::Transport;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct KeepaliveTimer {
    interval: Duration,
    last_probe: Instant,
    probes_sent: u64,
}

impl KeepaliveTimer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_probe: now,
            probes_sent: 0,
        }
    }

    pub fn probes_sent(&self) -> u64 {
        self.probes_sent
    }

    /// Restart the interval from `now`
    pub fn reset(&mut self, now: Instant) {
        self.last_probe = now;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_probe) >= self.interval
    }

    /// Probe the session if the interval has elapsed
    ///
    /// Returns `true` when a probe was sent.
    pub fn tick<T: Transport>(&mut self, now: Instant, session: &mut LinkSession<T>) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.last_probe = now;

        if !session.is_connected() {
            return false;
        }

        match session.probe() {
            Ok(()) => {
                self.probes_sent += 1;
                debug!(count = self.probes_sent, "Keepalive probe sent");
                true
            }
            Err(e) => {
                warn!("Keepalive probe failed: {}", e);
                false
            }
        }
    }
}
