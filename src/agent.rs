//! Agent loop wiring the link session, keepalive and command executor
//!
//! Everything runs on one cooperative loop: each iteration drains the session
//! events, dispatches inbound commands, ticks the keepalive timer and, when
//! enabled, retries a dropped link. No step blocks.

use crate::actuator::Actuator;
use crate::command::CommandExecutor;
use crate::config::AgentConfig;
use crate::connection::{Backoff, KeepaliveTimer, LinkSession, SessionEvent};
use crate::network::{associate_until_success, NetworkAssociator};
use crate::transport::Transport;
use rover_shared::codec::{self, DeviceMessage};
use rover_shared::LinkState;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pending reconnection state
#[derive(Debug)]
struct ReconnectSchedule {
    backoff: Backoff,
    due: Option<Instant>,
}

/// The on-device control agent
pub struct Agent<T, A> {
    config: AgentConfig,
    session: LinkSession<T>,
    keepalive: KeepaliveTimer,
    executor: CommandExecutor<A>,
    reconnect: Option<ReconnectSchedule>,
}

impl<T: Transport, A: Actuator> Agent<T, A> {
    pub fn new(config: AgentConfig, transport: T, actuator: A, now: Instant) -> Self {
        let reconnect = config.reconnect.enabled.then(|| ReconnectSchedule {
            backoff: config.reconnect.retry().backoff(),
            due: None,
        });

        Self {
            session: LinkSession::new(transport, config.max_events_per_poll),
            keepalive: KeepaliveTimer::new(config.keepalive_interval(), now),
            executor: CommandExecutor::new(actuator),
            reconnect,
            config,
        }
    }

    #[cfg(test)]
    pub fn link_state(&self) -> LinkState {
        self.session.state()
    }

    #[cfg(test)]
    pub fn session_mut(&mut self) -> &mut LinkSession<T> {
        &mut self.session
    }

    #[cfg(test)]
    pub fn executor(&self) -> &CommandExecutor<A> {
        &self.executor
    }

    /// Associate with the network, connect, then loop forever
    pub async fn run<N: NetworkAssociator + ?Sized>(&mut self, associator: &mut N) {
        let address = associate_until_success(
            associator,
            &self.config.credentials,
            self.config.association.backoff(),
        )
        .await;
        info!(%address, "Network ready");

        self.connect();

        let pause = self.config.poll_interval();
        loop {
            self.step(Instant::now());
            tokio::time::sleep(pause).await;
        }
    }

    /// Issue a connect request to the configured endpoint
    pub fn connect(&mut self) {
        if let Err(e) = self.session.connect(&self.config.endpoint) {
            warn!("Connect request rejected: {}", e);
        }
    }

    /// Run one loop iteration at `now`
    pub fn step(&mut self, now: Instant) {
        for event in self.session.poll() {
            self.handle_event(event, now);
        }

        self.keepalive.tick(now, &mut self.session);
        self.reconnect_if_due(now);
    }

    /// Close the link before exiting
    pub fn shutdown(&mut self) {
        info!(
            probes = self.keepalive.probes_sent(),
            stats = ?self.executor.stats(),
            "Agent shutting down"
        );
        self.session.close();
    }

    fn handle_event(&mut self, event: SessionEvent, now: Instant) {
        match event {
            SessionEvent::Opened => {
                info!(epoch = self.session.epoch(), "Controller link established");
                self.keepalive.reset(now);
                if let Some(schedule) = self.reconnect.as_mut() {
                    schedule.backoff.reset();
                    schedule.due = None;
                }
                self.identify();
            }
            SessionEvent::Closed { reason } => {
                debug!(%reason, "Controller link lost");
                match self.reconnect.as_mut() {
                    Some(schedule) => {
                        let delay = schedule.backoff.next_delay();
                        schedule.due = Some(now + delay);
                        info!(retry_in_ms = delay.as_millis() as u64, "Reconnect scheduled");
                    }
                    None => warn!("Automatic reconnection disabled, link stays down"),
                }
            }
            SessionEvent::MessageReceived(payload) => {
                self.executor.handle_payload(&payload);
            }
            SessionEvent::LivenessSignalReceived(signal) => {
                debug!(?signal, "Liveness signal received");
            }
        }
    }

    /// Announce this device to the controller
    fn identify(&mut self) {
        let Some(device_id) = self.config.device_id.clone() else {
            return;
        };

        for message in DeviceMessage::identification(device_id) {
            let sent = codec::encode(&message)
                .map_err(|e| e.to_string())
                .and_then(|text| self.session.send(&text).map_err(|e| e.to_string()));
            if let Err(e) = sent {
                warn!("Failed to send identification: {}", e);
                return;
            }
        }
        debug!("Identification sent");
    }

    fn reconnect_if_due(&mut self, now: Instant) {
        let due = self
            .reconnect
            .as_ref()
            .and_then(|schedule| schedule.due)
            .is_some_and(|due| now >= due);
        if !due || self.session.state() != LinkState::Disconnected {
            return;
        }

        if let Some(schedule) = self.reconnect.as_mut() {
            schedule.due = None;
        }
        info!("Reconnecting to controller");
        self.connect();
    }
}
