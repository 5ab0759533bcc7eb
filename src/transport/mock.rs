//! Scripted transport for tests

use super::traits::{Transport, TransportError, TransportEvent};
use bytes::Bytes;
use std::collections::VecDeque;

/// Records every call and replays queued events on `poll`
#[derive(Debug, Default)]
pub struct MockTransport {
    pub opened: Vec<String>,
    pub sent: Vec<String>,
    pub liveness_signals: usize,
    pub closes: usize,
    pub fail_open: bool,
    queue: VecDeque<TransportEvent>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TransportEvent) {
        self.queue.push_back(event);
    }

    pub fn push_text(&mut self, text: &str) {
        self.push(TransportEvent::Message(Bytes::copy_from_slice(text.as_bytes())));
    }

    pub fn push_closed(&mut self, reason: &str) {
        self.push(TransportEvent::Closed {
            reason: reason.into(),
        });
    }
}

impl Transport for MockTransport {
    fn open(&mut self, endpoint: &str) -> Result<(), TransportError> {
        if self.fail_open {
            return Err(TransportError::InvalidEndpoint(endpoint.into()));
        }
        self.opened.push(endpoint.into());
        Ok(())
    }

    fn close(&mut self) {
        self.closes += 1;
    }

    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        self.sent.push(text.into());
        Ok(())
    }

    fn send_liveness_signal(&mut self) -> Result<(), TransportError> {
        self.liveness_signals += 1;
        Ok(())
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        self.queue.drain(..).collect()
    }

    fn name(&self) -> &'static str {
        "Mock"
    }
}
