//! Transport trait abstraction for pluggable link backends
//!
//! Every method is non-blocking: `open` only starts a connection attempt and
//! its outcome arrives later through `poll` as `Opened` or `Closed`.

use bytes::Bytes;
use thiserror::Error;

/// Raw events produced by a transport, in the order it observed them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established
    Opened,
    /// Connection closed, or the open attempt failed
    Closed { reason: String },
    /// Application payload from the controller
    Message(Bytes),
    /// Liveness request from the controller
    Ping,
    /// Liveness reply from the controller
    Pong,
}

/// Errors reported synchronously by a transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Transport is not open")]
    NotOpen,

    #[error("No async runtime available to drive the transport")]
    NoRuntime,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Transport connection task has stopped")]
    ChannelClosed,
}

/// A single bidirectional connection to the controller
pub trait Transport {
    /// Start opening a connection to `endpoint`
    fn open(&mut self, endpoint: &str) -> Result<(), TransportError>;

    /// Tear the connection down; no further events from it are delivered
    fn close(&mut self);

    /// Queue a text payload for the controller
    fn send(&mut self, text: &str) -> Result<(), TransportError>;

    /// Queue a liveness probe
    fn send_liveness_signal(&mut self) -> Result<(), TransportError>;

    /// Drain the events observed since the last call
    fn poll(&mut self) -> Vec<TransportEvent>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
