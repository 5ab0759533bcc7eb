pub mod traits;
pub mod websocket;

#[cfg(test)]
pub mod mock;

pub use traits::{Transport, TransportError, TransportEvent};
pub use websocket::WebSocketTransport;
