//! WebSocket transport for the controller link
//!
//! `open` spawns one connection task on the current tokio runtime. The task
//! owns the socket and exchanges work with the transport handle over
//! unbounded channels, so every `Transport` method returns immediately.

use crate::transport::traits::{Transport, TransportError, TransportEvent};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Work for the connection task
#[derive(Debug)]
enum Outbound {
    Text(String),
    Ping,
    Close,
}

/// WebSocket client implementing [`Transport`]
pub struct WebSocketTransport {
    connect_timeout: Duration,
    outbound_tx: Option<mpsc::UnboundedSender<Outbound>>,
    event_rx: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Create a transport whose open attempts give up after `connect_timeout`
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            outbound_tx: None,
            event_rx: None,
            task: None,
        }
    }

    fn enqueue(&self, message: Outbound) -> Result<(), TransportError> {
        let tx = self.outbound_tx.as_ref().ok_or(TransportError::NotOpen)?;
        tx.send(message).map_err(|_| TransportError::ChannelClosed)
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, endpoint: &str) -> Result<(), TransportError> {
        Url::parse(endpoint)
            .map_err(|e| TransportError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        // Anything still attached belongs to a connection the caller gave up on
        if let Some(stale) = self.task.take() {
            stale.abort();
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        self.task = Some(runtime.spawn(connection_task(
            endpoint.to_owned(),
            self.connect_timeout,
            outbound_rx,
            event_tx,
        )));
        self.outbound_tx = Some(outbound_tx);
        self.event_rx = Some(event_rx);

        Ok(())
    }

    fn close(&mut self) {
        if let Some(tx) = self.outbound_tx.take() {
            let _ = tx.send(Outbound::Close);
        }
        // Detach: the task finishes the close handshake on its own
        self.task = None;
        self.event_rx = None;
    }

    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        self.enqueue(Outbound::Text(text.to_owned()))
    }

    fn send_liveness_signal(&mut self) -> Result<(), TransportError> {
        self.enqueue(Outbound::Ping)
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        if let Some(rx) = self.event_rx.as_mut() {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }
        events
    }

    fn name(&self) -> &'static str {
        "WebSocket"
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Open the connection and pump it until it closes
async fn connection_task(
    endpoint: String,
    connect_timeout: Duration,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    let reason = match timeout(connect_timeout, connect_async(endpoint.as_str())).await {
        Ok(Ok((stream, _response))) => {
            debug!(%endpoint, "WebSocket handshake complete");
            let _ = event_tx.send(TransportEvent::Opened);
            run_connection(stream, &mut outbound_rx, &event_tx).await
        }
        Ok(Err(e)) => format!("Connect failed: {e}"),
        Err(_) => format!("Connect timed out after {}ms", connect_timeout.as_millis()),
    };

    let _ = event_tx.send(TransportEvent::Closed { reason });
}

/// Handle an open connection, returning the reason it ended
async fn run_connection(
    stream: WsStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<Outbound>,
    event_tx: &mpsc::UnboundedSender<TransportEvent>,
) -> String {
    let (mut writer, mut reader) = stream.split();

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                let message = match outbound {
                    Some(Outbound::Text(text)) => Message::Text(text.into()),
                    Some(Outbound::Ping) => Message::Ping(Bytes::new()),
                    Some(Outbound::Close) | None => {
                        let _ = writer.close().await;
                        return "Closed locally".into();
                    }
                };
                if let Err(e) = writer.send(message).await {
                    return format!("Write error: {e}");
                }
            }

            incoming = reader.next() => {
                let event = match incoming {
                    Some(Ok(Message::Ping(_))) => TransportEvent::Ping,
                    Some(Ok(Message::Pong(_))) => TransportEvent::Pong,
                    Some(Ok(Message::Close(frame))) => {
                        return match frame {
                            Some(frame) => format!("Closed by peer: {}", frame.reason.as_str()),
                            None => "Closed by peer".into(),
                        };
                    }
                    Some(Ok(Message::Frame(_))) => continue,
                    Some(Ok(message)) => TransportEvent::Message(message.into_data()),
                    Some(Err(e)) => return format!("Read error: {e}"),
                    None => return "Stream ended".into(),
                };
                let _ = event_tx.send(event);
            }
        }
    }
}
