//! Gateway transport abstraction.
//!
//! The session loop and reassembler are written against this trait rather
//! than a concrete socket so the protocol behavior can be exercised against
//! a scripted transport in tests. The production implementation wraps the
//! WebSocket handed over by the HTTP upgrade.

use async_trait::async_trait;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use thiserror::Error;

/// Transport-layer faults: peer disconnects and I/O errors. These trigger
/// the close sequence and are never retried here; reconnect policy belongs
/// to the gateway.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport I/O error: {0}")]
    Io(String),
}

/// One fragment delivered by the transport. `is_final` marks the end of the
/// logical message; fragment boundaries otherwise carry no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub payload: Vec<u8>,
    pub is_text: bool,
    pub is_final: bool,
}

impl Fragment {
    pub fn text(payload: impl Into<Vec<u8>>, is_final: bool) -> Self {
        Self { payload: payload.into(), is_text: true, is_final }
    }

    pub fn binary(payload: impl Into<Vec<u8>>) -> Self {
        Self { payload: payload.into(), is_text: false, is_final: true }
    }
}

/// A bidirectional gateway connection.
#[async_trait]
pub trait Transport: Send {
    /// Wait for the next fragment. `Ok(None)` means the peer closed.
    async fn receive(&mut self) -> Result<Option<Fragment>, TransportError>;

    /// Write one complete text message.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Send a normal-closure close frame with the given reason. Only called
    /// while the connection is open; afterwards [`Transport::is_open`]
    /// reports false.
    async fn close(&mut self, reason: &str) -> Result<(), TransportError>;

    /// Whether the connection is still open in the sending direction.
    fn is_open(&self) -> bool;
}

/// Production transport over the upgraded WebSocket.
pub struct WebSocketTransport {
    socket: WebSocket,
    open: bool,
}

impl WebSocketTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket, open: true }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn receive(&mut self) -> Result<Option<Fragment>, TransportError> {
        loop {
            match self.socket.recv().await {
                None => {
                    self.open = false;
                    return Ok(None);
                }
                // The WebSocket layer reassembles wire fragments itself, so
                // every message surfaces here as one terminal fragment.
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(Fragment::text(text.into_bytes(), true)));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(Fragment::binary(data)));
                }
                // Peer-initiated close: the reader is done, but our side of
                // the close handshake is still owed a close frame.
                Some(Ok(Message::Close(_))) => return Ok(None),
                // Pings are answered by the WebSocket layer.
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Err(e)) => {
                    self.open = false;
                    return Err(TransportError::Io(e.to_string()));
                }
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self, reason: &str) -> Result<(), TransportError> {
        self.open = false;
        self.socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::NORMAL,
                reason: reason.to_string().into(),
            })))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
