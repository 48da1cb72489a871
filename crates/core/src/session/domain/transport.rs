use thiserror::Error;

use crate::session::protocol::{ClientMessage, ServerMessage};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Port for the persistent client connection.
///
/// Handshake and framing are the implementation's business; the session
/// only needs ordered send/receive of whole messages. Any `Err` from
/// either direction is fatal for the session.
pub trait Transport: Send {
    /// Receive the next client message, blocking until one arrives.
    /// `Ok(None)` means the peer closed the connection in an orderly way.
    fn recv(&mut self) -> Result<Option<ClientMessage>, TransportError>;

    /// Send one message, blocking until the transport accepts it.
    fn send(&mut self, message: &ServerMessage) -> Result<(), TransportError>;

    /// Release the connection. Idempotent.
    fn close(&mut self);
}
