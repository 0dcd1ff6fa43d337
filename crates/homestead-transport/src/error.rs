use homestead_protocol::ProtocolError;

use crate::ConnectionId;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the stream in the middle of a frame.
    #[error("connection closed mid-frame: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding a socket failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Framing or decoding failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A frame too big for a single datagram.
    #[error("datagram of {size} bytes exceeds maximum {max}")]
    DatagramTooLarge {
        /// Frame size.
        size: usize,
        /// Largest datagram we send.
        max: usize,
    },

    /// No writer is registered for this connection.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// The send worker has stopped.
    #[error("transport shut down")]
    Shutdown,
}
