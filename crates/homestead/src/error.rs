//! Unified error type for Homestead.

use std::path::PathBuf;

use homestead_protocol::ProtocolError;
use homestead_session::SessionError;
use homestead_transport::TransportError;
use homestead_world::WorldError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` variants let `?` convert sub-crate errors, so code built
/// on the `homestead` crate deals with this one type.
#[derive(Debug, thiserror::Error)]
pub enum HomesteadError {
    /// A transport-level error (framing, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unknown packet).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (bind, auth, unknown connection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A world-level error (unknown world, authority, bad blob).
    #[error(transparent)]
    World(#[from] WorldError),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// An address string that doesn't resolve to a socket address.
    #[error("cannot resolve address {0:?}")]
    InvalidAddress(String),

    /// The client couldn't reach the server or start its network thread.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The client's network thread has stopped.
    #[error("not connected")]
    Disconnected,
}
