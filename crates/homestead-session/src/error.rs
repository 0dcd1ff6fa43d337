//! Error types for the session layer.

use homestead_protocol::PlayerId;
use homestead_transport::ConnectionId;

use crate::EndpointState;

/// Errors that can occur while managing connections and players.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Login was refused by the [`CredentialStore`](crate::CredentialStore).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No endpoint or player is bound to this connection.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// No authenticated player has this id.
    #[error("player {0} not found")]
    NotFound(PlayerId),

    /// The player already has an authenticated connection.
    #[error("player {0} already has an active connection")]
    AlreadyConnected(PlayerId),

    /// An endpoint was asked to skip or reverse a lifecycle step.
    #[error("endpoint {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: ConnectionId,
        from: EndpointState,
        to: EndpointState,
    },

    /// Binding a listening socket failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The network runtime or thread couldn't be started.
    #[error("failed to start network thread: {0}")]
    Startup(#[source] std::io::Error),
}
