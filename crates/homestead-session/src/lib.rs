//! Connection and player management for Homestead.
//!
//! This crate handles everything between a raw socket and a known player:
//!
//! 1. **Connections**: the [`ConnectionManager`] owns the network thread,
//!    accepts stream connections, reads frames and datagrams, and hands
//!    decoded packets to the simulation thread.
//! 2. **Endpoint lifecycle**: [`EndpointState`] and the mark/sweep
//!    [`EndpointRegistry`] make sure a dead connection is never removed in
//!    the middle of an iteration.
//! 3. **Players**: the [`PlayerDirectory`] maps connections and datagram
//!    addresses to authenticated players.
//! 4. **Credentials**: the [`CredentialStore`] trait is where logins are
//!    checked and new players registered.
//!
//! # How it fits in the stack
//!
//! ```text
//! World Layer (above)  ← receives packets from known players
//!     ↕
//! Session Layer (this crate)  ← sockets, endpoints, player identity
//!     ↕
//! Transport + Protocol (below)  ← frames, send queue, packets
//! ```

mod auth;
mod endpoint;
mod error;
mod manager;
mod players;
mod registry;

pub use auth::{CredentialStore, InMemoryCredentials, hash_password, verify_password};
pub use endpoint::{Endpoint, EndpointState};
pub use error::SessionError;
pub use manager::{
    ConnectionHandler, ConnectionManager, ManagerConfig, NetworkEvent, PacketSource,
};
pub use players::{Player, PlayerDirectory};
pub use registry::EndpointRegistry;
