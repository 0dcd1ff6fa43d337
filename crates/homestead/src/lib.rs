//! # Homestead
//!
//! Client-server world synchronization for small multiplayer farming
//! games.
//!
//! The server is authoritative. Each player holds one reliable stream
//! for login and world changes plus a datagram channel for frequent
//! position updates. Worlds broadcast their entities on a timer and
//! clients keep a [`ClientWorld`] replica that only ever moves forward.
//!
//! ## Crates
//!
//! - `homestead-protocol`: packet types and the binary codec
//! - `homestead-transport`: framing, queues and the send worker
//! - `homestead-session`: connections, players and credentials
//! - `homestead-world`: worlds, entity sync and change logs
//! - `homestead-tick`: fixed-rate scheduling and the game clock
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use homestead::prelude::*;
//!
//! # async fn run() -> Result<(), HomesteadError> {
//! init_logging("info");
//! let mut server = HomesteadServer::builder()
//!     .bind("127.0.0.1:7777", "127.0.0.1:7778")
//!     .start()?;
//! let handle = server.shutdown_handle();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     handle.shutdown();
//! });
//! server.run().await
//! # }
//! ```

mod client;
mod config;
mod error;
mod handler;
pub mod logging;
mod server;
mod session;

pub use client::NetworkClient;
pub use config::{ClientConfig, ServerConfig};
pub use error::HomesteadError;
pub use handler::ServerHandler;
pub use logging::init_logging;
pub use server::{HomesteadServer, HomesteadServerBuilder, ShutdownHandle};
pub use session::{ClientSession, SessionState, TEST_UDP_INTERVAL};

pub use homestead_protocol as protocol;
pub use homestead_session as session_layer;
pub use homestead_tick as tick;
pub use homestead_transport as transport;
pub use homestead_world as world;

/// Everything a server or client binary usually needs.
pub mod prelude {
    pub use crate::{
        ClientConfig, ClientSession, HomesteadError, HomesteadServer, HomesteadServerBuilder,
        NetworkClient, ServerConfig, ServerHandler, SessionState, ShutdownHandle, init_logging,
    };
    pub use homestead_protocol::{EntityId, EntityType, Packet, PlayerId};
    pub use homestead_session::{CredentialStore, InMemoryCredentials};
    pub use homestead_world::{ClientWorld, IslandConfig, SyncConfig, WorldConfig};
}
