//! World state synchronization for Homestead.
//!
//! The server owns authoritative [`World`]s; each client keeps a
//! [`ClientWorld`] replica of the one it has loaded. Between them:
//!
//! - **Entity sync**: every tick, entities whose broadcast interval has
//!   elapsed go out as `ServerClientEntityUpdate`s. Clients apply them
//!   through a monotonic gate and interpolate positions.
//! - **Change logs**: tile writes on an [`Island`] are logged and
//!   replayed by clients, newest first with an early stop.
//!
//! # Key types
//!
//! - [`WorldManager`]: owns the worlds, routes players and packets
//! - [`World`]: one world's characters, islands and members
//! - [`EntitySync`]: broadcast timing, owner flag, monotonic gate
//! - [`ClientWorld`]: the client-side replica
//! - [`PacketSink`]: where worlds put outgoing packets

mod change_log;
mod character;
mod config;
mod entity;
mod error;
mod lerp;
mod manager;
mod replica;
mod sink;
mod world;

pub use change_log::{
    ChangeLogEntry, ChangeLogReplica, EMPTY_PLOT, Island, IslandReplica, serialize_change_logs,
};
pub use character::{Character, CharacterData, ClientCharacterData, POSITION_SCALE};
pub use config::{IslandConfig, SpawnPoint, SyncConfig, WorldConfig};
pub use entity::{EntitySync, next_entity_id};
pub use error::WorldError;
pub use lerp::{LERP_DURATION_MS, Lerp, PositionLerp};
pub use manager::WorldManager;
pub use replica::{ClientWorld, ReplicaCharacter, UpdateOutcome};
pub use sink::{PacketSink, RecordingSink, SentPacket};
pub use world::{Member, PLAYER_CHARACTER_TYPE, SYSTEM_USERNAME, World};
