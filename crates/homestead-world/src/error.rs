//! Error types for the world layer.

use homestead_protocol::{EntityId, EntityType, PlayerId, ProtocolError};

/// Errors that can occur during world operations.
///
/// None of these are fatal for a connection. The caller logs and drops
/// whatever packet or command produced them.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// No world with this name is loaded.
    #[error("world `{0}` not found")]
    WorldNotFound(String),

    /// Two worlds were configured with the same name.
    #[error("world `{0}` already exists")]
    DuplicateWorld(String),

    /// The player is not a member of any world (or of this one).
    #[error("player {0} is not in a world")]
    PlayerNotInWorld(PlayerId),

    /// The player is already a member of a world.
    #[error("player {player_id} is already in world `{world}`")]
    PlayerAlreadyInWorld {
        player_id: PlayerId,
        world: String,
    },

    /// The entity does not exist in this world.
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    /// A client tried to update an entity that isn't bound to it.
    #[error("player {player_id} may not update entity {entity_id}")]
    NotOwner {
        player_id: PlayerId,
        entity_id: EntityId,
    },

    /// The replica can't create entities of this type.
    #[error("cannot create entity of type {0}")]
    UnsupportedEntityType(EntityType),

    /// No island with this index.
    #[error("island {0} not found")]
    IslandNotFound(usize),

    /// A tile coordinate outside the island.
    #[error("tile ({x}, {y}) on layer {layer} is outside island {island}")]
    TileOutOfBounds {
        island: usize,
        layer: usize,
        x: u32,
        y: u32,
    },

    /// An entity blob or change log had bytes left over after decoding.
    #[error("{remaining} trailing bytes after entity data")]
    TrailingData { remaining: usize },

    /// An entity blob or change log didn't decode.
    #[error("malformed entity data: {0}")]
    MalformedData(#[from] ProtocolError),
}
