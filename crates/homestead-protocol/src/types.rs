//! Identity and classification types shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Assigned by the credential store when a player authenticates. `0` is
/// never a real player; entities that belong to nobody carry it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// The "no player" id carried by unowned entities.
    pub const NONE: PlayerId = PlayerId(0);

    /// Returns `true` for any id other than [`PlayerId::NONE`].
    pub fn is_player(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A server-assigned entity identifier. `0` means "unassigned".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl EntityId {
    /// The placeholder id of an entity the server hasn't numbered yet.
    pub const UNASSIGNED: EntityId = EntityId(0);

    /// Returns `true` once the server has assigned a real id.
    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// The kind of entity an update blob describes.
///
/// The protocol never looks inside the blob; this tag tells the receiver
/// which decoder to hand it to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum EntityType {
    #[default]
    Unknown = 0,
    World = 1,
    Character = 2,
}

impl EntityType {
    /// Parses a wire tag.
    pub fn from_tag(tag: u8) -> Result<Self, ProtocolError> {
        match tag {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::World),
            2 => Ok(Self::Character),
            other => Err(ProtocolError::UnknownEntityType(other)),
        }
    }

    /// The wire tag.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::World => write!(f, "World"),
            Self::Character => write!(f, "Character"),
        }
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Which of the two delivery paths a packet travels on.
///
/// Chat lines and world loads MUST arrive (reliable), but a position update
/// that goes out every few hundred milliseconds can afford to lose a few.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// In order, no loss. The stream socket.
    Reliable,

    /// May be lost or reordered. The datagram socket.
    BestEffort,
}

impl Channel {
    /// Picks the channel for a packet's vitality.
    pub fn for_vital(vital: bool) -> Self {
        if vital { Self::Reliable } else { Self::BestEffort }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reliable => write!(f, "reliable"),
            Self::BestEffort => write!(f, "best-effort"),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
