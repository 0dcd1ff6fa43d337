//! Characters and their entity blobs.
//!
//! The server's blob for a character:
//!
//! ```text
//! playerId u32 | lerpOnClient bool | x i32 | y i32 | characterType string
//! ```
//!
//! The client's blob for its own character carries the world it was
//! produced in, so the server can drop updates left over from a world the
//! player has since left:
//!
//! ```text
//! playerId u32 | worldName string | x i32 | y i32
//! ```
//!
//! Positions travel as fixed point, value × [`POSITION_SCALE`].

use homestead_protocol::{Appearance, EntityType, PacketReader, PacketWriter, PlayerId};

use crate::{EntitySync, WorldError};

/// Fixed-point scale of blob positions.
pub const POSITION_SCALE: f32 = 10_000.0;

fn to_fixed(value: f32) -> i32 {
    (value * POSITION_SCALE) as i32
}

fn from_fixed(value: i32) -> f32 {
    value as f32 / POSITION_SCALE
}

fn finish(r: &PacketReader<'_>) -> Result<(), WorldError> {
    match r.remaining() {
        0 => Ok(()),
        remaining => Err(WorldError::TrailingData { remaining }),
    }
}

// ---------------------------------------------------------------------------
// Blobs
// ---------------------------------------------------------------------------

/// A character as the server describes it to clients.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterData {
    pub player_id: PlayerId,
    /// `false` tells the client to snap instead of interpolating.
    pub lerp_on_client: bool,
    pub x: f32,
    pub y: f32,
    pub character_type: String,
}

impl CharacterData {
    pub fn to_blob(&self) -> Vec<u8> {
        let mut w = PacketWriter::with_capacity(17 + self.character_type.len());
        w.write_u32(self.player_id.0);
        w.write_bool(self.lerp_on_client);
        w.write_i32(to_fixed(self.x));
        w.write_i32(to_fixed(self.y));
        w.write_str(&self.character_type);
        w.into_bytes()
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self, WorldError> {
        let mut r = PacketReader::new(blob);
        let data = Self {
            player_id: PlayerId(r.read_u32()?),
            lerp_on_client: r.read_bool()?,
            x: from_fixed(r.read_i32()?),
            y: from_fixed(r.read_i32()?),
            character_type: r.read_string()?,
        };
        finish(&r)?;
        Ok(data)
    }
}

/// A client's own character as it reports it to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientCharacterData {
    pub player_id: PlayerId,
    pub world_name: String,
    pub x: f32,
    pub y: f32,
}

impl ClientCharacterData {
    pub fn to_blob(&self) -> Vec<u8> {
        let mut w = PacketWriter::with_capacity(16 + self.world_name.len());
        w.write_u32(self.player_id.0);
        w.write_str(&self.world_name);
        w.write_i32(to_fixed(self.x));
        w.write_i32(to_fixed(self.y));
        w.into_bytes()
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self, WorldError> {
        let mut r = PacketReader::new(blob);
        let data = Self {
            player_id: PlayerId(r.read_u32()?),
            world_name: r.read_string()?,
            x: from_fixed(r.read_i32()?),
            y: from_fixed(r.read_i32()?),
        };
        finish(&r)?;
        Ok(data)
    }
}

// ---------------------------------------------------------------------------
// Character
// ---------------------------------------------------------------------------

/// A server-side character.
#[derive(Debug, Clone)]
pub struct Character {
    pub sync: EntitySync,
    pub x: f32,
    pub y: f32,
    pub character_type: String,
    pub appearance: Appearance,
    lerp_on_client: bool,
}

impl Character {
    /// A new character at `(x, y)`, owned by `player_id`.
    pub fn new(sync: EntitySync, x: f32, y: f32, character_type: impl Into<String>) -> Self {
        Self {
            sync,
            x,
            y,
            character_type: character_type.into(),
            appearance: Appearance::default(),
            lerp_on_client: true,
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.sync.player_id
    }

    pub fn entity_type(&self) -> EntityType {
        self.sync.entity_type
    }

    pub fn lerp_on_client(&self) -> bool {
        self.lerp_on_client
    }

    /// Makes the next broadcast tell clients to snap.
    pub fn set_lerp_on_client(&mut self, value: bool) {
        self.lerp_on_client = value;
    }

    pub fn data(&self) -> CharacterData {
        CharacterData {
            player_id: self.sync.player_id,
            lerp_on_client: self.lerp_on_client,
            x: self.x,
            y: self.y,
            character_type: self.character_type.clone(),
        }
    }

    /// Finishes a broadcast: resets the entity counters and re-arms
    /// interpolation.
    pub fn after_broadcast(&mut self) {
        self.sync.after_broadcast();
        self.lerp_on_client = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_blob_layout_is_fixed_point() {
        let data = CharacterData {
            player_id: PlayerId(7),
            lerp_on_client: false,
            x: 1.5,
            y: -2.0,
            character_type: "farmer".into(),
        };
        let blob = data.to_blob();
        assert_eq!(&blob[..4], &7u32.to_be_bytes());
        assert_eq!(blob[4], 0);
        assert_eq!(&blob[5..9], &15_000i32.to_be_bytes());
        assert_eq!(&blob[9..13], &(-20_000i32).to_be_bytes());
        assert_eq!(&blob[13..17], &6u32.to_be_bytes());
        assert_eq!(&blob[17..], b"farmer");
    }

    #[test]
    fn test_character_blob_round_trips() {
        let data = CharacterData {
            player_id: PlayerId(2),
            lerp_on_client: true,
            x: 12.25,
            y: 0.5,
            character_type: "cow".into(),
        };
        assert_eq!(CharacterData::from_blob(&data.to_blob()).unwrap(), data);
    }

    #[test]
    fn test_character_blob_truncated_errors() {
        let blob = CharacterData {
            player_id: PlayerId(2),
            lerp_on_client: true,
            x: 0.0,
            y: 0.0,
            character_type: "cow".into(),
        }
        .to_blob();
        assert!(CharacterData::from_blob(&blob[..10]).is_err());
    }

    #[test]
    fn test_character_blob_trailing_bytes_error() {
        let mut blob = CharacterData {
            player_id: PlayerId(2),
            lerp_on_client: true,
            x: 0.0,
            y: 0.0,
            character_type: String::new(),
        }
        .to_blob();
        blob.push(9);
        assert!(CharacterData::from_blob(&blob).is_err());
    }

    #[test]
    fn test_client_blob_round_trips() {
        let data = ClientCharacterData {
            player_id: PlayerId(3),
            world_name: "farm".into(),
            x: 4.0,
            y: 8.5,
        };
        assert_eq!(ClientCharacterData::from_blob(&data.to_blob()).unwrap(), data);
    }

    #[test]
    fn test_after_broadcast_rearms_lerp() {
        let mut c = Character::new(
            EntitySync::new(EntityType::Character, PlayerId(1), 50),
            0.0,
            0.0,
            "farmer",
        );
        c.set_lerp_on_client(false);
        assert!(!c.data().lerp_on_client);
        c.after_broadcast();
        assert!(c.lerp_on_client());
        assert!(!c.sync.force_send_to_owner());
    }
}
