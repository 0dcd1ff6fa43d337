//! The client's replica of the world it has loaded.
//!
//! The replica only ever moves forward: every entity keeps the server
//! time of the newest update it applied and ignores anything not newer.
//! Characters snap into place on their first update and interpolate
//! afterwards, unless the server asks for a snap.

use std::collections::{BTreeMap, HashMap};

use homestead_protocol::{
    Appearance, EntityId, EntityType, Packet, PlayerId, ServerClientCharacterSetDetails,
    ServerClientChatboxMessage, ServerClientEntityUpdate, ServerClientRemoveEntityFromWorld,
};
use tracing::{debug, trace};

use crate::{CharacterData, ChangeLogReplica, LERP_DURATION_MS, PositionLerp, WorldError};

/// What an entity update did to the replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Applied, creating the entity if it was new.
    Applied,
    /// Not newer than what the replica has.
    Stale,
    /// Addressed to a different world.
    OtherWorld,
}

/// A character as the client sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaCharacter {
    pub entity_id: EntityId,
    pub player_id: PlayerId,
    pub character_type: String,
    pub appearance: Option<Appearance>,
    /// Server time of the newest applied update.
    pub last_update_time: u64,
    x: f32,
    y: f32,
    lerp: Option<PositionLerp>,
    has_received_first_data: bool,
}

impl ReplicaCharacter {
    fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            player_id: PlayerId::NONE,
            character_type: String::new(),
            appearance: None,
            last_update_time: 0,
            x: 0.0,
            y: 0.0,
            lerp: None,
            has_received_first_data: false,
        }
    }

    /// Current on-screen position.
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Where the character is heading, or its position if it is still.
    pub fn target(&self) -> (f32, f32) {
        self.lerp.map_or((self.x, self.y), |l| l.target())
    }

    pub fn is_interpolating(&self) -> bool {
        self.lerp.is_some()
    }

    fn apply(&mut self, data: CharacterData) {
        self.player_id = data.player_id;
        self.character_type = data.character_type;
        if self.has_received_first_data && data.lerp_on_client {
            self.lerp = Some(PositionLerp::new(
                (self.x, self.y),
                (data.x, data.y),
                LERP_DURATION_MS,
            ));
        } else {
            self.x = data.x;
            self.y = data.y;
            self.lerp = None;
        }
        self.has_received_first_data = true;
    }

    fn advance(&mut self, frame_ms: f32) {
        let Some(lerp) = self.lerp.as_mut() else {
            return;
        };
        let ((x, y), done) = lerp.advance(frame_ms);
        self.x = x;
        self.y = y;
        if done {
            self.lerp = None;
        }
    }
}

/// A client's copy of one world.
#[derive(Debug, Clone)]
pub struct ClientWorld {
    name: String,
    local_player: PlayerId,
    characters: BTreeMap<EntityId, ReplicaCharacter>,
    /// Details that arrived before their entity.
    pending_details: HashMap<EntityId, Appearance>,
    tiles: ChangeLogReplica,
    last_world_update: u64,
    chat: Vec<ServerClientChatboxMessage>,
}

impl ClientWorld {
    pub fn new(name: impl Into<String>, local_player: PlayerId) -> Self {
        Self {
            name: name.into(),
            local_player,
            characters: BTreeMap::new(),
            pending_details: HashMap::new(),
            tiles: ChangeLogReplica::new(),
            last_world_update: 0,
            chat: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies a server packet meant for the world.
    ///
    /// Packets that aren't world packets are ignored.
    ///
    /// # Errors
    /// See [`apply_entity_update`](Self::apply_entity_update).
    pub fn handle_packet(&mut self, packet: &Packet) -> Result<(), WorldError> {
        match packet {
            Packet::EntityUpdate(update) => self.apply_entity_update(update).map(|_| ()),
            Packet::RemoveEntity(remove) => {
                self.remove_entity(remove);
                Ok(())
            }
            Packet::CharacterSetDetails(details) => {
                self.set_character_details(details);
                Ok(())
            }
            Packet::ServerChat(chat) => {
                self.chat.push(chat.clone());
                Ok(())
            }
            Packet::PlayerJoinedWorld(joined) if joined.world_name == self.name => {
                debug!(player_id = %joined.player_id, world = %self.name, "player joined");
                Ok(())
            }
            Packet::PlayerLeftWorld(left) if left.world_name == self.name => {
                debug!(player_id = %left.player_id, world = %self.name, "player left");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Applies an authoritative entity update.
    ///
    /// World entities carry the change logs; Character entities are
    /// created on their first update.
    ///
    /// # Errors
    /// - [`WorldError::UnsupportedEntityType`] for an unknown new entity
    /// - [`WorldError::MalformedData`] / [`WorldError::TrailingData`] for a
    ///   bad blob (the replica is left unchanged)
    pub fn apply_entity_update(
        &mut self,
        update: &ServerClientEntityUpdate,
    ) -> Result<UpdateOutcome, WorldError> {
        if update.world_name != self.name {
            trace!(entity_id = %update.entity_id, world = %update.world_name, "update for another world ignored");
            return Ok(UpdateOutcome::OtherWorld);
        }

        match update.entity_type {
            EntityType::World => {
                if update.time_of_update <= self.last_world_update {
                    return Ok(UpdateOutcome::Stale);
                }
                self.tiles.apply(&update.data)?;
                self.last_world_update = update.time_of_update;
                Ok(UpdateOutcome::Applied)
            }
            EntityType::Character => self.apply_character_update(update),
            EntityType::Unknown => Err(WorldError::UnsupportedEntityType(EntityType::Unknown)),
        }
    }

    fn apply_character_update(
        &mut self,
        update: &ServerClientEntityUpdate,
    ) -> Result<UpdateOutcome, WorldError> {
        if let Some(existing) = self.characters.get(&update.entity_id) {
            if existing.last_update_time >= update.time_of_update {
                trace!(entity_id = %update.entity_id, time = update.time_of_update, "stale update dropped");
                return Ok(UpdateOutcome::Stale);
            }
        }
        let data = CharacterData::from_blob(&update.data)?;

        let character = self.characters.entry(update.entity_id).or_insert_with(|| {
            debug!(entity_id = %update.entity_id, "character created");
            ReplicaCharacter::new(update.entity_id)
        });
        character.last_update_time = update.time_of_update;
        character.apply(data);

        if let Some(appearance) = self.pending_details.remove(&update.entity_id) {
            character.appearance = Some(appearance);
        }
        Ok(UpdateOutcome::Applied)
    }

    /// Removes an entity. Returns `true` if it existed.
    pub fn remove_entity(&mut self, remove: &ServerClientRemoveEntityFromWorld) -> bool {
        if remove.world_name != self.name {
            return false;
        }
        self.pending_details.remove(&remove.entity_id);
        let removed = self.characters.remove(&remove.entity_id).is_some();
        if removed {
            debug!(entity_id = %remove.entity_id, world = %self.name, "entity removed");
        }
        removed
    }

    /// Sets a character's appearance, or keeps it until the character
    /// shows up.
    pub fn set_character_details(&mut self, details: &ServerClientCharacterSetDetails) {
        if details.world_name != self.name {
            return;
        }
        match self.characters.get_mut(&details.entity_id) {
            Some(character) => character.appearance = Some(details.appearance.clone()),
            None => {
                self.pending_details
                    .insert(details.entity_id, details.appearance.clone());
            }
        }
    }

    /// Advances every interpolation by one frame.
    pub fn tick(&mut self, frame_ms: f32) {
        for character in self.characters.values_mut() {
            character.advance(frame_ms);
        }
    }

    pub fn character(&self, entity_id: EntityId) -> Option<&ReplicaCharacter> {
        self.characters.get(&entity_id)
    }

    pub fn characters(&self) -> impl Iterator<Item = &ReplicaCharacter> {
        self.characters.values()
    }

    /// The character the local player controls, once the server has sent
    /// it.
    pub fn local_character(&self) -> Option<&ReplicaCharacter> {
        self.characters
            .values()
            .find(|c| c.player_id == self.local_player && c.player_id.is_player())
    }

    pub fn tiles(&self) -> &ChangeLogReplica {
        &self.tiles
    }

    /// Chat lines received so far.
    pub fn chat(&self) -> &[ServerClientChatboxMessage] {
        &self.chat
    }

    pub fn has_pending_details(&self, entity_id: EntityId) -> bool {
        self.pending_details.contains_key(&entity_id)
    }
}
