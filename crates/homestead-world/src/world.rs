//! A server-side world: its islands, characters and member players.
//!
//! The world is owned by the simulation thread. It never touches sockets;
//! everything it sends goes through its [`PacketSink`].

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use homestead_protocol::{
    ClientServerChatboxMessage, ClientServerEntityUpdate, EntityId, EntityType, Packet,
    PlayerId, ServerClientCharacterSetDetails, ServerClientChatboxMessage,
    ServerClientEntityUpdate, ServerClientLoadWorld, ServerClientPlayerJoinedWorld,
    ServerClientPlayerLeftWorld, ServerClientRemoveEntityFromWorld,
};
use homestead_session::Player;
use homestead_tick::GameClock;
use homestead_transport::{ConnectionId, MAX_DATAGRAM_SIZE, SendTarget};
use tracing::{debug, info, trace, warn};

use crate::{
    Character, ClientCharacterData, EntitySync, Island, PacketSink, SpawnPoint, SyncConfig,
    WorldConfig, WorldError, serialize_change_logs,
};

/// Character type given to player characters.
pub const PLAYER_CHARACTER_TYPE: &str = "player";

/// Username on chat lines the server generates.
pub const SYSTEM_USERNAME: &str = "System";

/// A player who is in this world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub player_id: PlayerId,
    pub username: String,
    pub connection_id: ConnectionId,
    pub datagram_addr: Option<SocketAddr>,
    /// The character this player controls.
    pub character: EntityId,
}

/// Sends `packet` to every member except `except`.
///
/// Vital (or forced) packets go on the member's stream; the rest go to
/// the member's datagram address and are skipped for members who have
/// none yet. Send errors are logged and dropped.
fn send_to_members(
    members: &BTreeMap<PlayerId, Member>,
    sink: &dyn PacketSink,
    packet: &Packet,
    except: Option<PlayerId>,
    delay_ms: u64,
    force_vital: bool,
) {
    let reliable = packet.is_vital() || force_vital || !fits_datagram(packet);
    for member in members.values() {
        if Some(member.player_id) == except {
            continue;
        }
        let target = if reliable {
            SendTarget::Reliable(member.connection_id)
        } else if let Some(addr) = member.datagram_addr {
            SendTarget::Datagram(addr)
        } else {
            trace!(player_id = %member.player_id, kind = %packet.kind(), "no datagram address yet, skipping");
            continue;
        };
        if let Err(e) = sink.send(target, packet, delay_ms) {
            warn!(player_id = %member.player_id, kind = %packet.kind(), error = %e, "send failed");
        }
    }
}

/// Whether `packet` can travel as a single datagram. Anything larger goes
/// on the stream instead of being dropped by the send worker.
fn fits_datagram(packet: &Packet) -> bool {
    match packet.encode() {
        Ok(frame) if frame.len() <= MAX_DATAGRAM_SIZE => true,
        Ok(frame) => {
            debug!(kind = %packet.kind(), len = frame.len(), "too large for a datagram, using the stream");
            false
        }
        Err(_) => true,
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// One named world.
pub struct World {
    name: String,
    spawn: SpawnPoint,
    sync_config: SyncConfig,
    islands: Vec<Island>,
    /// The entity whose broadcasts carry the change logs.
    world_entity: EntitySync,
    characters: BTreeMap<EntityId, Character>,
    members: BTreeMap<PlayerId, Member>,
    sink: Arc<dyn PacketSink>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("name", &self.name)
            .field("islands", &self.islands.len())
            .field("characters", &self.characters.len())
            .field("members", &self.members.len())
            .finish()
    }
}

impl World {
    pub fn new(config: &WorldConfig, sync_config: SyncConfig, sink: Arc<dyn PacketSink>) -> Self {
        let sync_config = sync_config.validated();
        let islands = config
            .islands
            .iter()
            .enumerate()
            .map(|(i, c)| Island::new(i, c))
            .collect();
        let world_entity =
            EntitySync::new(EntityType::World, PlayerId::NONE, sync_config.world_broadcast_ms);

        info!(world = %config.name, islands = config.islands.len(), "world loaded");

        Self {
            name: config.name.clone(),
            spawn: config.spawn,
            sync_config,
            islands,
            world_entity,
            characters: BTreeMap::new(),
            members: BTreeMap::new(),
            sink,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // -----------------------------------------------------------------
    // Sending
    // -----------------------------------------------------------------

    /// Sends to every member except `except`, on the channel the packet's
    /// vitality (or `force_vital`) selects.
    pub fn send_to_all(
        &self,
        packet: &Packet,
        except: Option<PlayerId>,
        delay_ms: u64,
        force_vital: bool,
    ) {
        send_to_members(&self.members, self.sink.as_ref(), packet, except, delay_ms, force_vital);
    }

    /// Relays a chat line to every member except `except`.
    pub fn broadcast_chat(&self, message: &str, username: &str, except: Option<PlayerId>) {
        let packet: Packet = ServerClientChatboxMessage {
            username: username.to_owned(),
            message: message.to_owned(),
            server_time: epoch_millis(),
        }
        .into();
        self.send_to_all(&packet, except, 0, false);
    }

    pub fn broadcast_system_message(&self, message: &str, except: Option<PlayerId>) {
        self.broadcast_chat(message, SYSTEM_USERNAME, except);
    }

    fn send_character_details(&self, entity_id: EntityId) {
        let Some(character) = self.characters.get(&entity_id) else {
            return;
        };
        let packet: Packet = ServerClientCharacterSetDetails {
            entity_id,
            world_name: self.name.clone(),
            appearance: character.appearance.clone(),
        }
        .into();
        self.send_to_all(&packet, None, 0, false);
    }

    // -----------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------

    /// Places a player in this world.
    ///
    /// Spawns the player's character (reusing `entity_id` if given), tells
    /// the players already here about it, then sends the newcomer
    /// LoadWorld. Returns the character's entity id.
    ///
    /// # Errors
    /// [`WorldError::PlayerAlreadyInWorld`] if the player is a member.
    pub fn add_player(
        &mut self,
        player: &Player,
        entity_id: Option<EntityId>,
    ) -> Result<EntityId, WorldError> {
        if self.members.contains_key(&player.player_id) {
            return Err(WorldError::PlayerAlreadyInWorld {
                player_id: player.player_id,
                world: self.name.clone(),
            });
        }

        let interval = self.sync_config.character_broadcast_ms;
        let sync = match entity_id {
            Some(id) => EntitySync::with_id(id, EntityType::Character, player.player_id, interval),
            None => EntitySync::new(EntityType::Character, player.player_id, interval),
        };
        let character_id = self.insert_character(Character::new(
            sync,
            self.spawn.x,
            self.spawn.y,
            PLAYER_CHARACTER_TYPE,
        ));

        self.members.insert(
            player.player_id,
            Member {
                player_id: player.player_id,
                username: player.username.clone(),
                connection_id: player.connection_id,
                datagram_addr: player.datagram_addr,
                character: character_id,
            },
        );

        // LoadWorld must reach the client before any entity of this world.
        let load: Packet = ServerClientLoadWorld {
            world_to_load: self.name.clone(),
        }
        .into();
        if let Err(e) = self
            .sink
            .send(SendTarget::Reliable(player.connection_id), &load, 0)
        {
            warn!(player_id = %player.player_id, error = %e, "failed to send LoadWorld");
        }

        info!(player_id = %player.player_id, entity_id = %character_id, world = %self.name, "player added to world");
        Ok(character_id)
    }

    /// Adds a character nobody controls. Returns its entity id.
    pub fn add_character(&mut self, x: f32, y: f32, character_type: &str) -> EntityId {
        let sync = EntitySync::new(
            EntityType::Character,
            PlayerId::NONE,
            self.sync_config.character_broadcast_ms,
        );
        self.insert_character(Character::new(sync, x, y, character_type))
    }

    fn insert_character(&mut self, character: Character) -> EntityId {
        let entity_id = character.sync.entity_id;
        self.characters.insert(entity_id, character);
        self.send_character_details(entity_id);
        entity_id
    }

    /// Takes a player out of this world and removes their character.
    ///
    /// # Errors
    /// [`WorldError::PlayerNotInWorld`] if the player isn't a member.
    pub fn remove_player(&mut self, player_id: PlayerId) -> Result<Member, WorldError> {
        let member = self
            .members
            .remove(&player_id)
            .ok_or(WorldError::PlayerNotInWorld(player_id))?;

        let left: Packet = ServerClientPlayerLeftWorld {
            player_id,
            world_name: self.name.clone(),
        }
        .into();
        self.send_to_all(&left, Some(player_id), 0, false);
        self.broadcast_system_message(
            &format!("Player `{}` has left this world.", member.username),
            Some(player_id),
        );

        if let Err(e) = self.remove_entity(member.character) {
            warn!(%player_id, error = %e, "player had no character to remove");
        }

        info!(%player_id, world = %self.name, "player removed from world");
        Ok(member)
    }

    /// Removes an entity and tells every member, twice.
    ///
    /// The second notice goes out after `remove_resend_delay_ms`, so a
    /// client that recreates the entity from a late datagram update still
    /// ends up without it.
    ///
    /// # Errors
    /// [`WorldError::EntityNotFound`] if the entity isn't here.
    pub fn remove_entity(&mut self, entity_id: EntityId) -> Result<(), WorldError> {
        self.characters
            .remove(&entity_id)
            .ok_or(WorldError::EntityNotFound(entity_id))?;

        let packet: Packet = ServerClientRemoveEntityFromWorld {
            entity_id,
            world_name: self.name.clone(),
        }
        .into();
        self.send_to_all(&packet, None, 0, false);
        self.send_to_all(&packet, None, self.sync_config.remove_resend_delay_ms, false);

        debug!(%entity_id, world = %self.name, "entity removed");
        Ok(())
    }

    /// Records a player's new datagram address.
    pub fn set_datagram_addr(&mut self, player_id: PlayerId, addr: SocketAddr) -> Result<(), WorldError> {
        let member = self
            .members
            .get_mut(&player_id)
            .ok_or(WorldError::PlayerNotInWorld(player_id))?;
        member.datagram_addr = Some(addr);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Inbound packets
    // -----------------------------------------------------------------

    /// Applies a packet from a member.
    ///
    /// # Errors
    /// Whatever the specific handler returns. Nothing here is fatal for
    /// the connection.
    pub fn handle_packet(&mut self, player_id: PlayerId, packet: &Packet) -> Result<(), WorldError> {
        match packet {
            Packet::WorldLoaded(_) => self.handle_world_loaded(player_id),
            Packet::ClientEntityUpdate(update) => {
                self.handle_entity_update(player_id, update).map(|_| ())
            }
            Packet::ClientChat(chat) => self.handle_chat(player_id, chat),
            other => {
                debug!(%player_id, kind = %other.kind(), world = %self.name, "packet not handled by world");
                Ok(())
            }
        }
    }

    /// The client has loaded this world.
    ///
    /// Announces the player, makes the next broadcast of their character
    /// reach them reliably and without interpolation, and sends the
    /// details of every character here.
    pub fn handle_world_loaded(&mut self, player_id: PlayerId) -> Result<(), WorldError> {
        let member = self
            .members
            .get(&player_id)
            .ok_or(WorldError::PlayerNotInWorld(player_id))?;
        let username = member.username.clone();
        let character_id = member.character;

        info!(%player_id, world = %self.name, "player loaded world");

        let joined: Packet = ServerClientPlayerJoinedWorld {
            player_id,
            world_name: self.name.clone(),
        }
        .into();
        self.send_to_all(&joined, None, 0, false);

        if let Some(character) = self.characters.get_mut(&character_id) {
            character.sync.set_force_send_to_owner(true);
            character.set_lerp_on_client(false);
        }

        let ids: Vec<EntityId> = self.characters.keys().copied().collect();
        for entity_id in ids {
            self.send_character_details(entity_id);
        }

        self.broadcast_system_message(
            &format!("Player `{username}` has joined this world."),
            Some(player_id),
        );
        Ok(())
    }

    /// Applies a client's update of its own character.
    ///
    /// Returns `Ok(true)` if the update was applied and `Ok(false)` if it
    /// was stale or from a world the player has left.
    ///
    /// # Errors
    /// - [`WorldError::PlayerNotInWorld`] for non-members
    /// - [`WorldError::NotOwner`] when the entity isn't the player's
    /// - [`WorldError::MalformedData`] / [`WorldError::TrailingData`] for
    ///   a bad blob
    pub fn handle_entity_update(
        &mut self,
        player_id: PlayerId,
        update: &ClientServerEntityUpdate,
    ) -> Result<bool, WorldError> {
        let member = self
            .members
            .get(&player_id)
            .ok_or(WorldError::PlayerNotInWorld(player_id))?;
        if update.entity_id != member.character {
            return Err(WorldError::NotOwner {
                player_id,
                entity_id: update.entity_id,
            });
        }

        let data = ClientCharacterData::from_blob(&update.data)?;
        if data.world_name != self.name {
            trace!(%player_id, from = %data.world_name, world = %self.name, "update from another world dropped");
            return Ok(false);
        }

        let character = self
            .characters
            .get_mut(&update.entity_id)
            .ok_or(WorldError::EntityNotFound(update.entity_id))?;
        if !character.sync.accept_update(update.time_of_update) {
            trace!(%player_id, entity_id = %update.entity_id, time = update.time_of_update, "stale update dropped");
            return Ok(false);
        }
        character.x = data.x;
        character.y = data.y;
        Ok(true)
    }

    pub fn handle_chat(
        &mut self,
        player_id: PlayerId,
        chat: &ClientServerChatboxMessage,
    ) -> Result<(), WorldError> {
        let member = self
            .members
            .get(&player_id)
            .ok_or(WorldError::PlayerNotInWorld(player_id))?;
        self.broadcast_chat(&chat.message, &member.username, Some(player_id));
        Ok(())
    }

    // -----------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------

    /// Ticks every entity and broadcasts the ones that are due, stamped
    /// with the clock's total time.
    pub fn tick(&mut self, clock: &GameClock) {
        let frame_us = clock.frame_us();
        let now = clock.total_us();
        let sink = self.sink.as_ref();

        self.world_entity.tick(frame_us);
        if self.world_entity.is_broadcast_due() {
            let packet: Packet = ServerClientEntityUpdate {
                entity_id: self.world_entity.entity_id,
                player_id: PlayerId::NONE,
                world_name: self.name.clone(),
                time_of_update: now,
                entity_type: EntityType::World,
                data: serialize_change_logs(&self.islands),
            }
            .into();
            send_to_members(
                &self.members,
                sink,
                &packet,
                None,
                0,
                self.world_entity.force_send_to_owner(),
            );
            self.world_entity.after_broadcast();
        }

        for character in self.characters.values_mut() {
            character.sync.tick(frame_us);
            if !character.sync.is_broadcast_due() {
                continue;
            }
            let packet: Packet = ServerClientEntityUpdate {
                entity_id: character.sync.entity_id,
                player_id: character.player_id(),
                world_name: self.name.clone(),
                time_of_update: now,
                entity_type: character.entity_type(),
                data: character.data().to_blob(),
            }
            .into();
            send_to_members(
                &self.members,
                sink,
                &packet,
                character.sync.excluded_player(),
                0,
                character.sync.force_send_to_owner(),
            );
            character.after_broadcast();
        }
    }

    // -----------------------------------------------------------------
    // Tiles
    // -----------------------------------------------------------------

    /// Writes a tile on one island and logs the change. Returns the
    /// timestamp logged, see [`Island::set_plot`].
    ///
    /// # Errors
    /// [`WorldError::IslandNotFound`] or [`WorldError::TileOutOfBounds`].
    pub fn set_plot(
        &mut self,
        island: usize,
        layer: usize,
        x: u32,
        y: u32,
        plot: u16,
        timestamp: u64,
    ) -> Result<u64, WorldError> {
        self.islands
            .get_mut(island)
            .ok_or(WorldError::IslandNotFound(island))?
            .set_plot(layer, x, y, plot, timestamp)
    }

    /// Every island's change log, serialized for clients.
    pub fn client_sync_data(&self) -> Vec<u8> {
        serialize_change_logs(&self.islands)
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    pub fn world_entity_id(&self) -> EntityId {
        self.world_entity.entity_id
    }

    pub fn member(&self, player_id: PlayerId) -> Option<&Member> {
        self.members.get(&player_id)
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn player_count(&self) -> usize {
        self.members.len()
    }

    pub fn contains_player(&self, player_id: PlayerId) -> bool {
        self.members.contains_key(&player_id)
    }

    pub fn character(&self, entity_id: EntityId) -> Option<&Character> {
        self.characters.get(&entity_id)
    }

    pub fn character_mut(&mut self, entity_id: EntityId) -> Option<&mut Character> {
        self.characters.get_mut(&entity_id)
    }

    /// The character a member controls.
    pub fn character_of(&self, player_id: PlayerId) -> Option<&Character> {
        let member = self.members.get(&player_id)?;
        self.characters.get(&member.character)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }
}
