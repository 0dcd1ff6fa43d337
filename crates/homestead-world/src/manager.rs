//! World manager: owns every world and knows which player is in which.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;

use homestead_protocol::{EntityId, Packet, PlayerId};
use homestead_session::Player;
use homestead_tick::GameClock;

use crate::{Member, PacketSink, SyncConfig, World, WorldConfig, WorldError};

/// Manages all worlds and tracks which player is in which world.
///
/// A player is in at most one world at a time.
#[derive(Debug)]
pub struct WorldManager {
    worlds: BTreeMap<String, World>,
    player_worlds: HashMap<PlayerId, String>,
    starting_world: String,
}

impl WorldManager {
    /// Loads every configured world.
    ///
    /// # Errors
    /// - [`WorldError::DuplicateWorld`] if two configs share a name
    /// - [`WorldError::WorldNotFound`] if `starting_world` isn't among them
    pub fn new(
        configs: &[WorldConfig],
        starting_world: &str,
        sync_config: SyncConfig,
        sink: Arc<dyn PacketSink>,
    ) -> Result<Self, WorldError> {
        let mut worlds = BTreeMap::new();
        for config in configs {
            if worlds.contains_key(&config.name) {
                return Err(WorldError::DuplicateWorld(config.name.clone()));
            }
            let world = World::new(config, sync_config.clone(), Arc::clone(&sink));
            worlds.insert(config.name.clone(), world);
        }
        if !worlds.contains_key(starting_world) {
            return Err(WorldError::WorldNotFound(starting_world.to_owned()));
        }

        Ok(Self {
            worlds,
            player_worlds: HashMap::new(),
            starting_world: starting_world.to_owned(),
        })
    }

    pub fn starting_world(&self) -> &str {
        &self.starting_world
    }

    /// Puts a player in `preferred` if that world exists, otherwise in the
    /// starting world. Returns the world name and the character's id.
    ///
    /// # Errors
    /// [`WorldError::PlayerAlreadyInWorld`] if the player is in a world.
    pub fn add_player(
        &mut self,
        player: &Player,
        preferred: Option<&str>,
    ) -> Result<(String, EntityId), WorldError> {
        if let Some(current) = self.player_worlds.get(&player.player_id) {
            return Err(WorldError::PlayerAlreadyInWorld {
                player_id: player.player_id,
                world: current.clone(),
            });
        }

        let name = match preferred {
            Some(name) if self.worlds.contains_key(name) => name.to_owned(),
            Some(name) => {
                tracing::warn!(player_id = %player.player_id, world = name, "saved world missing, using starting world");
                self.starting_world.clone()
            }
            None => self.starting_world.clone(),
        };

        let entity_id = self.add_to_world(player, &name, None)?;
        Ok((name, entity_id))
    }

    fn add_to_world(
        &mut self,
        player: &Player,
        name: &str,
        entity_id: Option<EntityId>,
    ) -> Result<EntityId, WorldError> {
        let world = self
            .worlds
            .get_mut(name)
            .ok_or_else(|| WorldError::WorldNotFound(name.to_owned()))?;
        let entity_id = world.add_player(player, entity_id)?;
        self.player_worlds.insert(player.player_id, name.to_owned());
        Ok(entity_id)
    }

    /// Moves a player to another world, keeping their character's id.
    ///
    /// # Errors
    /// - [`WorldError::WorldNotFound`] if `destination` doesn't exist (the
    ///   player stays where they are)
    /// - [`WorldError::PlayerNotInWorld`] if the player isn't in a world
    pub fn transfer_player(&mut self, player: &Player, destination: &str) -> Result<EntityId, WorldError> {
        if !self.worlds.contains_key(destination) {
            return Err(WorldError::WorldNotFound(destination.to_owned()));
        }
        let member = self.remove_player(player.player_id)?;
        let entity_id = self.add_to_world(player, destination, Some(member.character))?;
        tracing::info!(player_id = %player.player_id, world = destination, "player transferred");
        Ok(entity_id)
    }

    /// Takes a player out of whichever world they are in.
    ///
    /// # Errors
    /// [`WorldError::PlayerNotInWorld`] if they aren't in one.
    pub fn remove_player(&mut self, player_id: PlayerId) -> Result<Member, WorldError> {
        let name = self
            .player_worlds
            .remove(&player_id)
            .ok_or(WorldError::PlayerNotInWorld(player_id))?;
        let world = self
            .worlds
            .get_mut(&name)
            .ok_or(WorldError::WorldNotFound(name))?;
        world.remove_player(player_id)
    }

    /// Forwards a packet to the sender's world.
    ///
    /// # Errors
    /// [`WorldError::PlayerNotInWorld`] if the player isn't in a world,
    /// plus whatever the world's handler returns.
    pub fn route_packet(&mut self, player_id: PlayerId, packet: &Packet) -> Result<(), WorldError> {
        self.world_of_mut(player_id)
            .ok_or(WorldError::PlayerNotInWorld(player_id))?
            .handle_packet(player_id, packet)
    }

    /// Updates a player's datagram address in their world, if they are in
    /// one.
    pub fn set_datagram_addr(&mut self, player_id: PlayerId, addr: SocketAddr) {
        if let Some(world) = self.world_of_mut(player_id) {
            // Membership was just checked through the index.
            let _ = world.set_datagram_addr(player_id, addr);
        }
    }

    /// Ticks every world.
    pub fn tick(&mut self, clock: &GameClock) {
        for world in self.worlds.values_mut() {
            world.tick(clock);
        }
    }

    pub fn world(&self, name: &str) -> Option<&World> {
        self.worlds.get(name)
    }

    pub fn world_mut(&mut self, name: &str) -> Option<&mut World> {
        self.worlds.get_mut(name)
    }

    /// Name of the world a player is in.
    pub fn player_world(&self, player_id: PlayerId) -> Option<&str> {
        self.player_worlds.get(&player_id).map(String::as_str)
    }

    pub fn world_of(&self, player_id: PlayerId) -> Option<&World> {
        self.worlds.get(self.player_worlds.get(&player_id)?)
    }

    fn world_of_mut(&mut self, player_id: PlayerId) -> Option<&mut World> {
        let name = self.player_worlds.get(&player_id)?;
        self.worlds.get_mut(name)
    }

    pub fn world_count(&self) -> usize {
        self.worlds.len()
    }

    pub fn world_names(&self) -> impl Iterator<Item = &str> {
        self.worlds.keys().map(String::as_str)
    }
}
