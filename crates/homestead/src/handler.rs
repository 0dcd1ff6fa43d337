//! Server-side packet routing: login, datagram linking and hand-off to
//! worlds.
//!
//! The flow for one player is:
//!   1. RequestHashedPassword → SendHashedPassword (empty for new users)
//!   2. Authenticate → SetPlayerDetails; the player is now logged in
//!   3. TestUdp (repeated by the client) → the first one links the
//!      datagram address and places the player in a world (LoadWorld)
//!   4. Everything else → the player's world

use std::net::SocketAddr;
use std::sync::Arc;

use homestead_protocol::{
    ClientServerPlayerAuthenticate, ClientServerRequestHashedPassword, EntityId, Packet,
    PlayerId, ServerClientSendHashedPassword, ServerClientSetPlayerDetails,
};
use homestead_session::{
    ConnectionHandler, CredentialStore, PacketSource, PlayerDirectory, SessionError,
};
use homestead_tick::GameClock;
use homestead_transport::{ConnectionId, SendTarget};
use homestead_world::{PacketSink, WorldError, WorldManager};
use tracing::{debug, info, trace, warn};

use crate::HomesteadError;

/// Simulation-side state of a server: who is connected and which world
/// they are in.
pub struct ServerHandler {
    players: PlayerDirectory,
    worlds: WorldManager,
    credentials: Arc<dyn CredentialStore>,
    sink: Arc<dyn PacketSink>,
}

impl std::fmt::Debug for ServerHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandler")
            .field("players", &self.players.authenticated_count())
            .field("worlds", &self.worlds)
            .finish()
    }
}

impl ServerHandler {
    /// `sink` must be the same sink `worlds` sends through.
    pub fn new(
        worlds: WorldManager,
        credentials: Arc<dyn CredentialStore>,
        sink: Arc<dyn PacketSink>,
    ) -> Self {
        Self {
            players: PlayerDirectory::new(),
            worlds,
            credentials,
            sink,
        }
    }

    pub fn players(&self) -> &PlayerDirectory {
        &self.players
    }

    pub fn worlds(&self) -> &WorldManager {
        &self.worlds
    }

    pub fn worlds_mut(&mut self) -> &mut WorldManager {
        &mut self.worlds
    }

    /// Ticks every world.
    pub fn tick(&mut self, clock: &GameClock) {
        self.worlds.tick(clock);
    }

    /// Moves a logged-in player to another world and remembers it as
    /// their current world.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] for unknown players, plus anything
    /// [`WorldManager::transfer_player`] returns.
    pub fn transfer_player(
        &mut self,
        player_id: PlayerId,
        destination: &str,
    ) -> Result<EntityId, HomesteadError> {
        let player = self
            .players
            .get(player_id)
            .cloned()
            .ok_or(SessionError::NotFound(player_id))?;
        let entity_id = self.worlds.transfer_player(&player, destination)?;
        self.players
            .set_current_world(player_id, Some(destination.to_owned()))?;
        self.credentials.set_current_world(player_id, destination);
        Ok(entity_id)
    }

    fn reply(&self, connection_id: ConnectionId, packet: impl Into<Packet>) {
        let packet = packet.into();
        if let Err(e) = self
            .sink
            .send(SendTarget::Reliable(connection_id), &packet, 0)
        {
            warn!(%connection_id, kind = %packet.kind(), error = %e, "reply failed");
        }
    }

    fn handle_request_hashed_password(
        &self,
        connection_id: ConnectionId,
        request: ClientServerRequestHashedPassword,
    ) {
        let hashed_password = self
            .credentials
            .hashed_password(&request.user_name)
            .unwrap_or_default();
        debug!(%connection_id, username = %request.user_name, known = !hashed_password.is_empty(), "hashed password requested");
        self.reply(
            connection_id,
            ServerClientSendHashedPassword {
                user_name: request.user_name,
                hashed_password,
            },
        );
    }

    fn handle_authenticate(
        &mut self,
        connection_id: ConnectionId,
        auth: ClientServerPlayerAuthenticate,
    ) {
        let player_id = match self
            .credentials
            .login(&auth.user_name, &auth.hashed_password)
        {
            Ok(player_id) => player_id,
            Err(e) => {
                warn!(%connection_id, username = %auth.user_name, error = %e, "login refused");
                return;
            }
        };
        if let Err(e) = self
            .players
            .authenticate(connection_id, player_id, &auth.user_name)
        {
            warn!(%connection_id, %player_id, error = %e, "login refused");
            return;
        }
        self.reply(connection_id, ServerClientSetPlayerDetails { player_id });
    }

    fn handle_test_udp(&mut self, player_id: PlayerId, source: PacketSource) {
        let PacketSource::Datagram(addr) = source else {
            debug!(%player_id, "test datagram arrived on the stream, ignored");
            return;
        };
        let changed = match self.players.link_datagram(player_id, addr) {
            Ok(changed) => changed,
            Err(e) => {
                debug!(%player_id, error = %e, "test datagram from unknown player");
                return;
            }
        };

        if self.worlds.player_world(player_id).is_some() {
            if changed {
                self.worlds.set_datagram_addr(player_id, addr);
            }
            trace!(%player_id, "repeated test datagram");
            return;
        }
        self.place_player(player_id, addr);
    }

    /// Puts a player whose datagram channel works into their last world,
    /// or the starting world.
    fn place_player(&mut self, player_id: PlayerId, addr: SocketAddr) {
        let Some(player) = self.players.get(player_id).cloned() else {
            return;
        };
        let preferred = self.credentials.current_world(player_id);
        match self.worlds.add_player(&player, preferred.as_deref()) {
            Ok((world, entity_id)) => {
                info!(%player_id, %entity_id, %addr, world = %world, "player entered world");
                self.credentials.set_current_world(player_id, &world);
                if let Err(e) = self.players.set_current_world(player_id, Some(world)) {
                    warn!(%player_id, error = %e, "failed to record current world");
                }
            }
            Err(e) => warn!(%player_id, error = %e, "failed to place player in a world"),
        }
    }

    fn route_to_world(&mut self, player_id: PlayerId, packet: &Packet) {
        match self.worlds.route_packet(player_id, packet) {
            Ok(()) => {}
            Err(e @ WorldError::NotOwner { .. }) => {
                warn!(%player_id, error = %e, "update for another player's entity dropped");
            }
            Err(e) => debug!(%player_id, kind = %packet.kind(), error = %e, "packet not applied"),
        }
    }
}

impl ConnectionHandler for ServerHandler {
    fn on_client_add(&mut self, connection_id: ConnectionId, peer: SocketAddr) {
        debug!(%connection_id, %peer, "awaiting login");
        self.players.add_unauthenticated(connection_id);
    }

    fn on_client_remove(&mut self, connection_id: ConnectionId) {
        let Some(player) = self.players.remove_by_connection(connection_id) else {
            return;
        };
        if !player.is_authenticated() {
            debug!(%connection_id, "connection closed before login");
            return;
        }
        match self.worlds.remove_player(player.player_id) {
            Ok(_) | Err(WorldError::PlayerNotInWorld(_)) => {}
            Err(e) => warn!(player_id = %player.player_id, error = %e, "failed to remove player from world"),
        }
        info!(%connection_id, player_id = %player.player_id, username = %player.username, "player disconnected");
    }

    fn on_receive_packet(&mut self, packet: Packet, source: PacketSource) {
        let Some(player) = self.players.find_sender(&packet, source) else {
            debug!(?source, kind = %packet.kind(), "packet from unknown sender dropped");
            return;
        };
        let connection_id = player.connection_id;
        let player_id = player.player_id;
        let authenticated = player.is_authenticated();

        match packet {
            Packet::RequestHashedPassword(request) => {
                self.handle_request_hashed_password(connection_id, request);
            }
            Packet::Authenticate(_) if authenticated => {
                debug!(%player_id, "already logged in, login ignored");
            }
            Packet::Authenticate(auth) => self.handle_authenticate(connection_id, auth),
            _ if !authenticated => {
                debug!(%connection_id, kind = %packet.kind(), "packet before login dropped");
            }
            Packet::TestUdp(_) => self.handle_test_udp(player_id, source),
            other => self.route_to_world(player_id, &other),
        }
    }
}
