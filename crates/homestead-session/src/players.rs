//! Who is on the other end of each connection.
//!
//! A connection starts out as an unauthenticated player. After login it
//! moves to the authenticated set, keyed by player id. Reliable packets
//! are matched to a player through the connection they arrived on;
//! datagrams carry the player id in their payload instead.

use std::collections::HashMap;
use std::net::SocketAddr;

use homestead_protocol::{Packet, PlayerId};
use homestead_transport::ConnectionId;

use crate::{PacketSource, SessionError};

/// A connected player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub connection_id: ConnectionId,
    /// [`PlayerId::NONE`] until the player logs in.
    pub player_id: PlayerId,
    pub username: String,
    /// Set by the first test datagram from this player.
    pub datagram_addr: Option<SocketAddr>,
    pub current_world: Option<String>,
}

impl Player {
    fn unauthenticated(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            player_id: PlayerId::NONE,
            username: String::new(),
            datagram_addr: None,
            current_world: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.player_id.is_player()
    }
}

/// Unauthenticated and authenticated players.
#[derive(Debug, Default)]
pub struct PlayerDirectory {
    unauthenticated: HashMap<ConnectionId, Player>,
    authenticated: HashMap<PlayerId, Player>,
    by_connection: HashMap<ConnectionId, PlayerId>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a brand-new connection.
    pub fn add_unauthenticated(&mut self, connection_id: ConnectionId) {
        self.unauthenticated
            .insert(connection_id, Player::unauthenticated(connection_id));
    }

    /// Promotes a connection's player to the authenticated set.
    ///
    /// # Errors
    /// - [`SessionError::UnknownConnection`] if the connection has no
    ///   pending player
    /// - [`SessionError::AlreadyConnected`] if another connection is
    ///   already logged in as `player_id`
    pub fn authenticate(
        &mut self,
        connection_id: ConnectionId,
        player_id: PlayerId,
        username: &str,
    ) -> Result<&Player, SessionError> {
        if self.authenticated.contains_key(&player_id) {
            return Err(SessionError::AlreadyConnected(player_id));
        }
        let mut player = self
            .unauthenticated
            .remove(&connection_id)
            .ok_or(SessionError::UnknownConnection(connection_id))?;

        player.player_id = player_id;
        player.username = username.to_owned();
        self.by_connection.insert(connection_id, player_id);
        tracing::info!(%connection_id, %player_id, username, "player authenticated");

        Ok(self.authenticated.entry(player_id).or_insert(player))
    }

    /// Finds who sent `packet`.
    ///
    /// Vital packets arrive on a stream and are matched by connection,
    /// authenticated players first. Non-vital packets are matched by the
    /// player id they carry, against authenticated players only.
    pub fn find_sender(&self, packet: &Packet, source: PacketSource) -> Option<&Player> {
        if packet.is_vital() {
            let PacketSource::Reliable(connection_id) = source else {
                return None;
            };
            return self
                .by_connection(connection_id)
                .or_else(|| self.unauthenticated.get(&connection_id));
        }
        let player_id = packet.sender_player_id()?;
        self.authenticated.get(&player_id)
    }

    /// The authenticated player on this connection.
    pub fn by_connection(&self, connection_id: ConnectionId) -> Option<&Player> {
        let player_id = self.by_connection.get(&connection_id)?;
        self.authenticated.get(player_id)
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&Player> {
        self.authenticated.get(&player_id)
    }

    /// Records the datagram address of an authenticated player.
    ///
    /// Returns `true` only when the address changed. The client repeats its
    /// test datagram until it hears back, so repeats are expected.
    pub fn link_datagram(&mut self, player_id: PlayerId, addr: SocketAddr) -> Result<bool, SessionError> {
        let player = self
            .authenticated
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        if player.datagram_addr == Some(addr) {
            return Ok(false);
        }
        player.datagram_addr = Some(addr);
        tracing::debug!(%player_id, %addr, "datagram address linked");
        Ok(true)
    }

    pub fn set_current_world(&mut self, player_id: PlayerId, world: Option<String>) -> Result<(), SessionError> {
        let player = self
            .authenticated
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        player.current_world = world;
        Ok(())
    }

    /// Forgets whichever player was on this connection.
    pub fn remove_by_connection(&mut self, connection_id: ConnectionId) -> Option<Player> {
        if let Some(player) = self.unauthenticated.remove(&connection_id) {
            return Some(player);
        }
        let player_id = self.by_connection.remove(&connection_id)?;
        self.authenticated.remove(&player_id)
    }

    /// All logged-in players.
    pub fn authenticated(&self) -> impl Iterator<Item = &Player> {
        self.authenticated.values()
    }

    pub fn authenticated_count(&self) -> usize {
        self.authenticated.len()
    }

    pub fn unauthenticated_count(&self) -> usize {
        self.unauthenticated.len()
    }
}

#[cfg(test)]
mod tests {
    use homestead_protocol::{
        ClientServerChatboxMessage, ClientServerEntityUpdate, ClientServerTestUdp,
    };

    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn pid(id: u32) -> PlayerId {
        PlayerId(id)
    }

    fn chat() -> Packet {
        ClientServerChatboxMessage {
            message: "hi".into(),
        }
        .into()
    }

    fn test_udp_packet(player: u32) -> Packet {
        ClientServerTestUdp {
            player_id: pid(player),
        }
        .into()
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_authenticate_moves_player_to_authenticated() {
        let mut dir = PlayerDirectory::new();
        dir.add_unauthenticated(cid(1));
        let player = dir.authenticate(cid(1), pid(7), "alice").unwrap();
        assert_eq!(player.player_id, pid(7));
        assert_eq!(player.username, "alice");
        assert_eq!(dir.unauthenticated_count(), 0);
        assert_eq!(dir.authenticated_count(), 1);
    }

    #[test]
    fn test_authenticate_unknown_connection_errors() {
        let mut dir = PlayerDirectory::new();
        assert!(matches!(
            dir.authenticate(cid(1), pid(7), "alice"),
            Err(SessionError::UnknownConnection(_))
        ));
    }

    #[test]
    fn test_authenticate_same_player_twice_errors() {
        let mut dir = PlayerDirectory::new();
        dir.add_unauthenticated(cid(1));
        dir.add_unauthenticated(cid(2));
        dir.authenticate(cid(1), pid(7), "alice").unwrap();
        assert!(matches!(
            dir.authenticate(cid(2), pid(7), "alice"),
            Err(SessionError::AlreadyConnected(_))
        ));
        // The second connection stays unauthenticated.
        assert_eq!(dir.unauthenticated_count(), 1);
    }

    #[test]
    fn test_find_sender_vital_matches_connection() {
        let mut dir = PlayerDirectory::new();
        dir.add_unauthenticated(cid(1));
        dir.add_unauthenticated(cid(2));
        dir.authenticate(cid(2), pid(9), "bob").unwrap();

        let pending = dir.find_sender(&chat(), PacketSource::Reliable(cid(1))).unwrap();
        assert!(!pending.is_authenticated());

        let bob = dir.find_sender(&chat(), PacketSource::Reliable(cid(2))).unwrap();
        assert_eq!(bob.player_id, pid(9));
    }

    #[test]
    fn test_find_sender_non_vital_uses_player_id_in_packet() {
        let mut dir = PlayerDirectory::new();
        dir.add_unauthenticated(cid(1));
        dir.authenticate(cid(1), pid(4), "carol").unwrap();

        let source = PacketSource::Datagram(addr(5555));
        assert_eq!(dir.find_sender(&test_udp_packet(4), source).unwrap().player_id, pid(4));
        assert!(dir.find_sender(&test_udp_packet(5), source).is_none());

        let update: Packet = ClientServerEntityUpdate {
            player_id: pid(4),
            ..Default::default()
        }
        .into();
        assert!(dir.find_sender(&update, source).is_some());
    }

    #[test]
    fn test_find_sender_vital_over_datagram_is_rejected() {
        let mut dir = PlayerDirectory::new();
        dir.add_unauthenticated(cid(1));
        assert!(dir.find_sender(&chat(), PacketSource::Datagram(addr(1))).is_none());
    }

    #[test]
    fn test_link_datagram_only_reports_changes() {
        let mut dir = PlayerDirectory::new();
        dir.add_unauthenticated(cid(1));
        dir.authenticate(cid(1), pid(4), "carol").unwrap();

        assert!(dir.link_datagram(pid(4), addr(6000)).unwrap());
        assert!(!dir.link_datagram(pid(4), addr(6000)).unwrap());
        assert!(dir.link_datagram(pid(4), addr(6001)).unwrap());
        assert_eq!(dir.get(pid(4)).unwrap().datagram_addr, Some(addr(6001)));
    }

    #[test]
    fn test_link_datagram_unknown_player_errors() {
        let mut dir = PlayerDirectory::new();
        assert!(matches!(
            dir.link_datagram(pid(1), addr(1)),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_by_connection_handles_both_sets() {
        let mut dir = PlayerDirectory::new();
        dir.add_unauthenticated(cid(1));
        dir.add_unauthenticated(cid(2));
        dir.authenticate(cid(2), pid(3), "dave").unwrap();

        assert!(!dir.remove_by_connection(cid(1)).unwrap().is_authenticated());
        assert_eq!(dir.remove_by_connection(cid(2)).unwrap().player_id, pid(3));
        assert!(dir.remove_by_connection(cid(2)).is_none());
        assert!(dir.by_connection(cid(2)).is_none());
        assert_eq!(dir.authenticated_count(), 0);
    }
}
