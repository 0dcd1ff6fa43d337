//! Every packet kind the client and server exchange.
//!
//! Each kind is a plain struct implementing [`PacketBody`]; [`Packet`] is
//! the closed sum of all of them. The kind's tag and vitality are fixed here,
//! once, and never chosen per send.
//!
//! Naming follows direction: `ServerClient*` travels server → client,
//! `ClientServer*` travels client → server.

use std::fmt;

use crate::{
    EntityId, EntityType, PacketReader, PacketWriter, PlayerId, ProtocolError,
    decode_frame, encode_frame,
};

// ---------------------------------------------------------------------------
// PacketKind
// ---------------------------------------------------------------------------

/// The stable numeric tag of a packet kind.
///
/// Tags are part of the wire format. Never renumber them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    ServerClientLoadWorld = 0,
    ClientServerWorldLoaded = 1,
    ServerClientEntityUpdate = 2,
    ServerClientSetPlayerDetails = 3,
    ClientServerTestUdp = 4,
    ClientServerEntityUpdate = 5,
    ServerClientPlayerJoinedWorld = 6,
    ServerClientPlayerLeftWorld = 7,
    ServerClientRemoveEntityFromWorld = 8,
    ServerClientCharacterSetDetails = 9,
    ClientServerPlayerAuthenticate = 10,
    ClientServerRequestHashedPassword = 11,
    ServerClientSendHashedPassword = 12,
    ClientServerChatboxMessage = 13,
    ServerClientChatboxMessage = 14,
}

impl PacketKind {
    /// All kinds in tag order.
    pub const ALL: [PacketKind; 15] = [
        Self::ServerClientLoadWorld,
        Self::ClientServerWorldLoaded,
        Self::ServerClientEntityUpdate,
        Self::ServerClientSetPlayerDetails,
        Self::ClientServerTestUdp,
        Self::ClientServerEntityUpdate,
        Self::ServerClientPlayerJoinedWorld,
        Self::ServerClientPlayerLeftWorld,
        Self::ServerClientRemoveEntityFromWorld,
        Self::ServerClientCharacterSetDetails,
        Self::ClientServerPlayerAuthenticate,
        Self::ClientServerRequestHashedPassword,
        Self::ServerClientSendHashedPassword,
        Self::ClientServerChatboxMessage,
        Self::ServerClientChatboxMessage,
    ];

    /// Looks a tag up.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownPacketType`] for tags outside the table.
    pub fn from_tag(tag: u8) -> Result<Self, ProtocolError> {
        Self::ALL
            .get(tag as usize)
            .copied()
            .ok_or(ProtocolError::UnknownPacketType(tag))
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Whether packets of this kind go over the reliable channel.
    ///
    /// Only the high-frequency entity updates and the UDP liveness check
    /// are best-effort.
    pub fn is_vital(self) -> bool {
        !matches!(
            self,
            Self::ServerClientEntityUpdate
                | Self::ClientServerTestUdp
                | Self::ClientServerEntityUpdate
        )
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ServerClientLoadWorld => "ServerClientLoadWorld",
            Self::ClientServerWorldLoaded => "ClientServerWorldLoaded",
            Self::ServerClientEntityUpdate => "ServerClientEntityUpdate",
            Self::ServerClientSetPlayerDetails => "ServerClientSetPlayerDetails",
            Self::ClientServerTestUdp => "ClientServerTestUdp",
            Self::ClientServerEntityUpdate => "ClientServerEntityUpdate",
            Self::ServerClientPlayerJoinedWorld => "ServerClientPlayerJoinedWorld",
            Self::ServerClientPlayerLeftWorld => "ServerClientPlayerLeftWorld",
            Self::ServerClientRemoveEntityFromWorld => {
                "ServerClientRemoveEntityFromWorld"
            }
            Self::ServerClientCharacterSetDetails => {
                "ServerClientCharacterSetDetails"
            }
            Self::ClientServerPlayerAuthenticate => "ClientServerPlayerAuthenticate",
            Self::ClientServerRequestHashedPassword => {
                "ClientServerRequestHashedPassword"
            }
            Self::ServerClientSendHashedPassword => "ServerClientSendHashedPassword",
            Self::ClientServerChatboxMessage => "ClientServerChatboxMessage",
            Self::ServerClientChatboxMessage => "ServerClientChatboxMessage",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// PacketBody
// ---------------------------------------------------------------------------

/// A concrete packet payload.
///
/// `write_payload` and `read_payload` must mirror each other field for
/// field; the frame header is handled by [`Packet`].
pub trait PacketBody: Sized + Into<Packet> {
    /// The kind this payload belongs to.
    const KIND: PacketKind;

    fn write_payload(&self, w: &mut PacketWriter);

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError>;
}

// ---------------------------------------------------------------------------
// World lifecycle
// ---------------------------------------------------------------------------

/// Tells the client which world to load. Sent when a player is placed in a
/// world, before any entity of that world reaches them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerClientLoadWorld {
    pub world_to_load: String,
}

impl PacketBody for ServerClientLoadWorld {
    const KIND: PacketKind = PacketKind::ServerClientLoadWorld;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_str(&self.world_to_load);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            world_to_load: r.read_string()?,
        })
    }
}

/// The client finished loading the world it was told to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientServerWorldLoaded;

impl PacketBody for ClientServerWorldLoaded {
    const KIND: PacketKind = PacketKind::ClientServerWorldLoaded;

    fn write_payload(&self, _w: &mut PacketWriter) {}

    fn read_payload(_r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerClientPlayerJoinedWorld {
    pub player_id: PlayerId,
    pub world_name: String,
}

impl PacketBody for ServerClientPlayerJoinedWorld {
    const KIND: PacketKind = PacketKind::ServerClientPlayerJoinedWorld;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_u32(self.player_id.0);
        w.write_str(&self.world_name);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            player_id: PlayerId(r.read_u32()?),
            world_name: r.read_string()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerClientPlayerLeftWorld {
    pub player_id: PlayerId,
    pub world_name: String,
}

impl PacketBody for ServerClientPlayerLeftWorld {
    const KIND: PacketKind = PacketKind::ServerClientPlayerLeftWorld;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_u32(self.player_id.0);
        w.write_str(&self.world_name);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            player_id: PlayerId(r.read_u32()?),
            world_name: r.read_string()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Entity synchronization
// ---------------------------------------------------------------------------

/// Authoritative entity snapshot, server → client.
///
/// `time_of_update` is the server's monotonic game clock in microseconds;
/// receivers drop anything not newer than what they already hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerClientEntityUpdate {
    pub entity_id: EntityId,
    pub player_id: PlayerId,
    pub world_name: String,
    pub time_of_update: u64,
    pub entity_type: EntityType,
    pub data: Vec<u8>,
}

impl PacketBody for ServerClientEntityUpdate {
    const KIND: PacketKind = PacketKind::ServerClientEntityUpdate;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_u32(self.entity_id.0);
        w.write_u32(self.player_id.0);
        w.write_str(&self.world_name);
        w.write_u64(self.time_of_update);
        w.write_u8(self.entity_type.tag());
        w.write_blob(&self.data);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            entity_id: EntityId(r.read_u32()?),
            player_id: PlayerId(r.read_u32()?),
            world_name: r.read_string()?,
            time_of_update: r.read_u64()?,
            entity_type: EntityType::from_tag(r.read_u8()?)?,
            data: r.read_blob()?,
        })
    }
}

/// A client's own-entity state, client → server.
///
/// Carries the player id because it arrives on the datagram channel, where
/// the sender can't be identified by connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientServerEntityUpdate {
    pub player_id: PlayerId,
    pub entity_id: EntityId,
    pub time_of_update: u64,
    pub entity_type: EntityType,
    pub data: Vec<u8>,
}

impl PacketBody for ClientServerEntityUpdate {
    const KIND: PacketKind = PacketKind::ClientServerEntityUpdate;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_u32(self.player_id.0);
        w.write_u32(self.entity_id.0);
        w.write_u64(self.time_of_update);
        w.write_u8(self.entity_type.tag());
        w.write_blob(&self.data);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            player_id: PlayerId(r.read_u32()?),
            entity_id: EntityId(r.read_u32()?),
            time_of_update: r.read_u64()?,
            entity_type: EntityType::from_tag(r.read_u8()?)?,
            data: r.read_blob()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerClientRemoveEntityFromWorld {
    pub entity_id: EntityId,
    pub world_name: String,
}

impl PacketBody for ServerClientRemoveEntityFromWorld {
    const KIND: PacketKind = PacketKind::ServerClientRemoveEntityFromWorld;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_u32(self.entity_id.0);
        w.write_str(&self.world_name);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            entity_id: EntityId(r.read_u32()?),
            world_name: r.read_string()?,
        })
    }
}

/// How a character looks. Each field names an asset on the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Appearance {
    pub hair: String,
    pub body: String,
    pub clothes_top: String,
    pub clothes_bottom: String,
    pub feet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerClientCharacterSetDetails {
    pub entity_id: EntityId,
    pub world_name: String,
    pub appearance: Appearance,
}

impl PacketBody for ServerClientCharacterSetDetails {
    const KIND: PacketKind = PacketKind::ServerClientCharacterSetDetails;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_u32(self.entity_id.0);
        w.write_str(&self.world_name);
        w.write_str(&self.appearance.hair);
        w.write_str(&self.appearance.body);
        w.write_str(&self.appearance.clothes_top);
        w.write_str(&self.appearance.clothes_bottom);
        w.write_str(&self.appearance.feet);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            entity_id: EntityId(r.read_u32()?),
            world_name: r.read_string()?,
            appearance: Appearance {
                hair: r.read_string()?,
                body: r.read_string()?,
                clothes_top: r.read_string()?,
                clothes_bottom: r.read_string()?,
                feet: r.read_string()?,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// The player id the server bound to this connection after login.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerClientSetPlayerDetails {
    pub player_id: PlayerId,
}

impl PacketBody for ServerClientSetPlayerDetails {
    const KIND: PacketKind = PacketKind::ServerClientSetPlayerDetails;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_u32(self.player_id.0);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            player_id: PlayerId(r.read_u32()?),
        })
    }
}

/// Datagram liveness check. The first one the server sees links the
/// sender's address to the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientServerTestUdp {
    pub player_id: PlayerId,
}

impl PacketBody for ClientServerTestUdp {
    const KIND: PacketKind = PacketKind::ClientServerTestUdp;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_u32(self.player_id.0);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            player_id: PlayerId(r.read_u32()?),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientServerPlayerAuthenticate {
    pub user_name: String,
    pub hashed_password: String,
}

impl PacketBody for ClientServerPlayerAuthenticate {
    const KIND: PacketKind = PacketKind::ClientServerPlayerAuthenticate;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_str(&self.user_name);
        w.write_str(&self.hashed_password);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            user_name: r.read_string()?,
            hashed_password: r.read_string()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientServerRequestHashedPassword {
    pub user_name: String,
}

impl PacketBody for ClientServerRequestHashedPassword {
    const KIND: PacketKind = PacketKind::ClientServerRequestHashedPassword;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_str(&self.user_name);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            user_name: r.read_string()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerClientSendHashedPassword {
    pub user_name: String,
    pub hashed_password: String,
}

impl PacketBody for ServerClientSendHashedPassword {
    const KIND: PacketKind = PacketKind::ServerClientSendHashedPassword;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_str(&self.user_name);
        w.write_str(&self.hashed_password);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            user_name: r.read_string()?,
            hashed_password: r.read_string()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientServerChatboxMessage {
    pub message: String,
}

impl PacketBody for ClientServerChatboxMessage {
    const KIND: PacketKind = PacketKind::ClientServerChatboxMessage;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_str(&self.message);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            message: r.read_string()?,
        })
    }
}

/// A chat line relayed by the server. `server_time` is milliseconds since
/// the Unix epoch on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerClientChatboxMessage {
    pub username: String,
    pub message: String,
    pub server_time: u64,
}

impl PacketBody for ServerClientChatboxMessage {
    const KIND: PacketKind = PacketKind::ServerClientChatboxMessage;

    fn write_payload(&self, w: &mut PacketWriter) {
        w.write_str(&self.username);
        w.write_str(&self.message);
        w.write_u64(self.server_time);
    }

    fn read_payload(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            username: r.read_string()?,
            message: r.read_string()?,
            server_time: r.read_u64()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// Any packet. Decoding produces one of these; the receiver matches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    LoadWorld(ServerClientLoadWorld),
    WorldLoaded(ClientServerWorldLoaded),
    EntityUpdate(ServerClientEntityUpdate),
    SetPlayerDetails(ServerClientSetPlayerDetails),
    TestUdp(ClientServerTestUdp),
    ClientEntityUpdate(ClientServerEntityUpdate),
    PlayerJoinedWorld(ServerClientPlayerJoinedWorld),
    PlayerLeftWorld(ServerClientPlayerLeftWorld),
    RemoveEntity(ServerClientRemoveEntityFromWorld),
    CharacterSetDetails(ServerClientCharacterSetDetails),
    Authenticate(ClientServerPlayerAuthenticate),
    RequestHashedPassword(ClientServerRequestHashedPassword),
    SendHashedPassword(ServerClientSendHashedPassword),
    ClientChat(ClientServerChatboxMessage),
    ServerChat(ServerClientChatboxMessage),
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Self::LoadWorld(_) => PacketKind::ServerClientLoadWorld,
            Self::WorldLoaded(_) => PacketKind::ClientServerWorldLoaded,
            Self::EntityUpdate(_) => PacketKind::ServerClientEntityUpdate,
            Self::SetPlayerDetails(_) => PacketKind::ServerClientSetPlayerDetails,
            Self::TestUdp(_) => PacketKind::ClientServerTestUdp,
            Self::ClientEntityUpdate(_) => PacketKind::ClientServerEntityUpdate,
            Self::PlayerJoinedWorld(_) => PacketKind::ServerClientPlayerJoinedWorld,
            Self::PlayerLeftWorld(_) => PacketKind::ServerClientPlayerLeftWorld,
            Self::RemoveEntity(_) => PacketKind::ServerClientRemoveEntityFromWorld,
            Self::CharacterSetDetails(_) => {
                PacketKind::ServerClientCharacterSetDetails
            }
            Self::Authenticate(_) => PacketKind::ClientServerPlayerAuthenticate,
            Self::RequestHashedPassword(_) => {
                PacketKind::ClientServerRequestHashedPassword
            }
            Self::SendHashedPassword(_) => PacketKind::ServerClientSendHashedPassword,
            Self::ClientChat(_) => PacketKind::ClientServerChatboxMessage,
            Self::ServerChat(_) => PacketKind::ServerClientChatboxMessage,
        }
    }

    pub fn is_vital(&self) -> bool {
        self.kind().is_vital()
    }

    /// The player id carried in the payload of best-effort client packets.
    ///
    /// Datagrams can't be matched to a connection, so these kinds name
    /// their sender explicitly. `None` for every other kind.
    pub fn sender_player_id(&self) -> Option<PlayerId> {
        match self {
            Self::TestUdp(p) => Some(p.player_id),
            Self::ClientEntityUpdate(p) => Some(p.player_id),
            _ => None,
        }
    }

    pub fn write_payload(&self, w: &mut PacketWriter) {
        match self {
            Self::LoadWorld(p) => p.write_payload(w),
            Self::WorldLoaded(p) => p.write_payload(w),
            Self::EntityUpdate(p) => p.write_payload(w),
            Self::SetPlayerDetails(p) => p.write_payload(w),
            Self::TestUdp(p) => p.write_payload(w),
            Self::ClientEntityUpdate(p) => p.write_payload(w),
            Self::PlayerJoinedWorld(p) => p.write_payload(w),
            Self::PlayerLeftWorld(p) => p.write_payload(w),
            Self::RemoveEntity(p) => p.write_payload(w),
            Self::CharacterSetDetails(p) => p.write_payload(w),
            Self::Authenticate(p) => p.write_payload(w),
            Self::RequestHashedPassword(p) => p.write_payload(w),
            Self::SendHashedPassword(p) => p.write_payload(w),
            Self::ClientChat(p) => p.write_payload(w),
            Self::ServerChat(p) => p.write_payload(w),
        }
    }

    /// Encodes the packet as a complete frame.
    ///
    /// # Errors
    /// [`ProtocolError::FrameTooLarge`] when the payload doesn't fit in
    /// one frame.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut w = PacketWriter::new();
        self.write_payload(&mut w);
        encode_frame(self.kind().tag(), w.as_bytes())
    }

    /// Decodes one complete frame.
    ///
    /// # Errors
    /// Any framing error, an unknown tag, a short payload or leftover bytes.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (tag, payload) = decode_frame(frame)?;
        crate::registry::decode(tag, payload)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

impl From<ServerClientLoadWorld> for Packet {
    fn from(p: ServerClientLoadWorld) -> Self {
        Self::LoadWorld(p)
    }
}

impl From<ClientServerWorldLoaded> for Packet {
    fn from(p: ClientServerWorldLoaded) -> Self {
        Self::WorldLoaded(p)
    }
}

impl From<ServerClientEntityUpdate> for Packet {
    fn from(p: ServerClientEntityUpdate) -> Self {
        Self::EntityUpdate(p)
    }
}

impl From<ServerClientSetPlayerDetails> for Packet {
    fn from(p: ServerClientSetPlayerDetails) -> Self {
        Self::SetPlayerDetails(p)
    }
}

impl From<ClientServerTestUdp> for Packet {
    fn from(p: ClientServerTestUdp) -> Self {
        Self::TestUdp(p)
    }
}

impl From<ClientServerEntityUpdate> for Packet {
    fn from(p: ClientServerEntityUpdate) -> Self {
        Self::ClientEntityUpdate(p)
    }
}

impl From<ServerClientPlayerJoinedWorld> for Packet {
    fn from(p: ServerClientPlayerJoinedWorld) -> Self {
        Self::PlayerJoinedWorld(p)
    }
}

impl From<ServerClientPlayerLeftWorld> for Packet {
    fn from(p: ServerClientPlayerLeftWorld) -> Self {
        Self::PlayerLeftWorld(p)
    }
}

impl From<ServerClientRemoveEntityFromWorld> for Packet {
    fn from(p: ServerClientRemoveEntityFromWorld) -> Self {
        Self::RemoveEntity(p)
    }
}

impl From<ServerClientCharacterSetDetails> for Packet {
    fn from(p: ServerClientCharacterSetDetails) -> Self {
        Self::CharacterSetDetails(p)
    }
}

impl From<ClientServerPlayerAuthenticate> for Packet {
    fn from(p: ClientServerPlayerAuthenticate) -> Self {
        Self::Authenticate(p)
    }
}

impl From<ClientServerRequestHashedPassword> for Packet {
    fn from(p: ClientServerRequestHashedPassword) -> Self {
        Self::RequestHashedPassword(p)
    }
}

impl From<ServerClientSendHashedPassword> for Packet {
    fn from(p: ServerClientSendHashedPassword) -> Self {
        Self::SendHashedPassword(p)
    }
}

impl From<ClientServerChatboxMessage> for Packet {
    fn from(p: ClientServerChatboxMessage) -> Self {
        Self::ClientChat(p)
    }
}

impl From<ServerClientChatboxMessage> for Packet {
    fn from(p: ServerClientChatboxMessage) -> Self {
        Self::ServerChat(p)
    }
}

// =========================================================================
// Tests
// =========================================================================
