//! The tag → packet registry.
//!
//! Both binaries link this module, which makes it the single source of
//! truth for which schema a tag means. There is no version negotiation:
//! if the two sides disagree, decoding produces garbage or fails, and a
//! failure here is fatal for the connection.

use crate::{
    ClientServerChatboxMessage, ClientServerEntityUpdate,
    ClientServerPlayerAuthenticate, ClientServerRequestHashedPassword,
    ClientServerTestUdp, ClientServerWorldLoaded, Packet, PacketBody,
    PacketKind, PacketReader, ProtocolError, ServerClientCharacterSetDetails,
    ServerClientChatboxMessage, ServerClientEntityUpdate,
    ServerClientLoadWorld, ServerClientPlayerJoinedWorld,
    ServerClientPlayerLeftWorld, ServerClientRemoveEntityFromWorld,
    ServerClientSendHashedPassword, ServerClientSetPlayerDetails,
};

/// Creates an empty packet of the kind named by `tag`.
///
/// # Errors
/// [`ProtocolError::UnknownPacketType`] if the tag isn't registered.
pub fn create(tag: u8) -> Result<Packet, ProtocolError> {
    let packet = match PacketKind::from_tag(tag)? {
        PacketKind::ServerClientLoadWorld => ServerClientLoadWorld::default().into(),
        PacketKind::ClientServerWorldLoaded => ClientServerWorldLoaded.into(),
        PacketKind::ServerClientEntityUpdate => {
            ServerClientEntityUpdate::default().into()
        }
        PacketKind::ServerClientSetPlayerDetails => {
            ServerClientSetPlayerDetails::default().into()
        }
        PacketKind::ClientServerTestUdp => ClientServerTestUdp::default().into(),
        PacketKind::ClientServerEntityUpdate => {
            ClientServerEntityUpdate::default().into()
        }
        PacketKind::ServerClientPlayerJoinedWorld => {
            ServerClientPlayerJoinedWorld::default().into()
        }
        PacketKind::ServerClientPlayerLeftWorld => {
            ServerClientPlayerLeftWorld::default().into()
        }
        PacketKind::ServerClientRemoveEntityFromWorld => {
            ServerClientRemoveEntityFromWorld::default().into()
        }
        PacketKind::ServerClientCharacterSetDetails => {
            ServerClientCharacterSetDetails::default().into()
        }
        PacketKind::ClientServerPlayerAuthenticate => {
            ClientServerPlayerAuthenticate::default().into()
        }
        PacketKind::ClientServerRequestHashedPassword => {
            ClientServerRequestHashedPassword::default().into()
        }
        PacketKind::ServerClientSendHashedPassword => {
            ServerClientSendHashedPassword::default().into()
        }
        PacketKind::ClientServerChatboxMessage => {
            ClientServerChatboxMessage::default().into()
        }
        PacketKind::ServerClientChatboxMessage => {
            ServerClientChatboxMessage::default().into()
        }
    };
    Ok(packet)
}

/// Whether packets with this tag travel on the reliable channel.
pub fn is_vital(tag: u8) -> Result<bool, ProtocolError> {
    Ok(PacketKind::from_tag(tag)?.is_vital())
}

fn read_body<B: PacketBody>(
    payload: &[u8],
) -> Result<Packet, ProtocolError> {
    let mut r = PacketReader::new(payload);
    let body = B::read_payload(&mut r)?;
    if !r.is_empty() {
        return Err(ProtocolError::TrailingBytes {
            kind: B::KIND,
            remaining: r.remaining(),
        });
    }
    Ok(body.into())
}

/// Decodes a payload (frame header already stripped) as the kind named by
/// `tag`. The payload must be consumed exactly.
pub fn decode(tag: u8, payload: &[u8]) -> Result<Packet, ProtocolError> {
    match PacketKind::from_tag(tag)? {
        PacketKind::ServerClientLoadWorld => {
            read_body::<ServerClientLoadWorld>(payload)
        }
        PacketKind::ClientServerWorldLoaded => {
            read_body::<ClientServerWorldLoaded>(payload)
        }
        PacketKind::ServerClientEntityUpdate => {
            read_body::<ServerClientEntityUpdate>(payload)
        }
        PacketKind::ServerClientSetPlayerDetails => {
            read_body::<ServerClientSetPlayerDetails>(payload)
        }
        PacketKind::ClientServerTestUdp => {
            read_body::<ClientServerTestUdp>(payload)
        }
        PacketKind::ClientServerEntityUpdate => {
            read_body::<ClientServerEntityUpdate>(payload)
        }
        PacketKind::ServerClientPlayerJoinedWorld => {
            read_body::<ServerClientPlayerJoinedWorld>(payload)
        }
        PacketKind::ServerClientPlayerLeftWorld => {
            read_body::<ServerClientPlayerLeftWorld>(payload)
        }
        PacketKind::ServerClientRemoveEntityFromWorld => {
            read_body::<ServerClientRemoveEntityFromWorld>(payload)
        }
        PacketKind::ServerClientCharacterSetDetails => {
            read_body::<ServerClientCharacterSetDetails>(payload)
        }
        PacketKind::ClientServerPlayerAuthenticate => {
            read_body::<ClientServerPlayerAuthenticate>(payload)
        }
        PacketKind::ClientServerRequestHashedPassword => {
            read_body::<ClientServerRequestHashedPassword>(payload)
        }
        PacketKind::ServerClientSendHashedPassword => {
            read_body::<ServerClientSendHashedPassword>(payload)
        }
        PacketKind::ClientServerChatboxMessage => {
            read_body::<ClientServerChatboxMessage>(payload)
        }
        PacketKind::ServerClientChatboxMessage => {
            read_body::<ServerClientChatboxMessage>(payload)
        }
    }
}
