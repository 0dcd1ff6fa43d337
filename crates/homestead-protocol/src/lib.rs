//! Wire protocol for Homestead.
//!
//! This crate defines the "language" that clients and servers speak:
//!
//! - **Wire format** ([`PacketWriter`], [`PacketReader`], [`encode_frame`],
//!   [`decode_frame`]): big-endian fixed-width integers, length-prefixed
//!   strings and blobs, and the `size | tag | payload` frame envelope.
//! - **Packets** ([`Packet`], [`PacketKind`] and one struct per kind): the
//!   closed set of messages that travel on the wire.
//! - **Registry** ([`registry`]): the tag → packet mapping shared by both
//!   sides of the connection.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the world
//! layer (entities, islands). It doesn't know about sockets or threads;
//! it only turns packets into frames and back.
//!
//! ```text
//! Transport (frames) → Protocol (Packet) → World (entities, change logs)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod error;
mod packets;
pub mod registry;
mod types;
mod wire;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use error::ProtocolError;
pub use packets::{
    Appearance, ClientServerChatboxMessage, ClientServerEntityUpdate,
    ClientServerPlayerAuthenticate, ClientServerRequestHashedPassword,
    ClientServerTestUdp, ClientServerWorldLoaded, Packet, PacketBody,
    PacketKind, ServerClientCharacterSetDetails, ServerClientChatboxMessage,
    ServerClientEntityUpdate, ServerClientLoadWorld,
    ServerClientPlayerJoinedWorld, ServerClientPlayerLeftWorld,
    ServerClientRemoveEntityFromWorld, ServerClientSendHashedPassword,
    ServerClientSetPlayerDetails,
};
pub use types::{Channel, EntityId, EntityType, PlayerId};
pub use wire::{
    HEADER_LEN, MAX_FRAME_SIZE, PacketReader, PacketWriter, decode_frame,
    encode_frame, frame_size_from_header,
};
