//! Where worlds put outgoing packets.

use std::sync::{Arc, Mutex, PoisonError};

use homestead_protocol::Packet;
use homestead_transport::{PacketSender, SendTarget, TransportError};

/// Accepts packets for delivery.
///
/// The server hands worlds a [`PacketSender`]; tests hand them a
/// [`RecordingSink`] and inspect what would have gone out.
pub trait PacketSink: Send + Sync {
    fn send(&self, target: SendTarget, packet: &Packet, delay_ms: u64) -> Result<(), TransportError>;
}

impl PacketSink for PacketSender {
    fn send(&self, target: SendTarget, packet: &Packet, delay_ms: u64) -> Result<(), TransportError> {
        self.add_packet_to_send(target, packet, delay_ms)
    }
}

/// One packet captured by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    pub target: SendTarget,
    pub packet: Packet,
    pub delay_ms: u64,
}

/// A sink that keeps every packet in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<SentPacket>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything captured so far.
    pub fn take(&self) -> Vec<SentPacket> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PacketSink for RecordingSink {
    fn send(&self, target: SendTarget, packet: &Packet, delay_ms: u64) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentPacket {
                target,
                packet: packet.clone(),
                delay_ms,
            });
        Ok(())
    }
}
