//! Transport layer for Homestead.
//!
//! Two channels carry frames between client and server:
//!
//! - a **reliable** stream (TCP): in order, lossless, frames written whole;
//! - a **best-effort** datagram socket (UDP): one frame per datagram, no
//!   fragmentation, loss and reordering tolerated.
//!
//! This crate owns the pieces both sides share: stream framing
//! ([`read_frame`], [`write_frame`]), the outbound send worker with delayed
//! sends ([`PacketSender`], [`SendWorker`]) and the queue that hands decoded
//! packets from the network thread to the simulation thread
//! ([`PacketQueue`]).

mod error;
mod frame_io;
mod queue;
mod sender;

pub use error::TransportError;
pub use frame_io::{read_frame, write_frame};
pub use queue::PacketQueue;
pub use sender::{
    BoxedWriter, MAX_DATAGRAM_SIZE, PacketSender, SendFailure, SendTarget,
    SendWorker, send_channel,
};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies one reliable stream for as long as it is open.
///
/// Ids are never reused within a process, so a stale id from a closed
/// stream can't address a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// A fresh id, greater than every id handed out before.
    pub fn next() -> Self {
        Self(CONNECTION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn test_connection_id_display_uses_conn_prefix() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_next_never_repeats() {
        let ids: Vec<_> = (0..64).map(|_| ConnectionId::next()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        let unique: BTreeSet<_> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_connection_id_raw_value_preserved() {
        assert_eq!(ConnectionId::new(u64::MAX).into_inner(), u64::MAX);
    }
}
