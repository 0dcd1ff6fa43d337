//! Per-entity synchronization state.
//!
//! Every entity a world broadcasts carries an [`EntitySync`]. It decides
//! *when* the entity goes out (broadcast interval), *who* gets it (the
//! one-shot force-send-to-owner flag) and which inbound updates are new
//! enough to apply (the monotonic gate).

use std::sync::atomic::{AtomicU32, Ordering};

use homestead_protocol::{EntityId, EntityType, PlayerId};

/// Counter for generating unique entity IDs. Starts at 1 because 0 means
/// "unassigned" on the wire.
static NEXT_ENTITY_ID: AtomicU32 = AtomicU32::new(1);

/// Allocates the next process-unique entity id.
pub fn next_entity_id() -> EntityId {
    EntityId(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
}

/// Synchronization bookkeeping for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySync {
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    /// Owning player, [`PlayerId::NONE`] for world-owned entities.
    pub player_id: PlayerId,
    /// Game-clock µs of the last accepted update. Strictly increasing.
    last_update_time: u64,
    broadcast_interval_us: u64,
    elapsed_us: u64,
    should_broadcast: bool,
    force_send_to_owner: bool,
}

impl EntitySync {
    /// A new entity with a fresh id.
    ///
    /// Starts activated and with `force_send_to_owner` set, so the first
    /// broadcast also reaches the owner over the reliable channel.
    pub fn new(entity_type: EntityType, player_id: PlayerId, broadcast_interval_ms: u64) -> Self {
        Self::with_id(next_entity_id(), entity_type, player_id, broadcast_interval_ms)
    }

    /// Like [`new`](Self::new) but reuses an id, e.g. for a character
    /// moving between worlds.
    pub fn with_id(
        entity_id: EntityId,
        entity_type: EntityType,
        player_id: PlayerId,
        broadcast_interval_ms: u64,
    ) -> Self {
        Self {
            entity_id,
            entity_type,
            player_id,
            last_update_time: 0,
            broadcast_interval_us: broadcast_interval_ms.saturating_mul(1_000),
            elapsed_us: 0,
            should_broadcast: true,
            force_send_to_owner: true,
        }
    }

    /// Advances the broadcast counter by one frame.
    pub fn tick(&mut self, frame_us: u64) {
        self.elapsed_us = self.elapsed_us.saturating_add(frame_us);
    }

    /// Activated and at least one interval since the last broadcast.
    pub fn is_broadcast_due(&self) -> bool {
        self.should_broadcast && self.elapsed_us >= self.broadcast_interval_us
    }

    /// Resets the counter and clears the one-shot owner flag.
    pub fn after_broadcast(&mut self) {
        self.elapsed_us = 0;
        self.force_send_to_owner = false;
    }

    pub fn set_should_broadcast(&mut self, value: bool) {
        self.should_broadcast = value;
    }

    pub fn should_broadcast(&self) -> bool {
        self.should_broadcast
    }

    pub fn force_send_to_owner(&self) -> bool {
        self.force_send_to_owner
    }

    pub fn set_force_send_to_owner(&mut self, value: bool) {
        self.force_send_to_owner = value;
    }

    /// The player a broadcast of this entity skips, if any.
    ///
    /// Owners already know their own state, unless the owner flag forces
    /// a copy to them.
    pub fn excluded_player(&self) -> Option<PlayerId> {
        (self.player_id.is_player() && !self.force_send_to_owner).then_some(self.player_id)
    }

    pub fn last_update_time(&self) -> u64 {
        self.last_update_time
    }

    /// The monotonic gate.
    ///
    /// Returns `true` and records `time` only if it is strictly newer than
    /// the last accepted update.
    pub fn accept_update(&mut self, time: u64) -> bool {
        if time <= self.last_update_time {
            return false;
        }
        self.last_update_time = time;
        true
    }
}
