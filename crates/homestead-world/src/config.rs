//! World layout and synchronization settings.
//!
//! Both structs load from JSON with camelCase keys; every field has a
//! default so a config file only needs to name what it changes.

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Where new characters appear, in world units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
}

/// Size of one island's tile grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IslandConfig {
    pub layers: usize,
    pub width: u32,
    pub height: u32,
}

impl Default for IslandConfig {
    fn default() -> Self {
        Self {
            layers: 5,
            width: 32,
            height: 32,
        }
    }
}

/// One named world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldConfig {
    pub name: String,
    pub spawn: SpawnPoint,
    pub islands: Vec<IslandConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: "farm".into(),
            spawn: SpawnPoint::default(),
            islands: vec![IslandConfig::default()],
        }
    }
}

impl WorldConfig {
    /// A world with one default island.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Timing of the entity synchronization protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Delay before the duplicate RemoveEntityFromWorld goes out.
    pub remove_resend_delay_ms: u64,
    /// Broadcast interval of character entities.
    pub character_broadcast_ms: u64,
    /// Broadcast interval of the world entity, which carries the change
    /// logs.
    pub world_broadcast_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remove_resend_delay_ms: 100,
            character_broadcast_ms: 50,
            world_broadcast_ms: 1_000,
        }
    }
}

impl SyncConfig {
    /// Returns a copy with zero broadcast intervals raised to 1 ms.
    ///
    /// An interval of zero would broadcast on every tick regardless of
    /// the tick rate.
    pub fn validated(mut self) -> Self {
        if self.character_broadcast_ms == 0 {
            warn!("character_broadcast_ms is 0, using 1");
            self.character_broadcast_ms = 1;
        }
        if self.world_broadcast_ms == 0 {
            warn!("world_broadcast_ms is 0, using 1");
            self.world_broadcast_ms = 1;
        }
        self
    }
}
