//! Tile layers and their append-only change logs.
//!
//! The server never sends whole tile grids. Every write to an island's
//! layers is appended to that island's change log, and the log (newest
//! entry first) is what clients receive. A client remembers, per island,
//! the timestamp of the newest entry it applied, and replays only what is
//! newer.
//!
//! Serialized form:
//!
//! ```text
//! islandCount u32
//! per island: entryCount u32, then entries newest first:
//!     layer u8 | tileX u32 | tileY u32 | timestamp u64 | plot u16
//! ```

use std::collections::HashMap;

use homestead_protocol::{PacketReader, PacketWriter};
use tracing::debug;

use crate::{IslandConfig, WorldError};

/// Plot index of a tile with nothing on it.
pub const EMPTY_PLOT: u16 = u16::MAX;

/// Bytes per serialized entry.
const ENTRY_LEN: usize = 1 + 4 + 4 + 8 + 2;

/// One tile write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeLogEntry {
    pub layer: u8,
    pub tile_x: u32,
    pub tile_y: u32,
    pub timestamp: u64,
    pub plot: u16,
}

impl ChangeLogEntry {
    fn write(&self, w: &mut PacketWriter) {
        w.write_u8(self.layer);
        w.write_u32(self.tile_x);
        w.write_u32(self.tile_y);
        w.write_u64(self.timestamp);
        w.write_u16(self.plot);
    }

    fn read(r: &mut PacketReader<'_>) -> Result<Self, WorldError> {
        Ok(Self {
            layer: r.read_u8()?,
            tile_x: r.read_u32()?,
            tile_y: r.read_u32()?,
            timestamp: r.read_u64()?,
            plot: r.read_u16()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Island (server)
// ---------------------------------------------------------------------------

/// A grid of tile layers on the server.
#[derive(Debug, Clone)]
pub struct Island {
    index: usize,
    layers: usize,
    width: u32,
    height: u32,
    /// `layers × height × width`, row-major per layer.
    tiles: Vec<u16>,
    log: Vec<ChangeLogEntry>,
}

impl Island {
    /// An island with every tile empty. Layer counts above 256 are capped,
    /// since entries carry the layer as a byte.
    pub fn new(index: usize, config: &IslandConfig) -> Self {
        let layers = config.layers.min(usize::from(u8::MAX) + 1);
        let len = layers * config.width as usize * config.height as usize;
        Self {
            index,
            layers,
            width: config.width,
            height: config.height,
            tiles: vec![EMPTY_PLOT; len],
            log: Vec::new(),
        }
    }

    pub fn layers(&self) -> usize {
        self.layers
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn offset(&self, layer: usize, x: u32, y: u32) -> Option<usize> {
        if layer >= self.layers || x >= self.width || y >= self.height {
            return None;
        }
        let per_layer = self.width as usize * self.height as usize;
        Some(layer * per_layer + y as usize * self.width as usize + x as usize)
    }

    /// The plot at a tile, `None` outside the island.
    pub fn plot(&self, layer: usize, x: u32, y: u32) -> Option<u16> {
        self.offset(layer, x, y).map(|i| self.tiles[i])
    }

    /// Writes a tile and appends the write to the change log.
    ///
    /// Log timestamps are strictly increasing: a timestamp not newer than
    /// the last entry is moved to just after it. Returns the timestamp
    /// that was logged.
    ///
    /// # Errors
    /// [`WorldError::TileOutOfBounds`] for coordinates outside the island.
    pub fn set_plot(
        &mut self,
        layer: usize,
        x: u32,
        y: u32,
        plot: u16,
        timestamp: u64,
    ) -> Result<u64, WorldError> {
        let (Some(i), Ok(layer_byte)) = (self.offset(layer, x, y), u8::try_from(layer)) else {
            return Err(WorldError::TileOutOfBounds {
                island: self.index,
                layer,
                x,
                y,
            });
        };
        let timestamp = match self.log.last() {
            Some(last) if timestamp <= last.timestamp => {
                let bumped = last.timestamp.saturating_add(1);
                debug!(
                    island = self.index,
                    requested = timestamp,
                    logged = bumped,
                    "tile write older than change log, moved forward"
                );
                bumped
            }
            _ => timestamp,
        };
        self.tiles[i] = plot;
        self.log.push(ChangeLogEntry {
            layer: layer_byte,
            tile_x: x,
            tile_y: y,
            timestamp,
            plot,
        });
        Ok(timestamp)
    }

    /// Entries in the order they were written.
    pub fn change_log(&self) -> &[ChangeLogEntry] {
        &self.log
    }
}

/// Serializes every island's change log for client sync.
pub fn serialize_change_logs(islands: &[Island]) -> Vec<u8> {
    let entries: usize = islands.iter().map(|i| i.log.len()).sum();
    let mut w = PacketWriter::with_capacity(4 + islands.len() * 4 + entries * ENTRY_LEN);
    w.write_u32(islands.len() as u32);
    for island in islands {
        w.write_u32(island.log.len() as u32);
        for entry in island.log.iter().rev() {
            entry.write(&mut w);
        }
    }
    w.into_bytes()
}

// ---------------------------------------------------------------------------
// Replica (client)
// ---------------------------------------------------------------------------

/// A client's copy of one island.
///
/// Tiles are kept sparsely: the client only learns about tiles through
/// the change log, so anything never written reads as [`EMPTY_PLOT`].
#[derive(Debug, Clone, Default)]
pub struct IslandReplica {
    last_known: Option<u64>,
    tiles: HashMap<(u8, u32, u32), u16>,
}

impl IslandReplica {
    /// Timestamp of the newest entry applied so far.
    pub fn last_known(&self) -> Option<u64> {
        self.last_known
    }

    pub fn plot(&self, layer: u8, x: u32, y: u32) -> u16 {
        self.tiles.get(&(layer, x, y)).copied().unwrap_or(EMPTY_PLOT)
    }

    /// Replays a log given newest first.
    ///
    /// Stops at the first entry not newer than the last known time, then
    /// writes the remaining entries oldest first. Returns the entries in
    /// the order they were applied.
    pub fn replay(&mut self, newest_first: &[ChangeLogEntry]) -> Vec<ChangeLogEntry> {
        let fresh = newest_first
            .iter()
            .take_while(|e| self.last_known.is_none_or(|known| e.timestamp > known))
            .count();

        let applied: Vec<ChangeLogEntry> = newest_first[..fresh].iter().rev().copied().collect();
        for entry in &applied {
            self.tiles
                .insert((entry.layer, entry.tile_x, entry.tile_y), entry.plot);
        }
        if let Some(newest) = newest_first.first().filter(|_| fresh > 0) {
            self.last_known = Some(newest.timestamp);
        }
        applied
    }
}

/// Every island of the world a client has loaded.
#[derive(Debug, Clone, Default)]
pub struct ChangeLogReplica {
    islands: Vec<IslandReplica>,
}

impl ChangeLogReplica {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn island(&self, index: usize) -> Option<&IslandReplica> {
        self.islands.get(index)
    }

    pub fn island_count(&self) -> usize {
        self.islands.len()
    }

    /// Applies serialized change logs. Returns how many entries were
    /// written.
    ///
    /// The whole buffer is decoded before anything is applied, so a
    /// malformed buffer leaves the replica untouched.
    ///
    /// # Errors
    /// Decode errors, or [`WorldError::TrailingData`].
    pub fn apply(&mut self, data: &[u8]) -> Result<usize, WorldError> {
        let mut r = PacketReader::new(data);
        let island_count = r.read_u32()? as usize;

        let mut logs = Vec::with_capacity(island_count.min(r.remaining() / 4));
        for _ in 0..island_count {
            let entry_count = r.read_u32()? as usize;
            let mut entries = Vec::with_capacity(entry_count.min(r.remaining() / ENTRY_LEN));
            for _ in 0..entry_count {
                entries.push(ChangeLogEntry::read(&mut r)?);
            }
            logs.push(entries);
        }
        if !r.is_empty() {
            return Err(WorldError::TrailingData {
                remaining: r.remaining(),
            });
        }

        if self.islands.len() < logs.len() {
            self.islands.resize_with(logs.len(), IslandReplica::default);
        }
        let applied = logs
            .iter()
            .zip(self.islands.iter_mut())
            .map(|(log, island)| island.replay(log).len())
            .sum();
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn island() -> Island {
        Island::new(
            0,
            &IslandConfig {
                layers: 2,
                width: 4,
                height: 3,
            },
        )
    }

    fn entry(timestamp: u64, plot: u16) -> ChangeLogEntry {
        ChangeLogEntry {
            layer: 0,
            tile_x: timestamp as u32,
            tile_y: 0,
            timestamp,
            plot,
        }
    }

    #[test]
    fn test_new_island_is_empty() {
        let island = island();
        assert_eq!(island.plot(1, 3, 2), Some(EMPTY_PLOT));
        assert!(island.change_log().is_empty());
    }

    #[test]
    fn test_set_plot_writes_tile_and_appends_entry() {
        let mut island = island();
        island.set_plot(1, 2, 1, 42, 100).unwrap();
        assert_eq!(island.plot(1, 2, 1), Some(42));
        assert_eq!(
            island.change_log(),
            &[ChangeLogEntry {
                layer: 1,
                tile_x: 2,
                tile_y: 1,
                timestamp: 100,
                plot: 42
            }]
        );
    }

    #[test]
    fn test_set_plot_out_of_bounds_errors() {
        let mut island = island();
        assert!(matches!(
            island.set_plot(2, 0, 0, 1, 1),
            Err(WorldError::TileOutOfBounds { layer: 2, .. })
        ));
        assert!(island.set_plot(0, 4, 0, 1, 1).is_err());
        assert!(island.set_plot(0, 0, 3, 1, 1).is_err());
        assert!(island.change_log().is_empty());
    }

    #[test]
    fn test_set_plot_older_timestamp_logged_after_last() {
        let mut island = island();
        assert_eq!(island.set_plot(0, 0, 0, 7, 5).unwrap(), 5);
        assert_eq!(island.set_plot(0, 1, 1, 9, 3).unwrap(), 6);
        assert_eq!(island.set_plot(0, 2, 1, 4, 6).unwrap(), 7);
        assert_eq!(island.set_plot(0, 3, 1, 4, 50).unwrap(), 50);

        let stamps: Vec<u64> = island.change_log().iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, [5, 6, 7, 50]);
        assert_eq!(island.plot(0, 1, 1), Some(9));
    }

    #[test]
    fn test_set_plot_older_timestamp_still_reaches_replica() {
        let mut server = island();
        server.set_plot(0, 0, 0, 7, 5).unwrap();
        let mut replica = ChangeLogReplica::new();
        replica.apply(&serialize_change_logs(&[server.clone()])).unwrap();

        server.set_plot(0, 1, 1, 9, 3).unwrap();
        let applied = replica.apply(&serialize_change_logs(&[server.clone()])).unwrap();

        assert_eq!(applied, 1);
        assert_eq!(replica.island(0).unwrap().plot(0, 1, 1), 9);
        assert_eq!(server.plot(0, 1, 1), Some(9));
    }

    #[test]
    fn test_serialize_writes_newest_first() {
        let mut island = island();
        island.set_plot(0, 0, 0, 1, 10).unwrap();
        island.set_plot(0, 1, 0, 2, 20).unwrap();
        let data = serialize_change_logs(&[island]);

        assert_eq!(&data[..4], &1u32.to_be_bytes());
        assert_eq!(&data[4..8], &2u32.to_be_bytes());
        // First entry's timestamp sits after layer, x and y.
        assert_eq!(&data[17..25], &20u64.to_be_bytes());
        assert_eq!(data.len(), 8 + 2 * ENTRY_LEN);
    }

    #[test]
    fn test_replay_stops_at_last_known() {
        let mut replica = IslandReplica::default();
        replica.replay(&[entry(3, 3), entry(2, 2), entry(1, 1)]);
        assert_eq!(replica.last_known(), Some(3));

        let log = [entry(5, 5), entry(4, 4), entry(3, 3), entry(2, 2), entry(1, 1)];
        let applied: Vec<u64> = replica.replay(&log).iter().map(|e| e.timestamp).collect();
        assert_eq!(applied, [4, 5]);
        assert_eq!(replica.last_known(), Some(5));
    }

    #[test]
    fn test_replay_twice_is_noop() {
        let mut replica = IslandReplica::default();
        let log = [entry(2, 7), entry(1, 6)];
        assert_eq!(replica.replay(&log).len(), 2);
        let before = replica.plot(0, 2, 0);
        assert!(replica.replay(&log).is_empty());
        assert_eq!(replica.plot(0, 2, 0), before);
    }

    #[test]
    fn test_replay_same_tile_keeps_newest_write() {
        let mut replica = IslandReplica::default();
        let log = [
            ChangeLogEntry {
                timestamp: 2,
                plot: 9,
                ..entry(0, 0)
            },
            ChangeLogEntry {
                timestamp: 1,
                plot: 8,
                ..entry(0, 0)
            },
        ];
        replica.replay(&log);
        assert_eq!(replica.plot(0, 0, 0), 9);
    }

    #[test]
    fn test_replica_apply_round_trip_with_server_log() {
        let mut server = island();
        server.set_plot(0, 1, 1, 11, 10).unwrap();
        server.set_plot(1, 3, 2, 12, 20).unwrap();

        let mut replica = ChangeLogReplica::new();
        let applied = replica.apply(&serialize_change_logs(&[server.clone()])).unwrap();
        assert_eq!(applied, 2);
        let copy = replica.island(0).unwrap();
        assert_eq!(copy.plot(0, 1, 1), 11);
        assert_eq!(copy.plot(1, 3, 2), 12);

        server.set_plot(0, 1, 1, 13, 30).unwrap();
        let applied = replica.apply(&serialize_change_logs(&[server])).unwrap();
        assert_eq!(applied, 1);
        assert_eq!(replica.island(0).unwrap().plot(0, 1, 1), 13);
    }

    #[test]
    fn test_replica_apply_truncated_leaves_state_untouched() {
        let mut server = island();
        server.set_plot(0, 0, 0, 1, 10).unwrap();
        let data = serialize_change_logs(&[server]);

        let mut replica = ChangeLogReplica::new();
        assert!(replica.apply(&data[..data.len() - 1]).is_err());
        assert_eq!(replica.island_count(), 0);
    }

    #[test]
    fn test_replica_apply_trailing_bytes_errors() {
        let mut data = serialize_change_logs(&[]);
        data.push(0);
        assert!(matches!(
            ChangeLogReplica::new().apply(&data),
            Err(WorldError::TrailingData { remaining: 1 })
        ));
    }
}
