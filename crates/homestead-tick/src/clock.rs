//! The monotonic simulation clock.

use std::time::{Duration, Instant};

/// Microseconds since the simulation started, advanced once per tick.
///
/// `total_us` strictly increases on every [`tick`](Self::tick), even if
/// two ticks land on the same instant.
#[derive(Debug, Clone)]
pub struct GameClock {
    start: Instant,
    last_frame: Instant,
    total_us: u64,
    frame_us: u64,
    frames: u64,
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl GameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// A clock whose zero is `start`. Useful for deterministic tests.
    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            last_frame: start,
            total_us: 0,
            frame_us: 0,
            frames: 0,
        }
    }

    /// Advances to the current instant.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Advances to `now`. Instants earlier than the previous tick still
    /// move the clock forward by one microsecond.
    pub fn tick_at(&mut self, now: Instant) {
        let elapsed = duration_us(now.saturating_duration_since(self.start));
        let total = elapsed.max(self.total_us + 1);
        self.frame_us = total - self.total_us;
        self.total_us = total;
        if now > self.last_frame {
            self.last_frame = now;
        }
        self.frames += 1;
    }

    /// Microseconds since start as of the last tick.
    pub fn total_us(&self) -> u64 {
        self.total_us
    }

    /// Length of the last frame in microseconds.
    pub fn frame_us(&self) -> u64 {
        self.frame_us
    }

    /// Number of ticks so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

fn duration_us(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clock_starts_at_zero() {
        let clock = GameClock::new();
        assert_eq!(clock.total_us(), 0);
        assert_eq!(clock.frame_us(), 0);
        assert_eq!(clock.frames(), 0);
    }

    #[test]
    fn test_tick_at_measures_frame_and_total() {
        let start = Instant::now();
        let mut clock = GameClock::starting_at(start);

        clock.tick_at(start + Duration::from_millis(16));
        assert_eq!(clock.total_us(), 16_000);
        assert_eq!(clock.frame_us(), 16_000);

        clock.tick_at(start + Duration::from_millis(40));
        assert_eq!(clock.total_us(), 40_000);
        assert_eq!(clock.frame_us(), 24_000);
        assert_eq!(clock.frames(), 2);
    }

    #[test]
    fn test_tick_at_same_instant_still_advances() {
        let start = Instant::now();
        let mut clock = GameClock::starting_at(start);
        let t = start + Duration::from_millis(5);

        clock.tick_at(t);
        let first = clock.total_us();
        clock.tick_at(t);
        assert!(clock.total_us() > first);
        assert_eq!(clock.frame_us(), 1);
    }

    #[test]
    fn test_tick_at_earlier_instant_never_goes_backwards() {
        let start = Instant::now();
        let mut clock = GameClock::starting_at(start);
        clock.tick_at(start + Duration::from_millis(10));
        clock.tick_at(start + Duration::from_millis(3));
        assert_eq!(clock.total_us(), 10_001);
    }

    #[test]
    fn test_tick_uses_wall_clock() {
        let mut clock = GameClock::new();
        std::thread::sleep(Duration::from_millis(2));
        clock.tick();
        assert!(clock.total_us() >= 2_000);
    }
}
