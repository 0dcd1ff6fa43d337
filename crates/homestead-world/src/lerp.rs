//! Linear interpolation of replica positions.

/// How long a received position takes to reach on the client.
pub const LERP_DURATION_MS: u64 = 100;

/// Interpolates one value from `start` to `end` over a fixed time.
///
/// The value never overshoots `end`, whichever direction it moves in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lerp {
    start: f32,
    end: f32,
    total_ms: f32,
    current_ms: f32,
}

impl Lerp {
    pub fn new(start: f32, end: f32, duration_ms: u64) -> Self {
        Self {
            start,
            end,
            total_ms: duration_ms as f32,
            current_ms: 0.0,
        }
    }

    /// Advances by `frame_ms` and returns the value and whether the end
    /// was reached.
    pub fn advance(&mut self, frame_ms: f32) -> (f32, bool) {
        self.current_ms += frame_ms;
        if self.total_ms <= 0.0 || self.current_ms >= self.total_ms {
            return (self.end, true);
        }
        let t = self.current_ms / self.total_ms;
        let value = self.start + (self.end - self.start) * t;
        let (lo, hi) = if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };
        (value.clamp(lo, hi), false)
    }

    pub fn end(&self) -> f32 {
        self.end
    }
}

/// A 2D position moving toward a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionLerp {
    x: Lerp,
    y: Lerp,
}

impl PositionLerp {
    pub fn new(from: (f32, f32), to: (f32, f32), duration_ms: u64) -> Self {
        Self {
            x: Lerp::new(from.0, to.0, duration_ms),
            y: Lerp::new(from.1, to.1, duration_ms),
        }
    }

    /// Advances both axes. Returns the position and whether it arrived.
    pub fn advance(&mut self, frame_ms: f32) -> ((f32, f32), bool) {
        let (x, x_done) = self.x.advance(frame_ms);
        let (y, y_done) = self.y.advance(frame_ms);
        ((x, y), x_done && y_done)
    }

    pub fn target(&self) -> (f32, f32) {
        (self.x.end(), self.y.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_halfway() {
        let mut l = Lerp::new(0.0, 10.0, 100);
        let (v, done) = l.advance(50.0);
        assert!((v - 5.0).abs() < 1e-4);
        assert!(!done);
    }

    #[test]
    fn test_advance_past_end_clamps_and_finishes() {
        let mut l = Lerp::new(0.0, 10.0, 100);
        let (v, done) = l.advance(250.0);
        assert_eq!(v, 10.0);
        assert!(done);
    }

    #[test]
    fn test_advance_decreasing_direction() {
        let mut l = Lerp::new(10.0, 0.0, 100);
        let (v, _) = l.advance(25.0);
        assert!((v - 7.5).abs() < 1e-4);
    }

    #[test]
    fn test_zero_duration_snaps() {
        let mut l = Lerp::new(3.0, 4.0, 0);
        assert_eq!(l.advance(0.0), (4.0, true));
    }

    #[test]
    fn test_position_lerp_arrives_after_duration() {
        let mut p = PositionLerp::new((0.0, 0.0), (2.0, -2.0), LERP_DURATION_MS);
        let (_, done) = p.advance(60.0);
        assert!(!done);
        let (pos, done) = p.advance(40.0);
        assert!(done);
        assert_eq!(pos, (2.0, -2.0));
        assert_eq!(p.target(), (2.0, -2.0));
    }
}
