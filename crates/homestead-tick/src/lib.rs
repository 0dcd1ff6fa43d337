//! Simulation timing for Homestead.
//!
//! Two pieces:
//!
//! - [`TickScheduler`] paces the simulation loop at a fixed rate, with an
//!   overrun policy and budget warnings.
//! - [`GameClock`] is the monotonic microsecond clock stamped on every
//!   outbound entity update. Receivers use those stamps to discard stale
//!   updates, so the clock must never go backwards or stand still between
//!   ticks.
//!
//! ```ignore
//! let mut scheduler = TickScheduler::new(TickConfig::with_rate(30));
//! let mut clock = GameClock::new();
//! loop {
//!     tokio::select! {
//!         _ = &mut shutdown => break,
//!         _ = scheduler.wait_for_tick() => {
//!             clock.tick();
//!             world.tick(&clock);
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

mod clock;
mod scheduler;

pub use clock::GameClock;
pub use scheduler::{TickConfig, TickInfo, TickMetrics, TickPolicy, TickScheduler};
