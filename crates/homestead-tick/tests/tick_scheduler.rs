//! Integration tests for the tick scheduler.
//!
//! Runs with Tokio's paused clock, so `sleep_until` completes as soon as
//! the runtime is otherwise idle and the tests are deterministic.

use std::time::Duration;

use homestead_tick::{GameClock, TickConfig, TickPolicy, TickScheduler};

fn config_20hz() -> TickConfig {
    TickConfig {
        initial_jitter_us: 0,
        ..TickConfig::with_rate(20)
    }
}

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_config_runs_at_30hz_with_skip() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.tick_rate_hz, 30);
    assert_eq!(cfg.policy, TickPolicy::Skip);
}

#[test]
fn test_with_rate_sets_duration() {
    assert_eq!(
        TickConfig::with_rate(20).tick_duration(),
        Duration::from_millis(50)
    );
}

#[test]
fn test_validated_clamps_rate_into_range() {
    assert_eq!(TickConfig::with_rate(0).validated().tick_rate_hz, 1);
    assert_eq!(
        TickConfig::with_rate(10_000).validated().tick_rate_hz,
        TickConfig::MAX_TICK_RATE_HZ
    );
}

#[test]
fn test_validated_clamps_threshold() {
    let cfg = TickConfig {
        budget_warn_threshold: 3.0,
        ..TickConfig::default()
    }
    .validated();
    assert_eq!(cfg.budget_warn_threshold, 1.0);
}

#[test]
fn test_config_deserializes_camel_case_with_defaults() {
    let cfg: TickConfig =
        serde_json::from_str(r#"{ "tickRateHz": 60, "policy": "drop" }"#).unwrap();
    assert_eq!(cfg.tick_rate_hz, 60);
    assert_eq!(cfg.policy, TickPolicy::Drop);
    assert_eq!(cfg.initial_jitter_us, TickConfig::default().initial_jitter_us);
}

// =========================================================================
// Tick firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_fires_and_increments() {
    let mut s = TickScheduler::new(config_20hz());

    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
    assert_eq!(info.dt, Duration::from_millis(50));
    assert!(!info.overrun);
    assert_eq!(info.ticks_skipped, 0);
    assert_eq!(s.tick_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_spaced_one_duration_apart() {
    let mut s = TickScheduler::new(config_20hz());
    let start = tokio::time::Instant::now();

    for _ in 0..4 {
        s.wait_for_tick().await;
    }
    assert_eq!(start.elapsed(), Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_skip_policy_counts_missed_ticks() {
    let mut s = TickScheduler::new(config_20hz());
    s.wait_for_tick().await;

    // Stall the "simulation" for 3.5 ticks.
    tokio::time::advance(Duration::from_millis(175)).await;
    let info = s.wait_for_tick().await;

    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 2);
    assert_eq!(s.metrics().total_overruns, 1);
    assert_eq!(s.metrics().total_skipped, 2);
}

#[tokio::test(start_paused = true)]
async fn test_drop_policy_keeps_original_cadence() {
    let mut s = TickScheduler::new(TickConfig {
        policy: TickPolicy::Drop,
        ..config_20hz()
    });
    let start = tokio::time::Instant::now();
    s.wait_for_tick().await;

    tokio::time::advance(Duration::from_millis(70)).await;
    let late = s.wait_for_tick().await;
    assert!(late.overrun);
    assert_eq!(late.ticks_skipped, 0);

    // Next deadline is 150 ms from start, not 50 ms after the late tick.
    s.wait_for_tick().await;
    assert_eq!(start.elapsed(), Duration::from_millis(150));
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_is_cancel_safe() {
    let mut s = TickScheduler::new(config_20hz());
    let cancelled = tokio::time::timeout(Duration::from_millis(10), s.wait_for_tick()).await;
    assert!(cancelled.is_err());
    assert_eq!(s.tick_count(), 0);

    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
}

// =========================================================================
// Budget tracking
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_without_wait_is_noop() {
    let mut s = TickScheduler::new(config_20hz());
    s.record_tick_end();
    assert_eq!(s.metrics().budget_utilization, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_updates_utilization() {
    let mut s = TickScheduler::new(config_20hz());
    s.wait_for_tick().await;
    s.record_tick_end();
    assert!(s.metrics().budget_utilization < 1.0);
    assert_eq!(s.metrics().total_ticks, 1);
}

// =========================================================================
// Simulation loop pattern
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_stamps_increasing_clock() {
    let mut s = TickScheduler::new(config_20hz());
    let mut clock = GameClock::new();
    let (tx, mut rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(160)).await;
        let _ = tx.send(());
    });

    let mut stamps = Vec::new();
    loop {
        tokio::select! {
            _ = &mut rx => break,
            _ = s.wait_for_tick() => {
                clock.tick();
                stamps.push(clock.total_us());
                s.record_tick_end();
            }
        }
    }

    assert!(stamps.len() >= 3, "expected at least 3 ticks, got {}", stamps.len());
    assert!(stamps.windows(2).all(|w| w[0] < w[1]));
}
