// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_epoch_is_after_2025() {
    assert!(SystemClock.epoch_ms() > 1_735_689_600_000);
}

#[test]
fn fake_clock_advance_moves_both_clocks() {
    let clock = FakeClock::new();
    let start = clock.now();
    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.now() - start, Duration::from_secs(5));
    assert_eq!(clock.epoch_ms(), FakeClock::START_EPOCH_MS + 5_000);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_millis(250));
    assert_eq!(other.epoch_ms(), FakeClock::START_EPOCH_MS + 250);
}

#[test]
fn ms_since_saturates_when_clock_steps_back() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000);
    assert_eq!(clock.ms_since(400), 600);
    assert_eq!(clock.ms_since(5_000), 0);
}
