// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_is_monotonic_enough() {
    let clock = SystemClock;
    let a = clock.timestamp();
    let b = clock.timestamp();
    assert!(b >= a);
    assert!(a > 1_600_000_000.0);
}

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::at(100.0);
    assert_eq!(clock.timestamp(), 100.0);
    clock.advance(4.5);
    assert_eq!(clock.timestamp(), 104.5);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(10.0);
    assert_eq!(other.timestamp(), 10.0);
}
