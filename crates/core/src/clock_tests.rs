// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_returns_increasing_time() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    let t2 = clock.now();
    assert!(t2 > t1);
}

#[tokio::test]
async fn system_clock_sleep_waits() {
    let clock = SystemClock;
    let t1 = clock.now();
    clock.sleep(Duration::from_millis(5)).await;
    assert!(clock.now().duration_since(t1) >= Duration::from_millis(5));
}

#[test]
fn fake_clock_can_be_advanced() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    clock.advance(Duration::from_secs(60));
    let t2 = clock.now();
    assert!(t2.duration_since(t1) >= Duration::from_secs(60));
}

#[test]
fn fake_clock_is_cloneable_and_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    let t1 = clock1.now();
    clock2.advance(Duration::from_secs(30));
    let t2 = clock1.now();
    assert!(t2.duration_since(t1) >= Duration::from_secs(30));
}

#[tokio::test]
async fn fake_clock_sleep_advances_without_waiting() {
    let clock = FakeClock::new();
    let start = clock.now();
    let wall = std::time::Instant::now();

    clock.sleep(Duration::from_secs(3600)).await;

    assert_eq!(clock.now().duration_since(start), Duration::from_secs(3600));
    assert!(wall.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn fake_clock_records_sleeps_in_order() {
    let clock = FakeClock::new();
    clock.sleep(Duration::from_millis(100)).await;
    clock.sleep(Duration::from_millis(200)).await;

    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
    assert_eq!(clock.slept(), Duration::from_millis(300));
}
