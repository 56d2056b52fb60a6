// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use std::sync::atomic::{AtomicU32, Ordering};
use yare::parameterized;

#[derive(Debug, PartialEq, Eq)]
enum TestError {
    Busy,
    Broken,
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestError::Busy => write!(f, "busy"),
            TestError::Broken => write!(f, "broken"),
        }
    }
}

fn is_busy(error: &TestError) -> bool {
    *error == TestError::Busy
}

fn exponential() -> Backoff {
    Backoff::Exponential {
        initial: Duration::from_millis(50),
        factor: 2,
        max: Duration::from_millis(300),
    }
}

#[parameterized(
    first = { 1, 50 },
    second = { 2, 100 },
    third = { 3, 200 },
    capped = { 4, 300 },
    far_past_cap = { 40, 300 },
)]
fn exponential_backoff_schedule(attempt: u32, expected_ms: u64) {
    assert_eq!(
        exponential().delay_after(attempt),
        Duration::from_millis(expected_ms)
    );
}

#[test]
fn fixed_backoff_is_constant() {
    let backoff = Backoff::Fixed(Duration::from_millis(100));
    for attempt in 1..10 {
        assert_eq!(backoff.delay_after(attempt), Duration::from_millis(100));
    }
}

#[test]
fn exponential_backoff_does_not_overflow() {
    let backoff = Backoff::Exponential {
        initial: Duration::from_secs(u64::MAX / 2),
        factor: u32::MAX,
        max: Duration::from_secs(5),
    };
    assert_eq!(backoff.delay_after(u32::MAX), Duration::from_secs(5));
}

proptest::proptest! {
    #[test]
    fn exponential_backoff_is_capped_and_non_decreasing(
        initial_ms in 0u64..10_000,
        factor in 0u32..16,
        max_ms in 0u64..60_000,
        attempt in 1u32..200,
    ) {
        let backoff = Backoff::Exponential {
            initial: Duration::from_millis(initial_ms),
            factor,
            max: Duration::from_millis(max_ms),
        };
        let delay = backoff.delay_after(attempt);
        proptest::prop_assert!(delay <= Duration::from_millis(max_ms));
        proptest::prop_assert!(delay <= backoff.delay_after(attempt + 1));
    }
}

#[test]
fn allocator_policy_matches_purchase_defaults() {
    let policy = RetryPolicy::allocator();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.backoff, Backoff::Fixed(Duration::from_millis(100)));
}

#[test]
fn policy_deserializes_from_toml() {
    let policy: RetryPolicy = toml::from_str(
        r#"
        max_attempts = 5
        backoff = { exponential = { initial = "10ms", factor = 3, max = "1s" } }
        "#,
    )
    .unwrap();

    assert_eq!(policy.max_attempts, 5);
    assert_eq!(
        policy.backoff,
        Backoff::Exponential {
            initial: Duration::from_millis(10),
            factor: 3,
            max: Duration::from_secs(1),
        }
    );
}

#[tokio::test]
async fn retry_returns_first_success_without_sleeping() {
    let clock = FakeClock::new();
    let result: Result<u32, RetryError<TestError>> =
        retry(&RetryPolicy::allocator(), &clock, is_busy, |attempt| async move {
            Ok(attempt)
        })
        .await;

    assert_eq!(result, Ok(1));
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn retry_recovers_after_transient_failures() {
    let clock = FakeClock::new();
    let calls = AtomicU32::new(0);

    let result = retry(&RetryPolicy::allocator(), &clock, is_busy, |attempt| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt < 3 {
                Err(TestError::Busy)
            } else {
                Ok("done")
            }
        }
    })
    .await;

    assert_eq!(result, Ok("done"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_millis(100), Duration::from_millis(100)]
    );
}

#[tokio::test]
async fn retry_gives_up_at_the_ceiling_without_trailing_sleep() {
    let clock = FakeClock::new();
    let calls = AtomicU32::new(0);

    let result: Result<(), _> = retry(&RetryPolicy::allocator(), &clock, is_busy, |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(TestError::Busy) }
    })
    .await;

    assert_eq!(
        result,
        Err(RetryError::Exhausted {
            attempts: 3,
            last: TestError::Busy
        })
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(clock.sleeps().len(), 2);
}

#[tokio::test]
async fn retry_stops_on_non_retryable_error() {
    let clock = FakeClock::new();
    let calls = AtomicU32::new(0);

    let result: Result<(), _> = retry(&RetryPolicy::allocator(), &clock, is_busy, |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(TestError::Broken) }
    })
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.attempts(), 1);
    assert!(matches!(err, RetryError::Fatal { .. }));
    assert_eq!(err.into_inner(), TestError::Broken);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn zero_attempt_policy_still_tries_once() {
    let clock = FakeClock::new();
    let policy = RetryPolicy::new(0, Backoff::Fixed(Duration::from_millis(1)));

    let result: Result<(), _> = retry(&policy, &clock, is_busy, |_| async {
        Err(TestError::Busy)
    })
    .await;

    assert_eq!(result.unwrap_err().attempts(), 1);
}

#[tokio::test]
async fn exponential_policy_sleeps_follow_schedule() {
    let clock = FakeClock::new();
    let policy = RetryPolicy::new(5, exponential());

    let _: Result<(), _> = retry(&policy, &clock, is_busy, |_| async {
        Err(TestError::Busy)
    })
    .await;

    assert_eq!(
        clock.sleeps(),
        vec![
            Duration::from_millis(50),
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(300),
        ]
    );
}
