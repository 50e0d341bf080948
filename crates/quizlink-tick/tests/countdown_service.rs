//! Integration tests for the countdown service.
//!
//! Uses paused Tokio time: `sleep_until` resolves as soon as every task is
//! idle, so a thirty-second countdown runs instantly and deterministically.

use std::time::Duration;

use quizlink_tick::{CountdownConfig, CountdownEvent, CountdownService};
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Owner {
    Round,
    Notice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Then {
    Skip,
    Clear,
    Other,
}

fn service() -> CountdownService<Owner, Then> {
    CountdownService::new(CountdownConfig::default())
}

/// True if the service produces no event within a minute of virtual time.
async fn stays_quiet(svc: &mut CountdownService<Owner, Then>) -> bool {
    tokio::time::timeout(Duration::from_secs(60), svc.wait_for_event())
        .await
        .is_err()
}

// =========================================================================
// Ticking and expiry
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_ticks_down_once_per_interval_then_expires() {
    let mut svc = service();
    let started = Instant::now();
    svc.start(Owner::Round, 3, Then::Skip);

    assert_eq!(
        svc.wait_for_event().await,
        CountdownEvent::Tick { owner: Owner::Round, remaining: 2 }
    );
    assert_eq!(started.elapsed(), Duration::from_secs(1));

    assert_eq!(
        svc.wait_for_event().await,
        CountdownEvent::Tick { owner: Owner::Round, remaining: 1 }
    );
    assert_eq!(
        svc.wait_for_event().await,
        CountdownEvent::Expired { owner: Owner::Round, on_expire: Then::Skip }
    );
    assert_eq!(started.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_expiry_fires_exactly_once_then_inert() {
    let mut svc = service();
    svc.start(Owner::Round, 1, Then::Skip);

    assert!(matches!(
        svc.wait_for_event().await,
        CountdownEvent::Expired { .. }
    ));
    assert!(!svc.is_running(&Owner::Round));
    assert!(stays_quiet(&mut svc).await);
    assert_eq!(svc.metrics().expired, 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_duration_expires_immediately() {
    let mut svc = service();
    let started = Instant::now();
    svc.start(Owner::Round, 0, Then::Other);

    assert_eq!(
        svc.wait_for_event().await,
        CountdownEvent::Expired { owner: Owner::Round, on_expire: Then::Other }
    );
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_idle_service_pends_forever() {
    let mut svc = service();
    assert!(stays_quiet(&mut svc).await);
}

// =========================================================================
// Cancellation and replacement
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_suppresses_expiry() {
    let mut svc = service();
    svc.start(Owner::Round, 2, Then::Skip);
    assert_eq!(svc.cancel(&Owner::Round), Some(Then::Skip));
    assert!(stays_quiet(&mut svc).await);
}

#[tokio::test(start_paused = true)]
async fn test_restart_cancels_previous_countdown_deterministically() {
    let mut svc = service();
    svc.start(Owner::Round, 5, Then::Skip);

    // First countdown gets one tick in, then is replaced.
    assert_eq!(
        svc.wait_for_event().await,
        CountdownEvent::Tick { owner: Owner::Round, remaining: 4 }
    );
    let replaced = svc.start(Owner::Round, 2, Then::Other);
    assert_eq!(replaced, Some(Then::Skip));

    let mut events = Vec::new();
    for _ in 0..2 {
        events.push(svc.wait_for_event().await);
    }
    assert_eq!(
        events,
        vec![
            CountdownEvent::Tick { owner: Owner::Round, remaining: 1 },
            CountdownEvent::Expired { owner: Owner::Round, on_expire: Then::Other },
        ]
    );

    // Nothing from the first countdown ever shows up afterwards.
    assert!(stays_quiet(&mut svc).await);
    assert_eq!(svc.metrics().started, 2);
    assert_eq!(svc.metrics().cancelled, 1);
    assert_eq!(svc.metrics().expired, 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_wait_future_loses_nothing() {
    let mut svc = service();
    svc.start(Owner::Round, 2, Then::Skip);

    // Give up half-way through the first interval.
    let early = tokio::time::timeout(Duration::from_millis(500), svc.wait_for_event()).await;
    assert!(early.is_err());
    assert_eq!(svc.remaining(&Owner::Round), Some(2));

    assert_eq!(
        svc.wait_for_event().await,
        CountdownEvent::Tick { owner: Owner::Round, remaining: 1 }
    );
}

// =========================================================================
// Multiple owners
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_owners_run_independently() {
    let mut svc = service();
    svc.start(Owner::Round, 2, Then::Skip);
    svc.start(Owner::Notice, 1, Then::Clear);
    assert_eq!(svc.active(), 2);

    // Both deadlines land on t=1s; start order breaks the tie.
    assert_eq!(
        svc.wait_for_event().await,
        CountdownEvent::Tick { owner: Owner::Round, remaining: 1 }
    );
    assert_eq!(
        svc.wait_for_event().await,
        CountdownEvent::Expired { owner: Owner::Notice, on_expire: Then::Clear }
    );
    assert_eq!(
        svc.wait_for_event().await,
        CountdownEvent::Expired { owner: Owner::Round, on_expire: Then::Skip }
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_all_silences_everything() {
    let mut svc = service();
    svc.start(Owner::Round, 3, Then::Skip);
    svc.start(Owner::Notice, 3, Then::Clear);
    svc.cancel_all();

    assert_eq!(svc.active(), 0);
    assert_eq!(svc.metrics().cancelled, 2);
    assert!(stays_quiet(&mut svc).await);
}

#[tokio::test(start_paused = true)]
async fn test_custom_interval() {
    let mut svc: CountdownService<Owner, Then> =
        CountdownService::new(CountdownConfig::with_interval(Duration::from_millis(250)));
    let started = Instant::now();
    svc.start(Owner::Notice, 4, Then::Clear);

    loop {
        if let CountdownEvent::Expired { .. } = svc.wait_for_event().await {
            break;
        }
    }
    assert_eq!(started.elapsed(), Duration::from_secs(1));
    assert_eq!(svc.metrics().ticks, 3);
}
