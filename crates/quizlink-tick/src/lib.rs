//! Countdown timer service for Quizlink.
//!
//! A countdown is a whole number of fixed intervals. While it runs it
//! produces one [`CountdownEvent::Tick`] per interval with the remaining
//! count, then exactly one [`CountdownEvent::Expired`] when the count
//! reaches zero, after which it is gone.
//!
//! Countdowns are keyed by *owner*. Each owner has at most one live
//! countdown: [`CountdownService::start`] replaces whatever that owner had
//! running, and the replaced countdown never produces another event.
//!
//! The service knows nothing about games. The value passed as `on_expire`
//! is handed back untouched in the `Expired` event, so the owner decides
//! what expiry means.
//!
//! # Integration
//!
//! The service is polled from the owner's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(line) = conn.recv() => { /* handle message */ }
//!         event = countdowns.wait_for_event() => match event {
//!             CountdownEvent::Tick { owner, remaining } => { /* redraw */ }
//!             CountdownEvent::Expired { owner, on_expire } => { /* act */ }
//!         },
//!     }
//! }
//! ```
//!
//! [`CountdownService::wait_for_event`] pends forever while nothing is
//! running, and mutates nothing until a deadline actually fires, so losing
//! the race in `select!` never drops a tick.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`CountdownService`].
#[derive(Debug, Clone)]
pub struct CountdownConfig {
    /// Wall-clock length of one countdown step. Default: one second.
    pub interval: Duration,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

impl CountdownConfig {
    /// Shortest accepted interval.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Clamps out-of-range values. Called by [`CountdownService::new`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_us = self.interval.as_micros() as u64,
                "countdown interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Events and metrics
// ---------------------------------------------------------------------------

/// What [`CountdownService::wait_for_event`] resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownEvent<O, T> {
    /// One interval elapsed; `remaining` is at least 1.
    Tick { owner: O, remaining: u32 },
    /// The countdown reached zero. It has been removed from the service.
    Expired { owner: O, on_expire: T },
}

/// Lifetime counters for a [`CountdownService`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountdownMetrics {
    pub started: u64,
    /// Countdowns removed before expiry, by `cancel` or by a restart.
    pub cancelled: u64,
    pub expired: u64,
    pub ticks: u64,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

struct Running<T> {
    remaining: u32,
    deadline: Instant,
    on_expire: T,
    /// Start order, breaks deadline ties deterministically.
    seq: u64,
}

/// Owner-keyed countdowns sharing one fixed interval.
pub struct CountdownService<O, T> {
    config: CountdownConfig,
    running: HashMap<O, Running<T>>,
    next_seq: u64,
    metrics: CountdownMetrics,
}

impl<O, T> CountdownService<O, T>
where
    O: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new(config: CountdownConfig) -> Self {
        let config = config.validated();
        debug!(
            interval_ms = config.interval.as_secs_f64() * 1000.0,
            "countdown service created"
        );
        Self {
            config,
            running: HashMap::new(),
            next_seq: 0,
            metrics: CountdownMetrics::default(),
        }
    }

    /// Starts a countdown of `duration` intervals for `owner`.
    ///
    /// Any countdown the owner already had is cancelled; its `on_expire`
    /// value is returned so the caller can see what was superseded.
    /// A `duration` of 0 expires on the next poll.
    pub fn start(&mut self, owner: O, duration: u32, on_expire: T) -> Option<T> {
        let now = Instant::now();
        let deadline = if duration == 0 {
            now
        } else {
            now + self.config.interval
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        self.metrics.started += 1;

        let replaced = self.running.insert(
            owner.clone(),
            Running {
                remaining: duration,
                deadline,
                on_expire,
                seq,
            },
        );

        if replaced.is_some() {
            self.metrics.cancelled += 1;
            debug!(?owner, duration, "countdown restarted, previous one cancelled");
        } else {
            debug!(?owner, duration, "countdown started");
        }
        replaced.map(|r| r.on_expire)
    }

    /// Cancels the owner's countdown, suppressing its expiry.
    ///
    /// Returns the pending `on_expire` value, or `None` if nothing was
    /// running for this owner.
    pub fn cancel(&mut self, owner: &O) -> Option<T> {
        let cancelled = self.running.remove(owner)?;
        self.metrics.cancelled += 1;
        debug!(?owner, remaining = cancelled.remaining, "countdown cancelled");
        Some(cancelled.on_expire)
    }

    /// Cancels every countdown.
    pub fn cancel_all(&mut self) {
        let n = self.running.len() as u64;
        if n > 0 {
            self.running.clear();
            self.metrics.cancelled += n;
            debug!(count = n, "all countdowns cancelled");
        }
    }

    /// Remaining intervals for the owner, if it has a countdown running.
    pub fn remaining(&self, owner: &O) -> Option<u32> {
        self.running.get(owner).map(|r| r.remaining)
    }

    pub fn is_running(&self, owner: &O) -> bool {
        self.running.contains_key(owner)
    }

    /// Number of live countdowns across all owners.
    pub fn active(&self) -> usize {
        self.running.len()
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn metrics(&self) -> &CountdownMetrics {
        &self.metrics
    }

    /// Waits for the next tick or expiry of any running countdown.
    ///
    /// Pends forever while nothing is running.
    pub async fn wait_for_event(&mut self) -> CountdownEvent<O, T> {
        loop {
            let next = self
                .running
                .iter()
                .min_by_key(|(_, r)| (r.deadline, r.seq))
                .map(|(owner, r)| (owner.clone(), r.deadline));

            let Some((owner, deadline)) = next else {
                std::future::pending::<()>().await;
                continue;
            };

            time::sleep_until(deadline).await;

            let Some(run) = self.running.get_mut(&owner) else {
                continue;
            };
            run.remaining = run.remaining.saturating_sub(1);

            if run.remaining > 0 {
                run.deadline += self.config.interval;
                let remaining = run.remaining;
                self.metrics.ticks += 1;
                trace!(?owner, remaining, "countdown tick");
                return CountdownEvent::Tick { owner, remaining };
            }

            if let Some(done) = self.running.remove(&owner) {
                self.metrics.expired += 1;
                debug!(?owner, "countdown expired");
                return CountdownEvent::Expired {
                    owner,
                    on_expire: done.on_expire,
                };
            }
        }
    }
}

impl<O, T> Default for CountdownService<O, T>
where
    O: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new(CountdownConfig::default())
    }
}

impl<O: fmt::Debug, T> fmt::Debug for CountdownService<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownService")
            .field("interval", &self.config.interval)
            .field("owners", &self.running.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interval_is_one_second() {
        assert_eq!(CountdownConfig::default().interval, Duration::from_secs(1));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let cfg = CountdownConfig::with_interval(Duration::ZERO).validated();
        assert_eq!(cfg.interval, CountdownConfig::MIN_INTERVAL);
    }

    #[tokio::test]
    async fn test_start_reports_replaced_expiry_value() {
        let mut svc: CountdownService<&str, u8> = CountdownService::default();
        assert_eq!(svc.start("round", 5, 1), None);
        assert_eq!(svc.start("round", 3, 2), Some(1));
        assert_eq!(svc.remaining(&"round"), Some(3));
        assert_eq!(svc.active(), 1);
        assert_eq!(svc.metrics().cancelled, 1);
    }

    #[tokio::test]
    async fn test_cancel_unknown_owner_is_none() {
        let mut svc: CountdownService<&str, ()> = CountdownService::default();
        assert_eq!(svc.cancel(&"nobody"), None);
        assert_eq!(svc.metrics().cancelled, 0);
    }
}
