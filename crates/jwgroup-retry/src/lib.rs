//! Bounded retry with exponential backoff.
//!
//! Backend calls that can fail transiently (the role lookup, in practice)
//! are wrapped in [`retry`]. The schedule is deterministic by default:
//!
//! ```text
//! attempt 1 ──fail──▶ sleep D ──▶ attempt 2 ──fail──▶ sleep D·M ──▶ attempt 3 ...
//! ```
//!
//! up to `max_retries` extra attempts after the first one. Once the budget
//! is spent the last error is returned inside [`RetryError::Exhausted`];
//! the caller decides what a safe default is.
//!
//! # Time
//!
//! Sleeps go through `tokio::time`, so tests can run the whole schedule
//! under `#[tokio::test(start_paused = true)]` and assert exact elapsed
//! durations without waiting in real time.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How many times to retry and how long to wait in between.
///
/// Durations are milliseconds so the policy reads naturally from JSON
/// config (`{"initial_delay_ms": 1000}`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure. 0 = try once.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Factor applied to the delay after every retry. Must be ≥ 1.0.
    pub multiplier: f64,
    /// Upper bound for any single delay.
    pub max_delay_ms: u64,
    /// Random extra delay (0..=jitter_ms) added to every sleep so many
    /// clients failing at once don't retry in lockstep. Default: 0.
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
            multiplier: 1.5,
            max_delay_ms: 30_000,
            jitter_ms: 0,
        }
    }
}

impl RetryPolicy {
    /// Hard cap on retries. Anything above this is a config mistake.
    pub const MAX_RETRIES: u32 = 16;

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Clamp and fix any out-of-range values so the policy is safe to use.
    ///
    /// Called automatically by [`Backoff::new`]. Rules:
    /// - `max_retries` capped to [`Self::MAX_RETRIES`].
    /// - `multiplier` below 1.0 (or NaN) reset to 1.0.
    /// - `max_delay_ms` forced ≥ `initial_delay_ms`.
    pub fn validated(mut self) -> Self {
        if self.max_retries > Self::MAX_RETRIES {
            warn!(
                max_retries = self.max_retries,
                cap = Self::MAX_RETRIES,
                "max_retries exceeds cap, clamping"
            );
            self.max_retries = Self::MAX_RETRIES;
        }
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            warn!(multiplier = self.multiplier, "multiplier below 1.0, using 1.0");
            self.multiplier = 1.0;
        }
        if self.max_delay_ms < self.initial_delay_ms {
            self.max_delay_ms = self.initial_delay_ms;
        }
        self
    }

    /// The first delay as a `Duration`.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Backoff schedule
// ---------------------------------------------------------------------------

/// The state of one retry sequence: remaining budget and the next delay.
///
/// Create one per logical operation. It is not shared; each retry sequence
/// (e.g. one role lookup for one subject) owns its own.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    remaining: u32,
    next_delay: Duration,
}

impl Backoff {
    /// Starts a fresh schedule with the full retry budget.
    pub fn new(policy: RetryPolicy) -> Self {
        let policy = policy.validated();
        Self {
            remaining: policy.max_retries,
            next_delay: policy.initial_delay(),
            policy,
        }
    }

    /// Retries left in the budget.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// The delay the next retry will wait (before jitter).
    pub fn peek_delay(&self) -> Duration {
        self.next_delay
    }

    /// Consumes one retry and returns how long to wait before it, or
    /// `None` if the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let delay = self.next_delay;
        let max = Duration::from_millis(self.policy.max_delay_ms);
        let grown = delay.as_secs_f64() * self.policy.multiplier;
        // An overflowing product saturates at the cap.
        self.next_delay = Duration::try_from_secs_f64(grown).map_or(max, |d| d.min(max));

        let jitter = if self.policy.jitter_ms > 0 {
            let ms = rand::rng().random_range(0..=self.policy.jitter_ms);
            Duration::from_millis(ms)
        } else {
            Duration::ZERO
        };
        Some(delay + jitter)
    }

    /// Sleeps for the next delay. Returns `false` without sleeping if the
    /// budget is spent.
    pub async fn wait(&mut self) -> bool {
        match self.next_delay() {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// retry()
// ---------------------------------------------------------------------------

/// Why a retried operation gave up.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    /// Every attempt failed. `source` is the last error seen.
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },
}

impl<E: std::error::Error + 'static> RetryError<E> {
    /// Total attempts made, including the first.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// The last error seen.
    pub fn into_source(self) -> E {
        match self {
            Self::Exhausted { source, .. } => source,
        }
    }
}

/// Runs `op` until it returns `Ok` or the policy's budget is spent.
///
/// Only `Err` triggers a retry. An `Ok` carrying a "negative" answer
/// (e.g. `Ok(None)` for "no such row") is a definitive result and is
/// returned immediately.
///
/// `what` names the operation in log lines.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    what: impl fmt::Display,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: std::error::Error + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = Backoff::new(policy.clone());
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match op().await {
            Ok(value) => {
                if attempts > 1 {
                    debug!(%what, attempts, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                let Some(delay) = backoff.next_delay() else {
                    return Err(RetryError::Exhausted {
                        attempts,
                        source: err,
                    });
                };
                warn!(
                    %what,
                    attempt = attempts,
                    retries_left = backoff.remaining(),
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
