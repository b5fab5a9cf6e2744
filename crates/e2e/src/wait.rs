//! Synchronization primitives for a UI with no completion signal
//!
//! The remote page never says "done", so callers express readiness as a
//! predicate and wait until it holds or a deadline passes. Polling backs off
//! geometrically so a slow page is not hammered with DOM queries.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

/// Geometric poll interval schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub factor: u32,
    pub max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, factor: u32, max: Duration) -> Self {
        Self { initial, factor, max }
    }

    /// Constant interval, no growth
    pub fn fixed(interval: Duration) -> Self {
        Self::new(interval, 1, interval)
    }

    pub fn intervals(&self) -> BackoffIter {
        BackoffIter {
            next: self.initial.min(self.max),
            factor: self.factor.max(1),
            max: self.max,
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), 2, Duration::from_secs(1))
    }
}

/// Endless iterator over poll intervals
#[derive(Debug, Clone)]
pub struct BackoffIter {
    next: Duration,
    factor: u32,
    max: Duration,
}

impl Iterator for BackoffIter {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = current
            .checked_mul(self.factor)
            .unwrap_or(self.max)
            .min(self.max);
        Some(current)
    }
}

/// Deadline plus poll schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub backoff: Backoff,
}

impl WaitOptions {
    pub fn new(timeout: Duration, backoff: Backoff) -> Self {
        Self { timeout, backoff }
    }
}

/// The predicate did not hold before the deadline
#[derive(Debug)]
pub struct WaitError<E> {
    pub waited: Duration,
    pub polls: u32,
    /// Last transient error reported by the probe, if any
    pub last_error: Option<E>,
}

impl<E: fmt::Display> fmt::Display for WaitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "condition not met after {} ms ({} polls)",
            self.waited.as_millis(),
            self.polls
        )?;
        if let Some(err) = &self.last_error {
            write!(f, ", last error: {}", err)?;
        }
        Ok(())
    }
}

/// Poll `probe` until it yields a value or `options.timeout` elapses.
///
/// The probe returns `Ok(Some(v))` when the condition holds, `Ok(None)` to
/// keep waiting and `Err(e)` for a transient failure, which is remembered and
/// polled through. The probe runs at least once, and once more at the
/// deadline. A probe still pending at the deadline is dropped and counts as
/// a miss.
pub async fn wait_until<T, E, F, Fut>(options: &WaitOptions, mut probe: F) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = Instant::now();
    let deadline = start + options.timeout;
    let mut intervals = options.backoff.intervals();
    let mut polls = 0u32;
    let mut last_error = None;

    loop {
        polls += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, probe()).await {
            Ok(Ok(Some(value))) => {
                debug!("Condition met after {} poll(s)", polls);
                return Ok(value);
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => last_error = Some(e),
            Err(_) => {
                debug!("Poll {} still pending at the deadline", polls);
                return Err(WaitError {
                    waited: start.elapsed(),
                    polls,
                    last_error,
                });
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError {
                waited: now - start,
                polls,
                last_error,
            });
        }

        let interval = intervals.next().unwrap_or(options.backoff.max);
        sleep(interval.min(deadline - now)).await;
    }
}

/// Bounded attempts with a fixed pause between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least one is always made
    pub attempts: u32,
    pub delay: Duration,
}

/// Every attempt failed
#[derive(Debug)]
pub struct RetryError<E> {
    pub attempts: u32,
    pub last: E,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Run `op` (given the 1-based attempt number) until it succeeds.
    ///
    /// Sleeps `delay` between failed attempts, never after the last one.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!("Attempt {}/{} failed: {}", attempt, attempts, e);
                    sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(RetryError { attempts, last: e }),
            }
        }
    }
}
