//! Failure-ratio circuit breaker.
//!
//! # States
//! - Closed: attempts pass through and are recorded in a rolling window
//! - Open: attempts are rejected until the cool-down elapses
//! - HalfOpen: exactly one trial attempt is in flight
//!
//! # Transitions
//! ```text
//! Closed   → Open:     window holds >= volume_threshold attempts and
//!                      failures / attempts >= failure_ratio
//! Open     → HalfOpen: first acquire after open_delay
//! HalfOpen → Closed:   trial succeeds (window cleared)
//! HalfOpen → Open:     trial fails (cool-down restarts)
//! ```
//!
//! The breaker is a plain value: time is passed in, nothing is locked here.
//! Callers share it behind a single mutex.

use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use super::config::CircuitConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admission ticket for one attempt. Must be handed back to
/// [`CircuitBreaker::record`] exactly once.
#[derive(Debug)]
#[must_use = "an admitted attempt must be recorded"]
pub struct Permit {
    attempt_id: u64,
}

impl Permit {
    pub fn attempt_id(&self) -> u64 {
        self.attempt_id
    }
}

/// Attempt rejected without reaching the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Circuit open, retry in {} ms", .retry_in.as_millis())]
pub struct CircuitOpenError {
    pub retry_in: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub attempts: usize,
    pub failures: usize,
    pub failure_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_in_ms: Option<u64>,
    pub trial_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitConfig,
    state: CircuitState,
    /// Most recent outcomes, `true` marks a failure.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    next_attempt_id: u64,
    /// Attempts admitted since the last transition and not yet recorded.
    outstanding: HashSet<u64>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitConfig) -> Self {
        let window = VecDeque::with_capacity(config.window_size);
        Self {
            config,
            state: CircuitState::Closed,
            window,
            opened_at: None,
            trial_in_flight: false,
            next_attempt_id: 0,
            outstanding: HashSet::new(),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    /// Admits or rejects one attempt. An open breaker whose cool-down has
    /// elapsed moves to half-open and admits the caller as its single trial.
    pub fn try_acquire(&mut self, now: Instant) -> Result<Permit, CircuitOpenError> {
        match self.state {
            CircuitState::Closed => Ok(self.issue_permit()),
            CircuitState::Open => {
                let retry_in = self.open_remaining(now);
                if !retry_in.is_zero() {
                    return Err(CircuitOpenError { retry_in });
                }
                self.transition(CircuitState::HalfOpen, now);
                self.trial_in_flight = true;
                Ok(self.issue_permit())
            }
            CircuitState::HalfOpen => {
                if self.trial_in_flight {
                    return Err(CircuitOpenError {
                        retry_in: Duration::ZERO,
                    });
                }
                self.trial_in_flight = true;
                Ok(self.issue_permit())
            }
        }
    }

    /// Records the outcome of an admitted attempt.
    ///
    /// Permits issued before the most recent transition are stale and
    /// ignored, so an abandoned attempt that reports late cannot move the
    /// breaker or count twice.
    pub fn record(&mut self, permit: Permit, success: bool, now: Instant) -> Option<Transition> {
        if !self.outstanding.remove(&permit.attempt_id) {
            return None;
        }

        match self.state {
            CircuitState::Closed => {
                self.window.push_back(!success);
                while self.window.len() > self.config.window_size {
                    self.window.pop_front();
                }
                if self.window.len() >= self.config.volume_threshold
                    && self.failure_ratio() >= self.config.failure_ratio
                {
                    Some(self.transition(CircuitState::Open, now))
                } else {
                    None
                }
            }
            CircuitState::HalfOpen => {
                self.trial_in_flight = false;
                let to = if success {
                    CircuitState::Closed
                } else {
                    CircuitState::Open
                };
                Some(self.transition(to, now))
            }
            CircuitState::Open => None,
        }
    }

    /// Forces the breaker closed with an empty window.
    pub fn reset(&mut self, now: Instant) -> Option<Transition> {
        let transition = if self.state == CircuitState::Closed {
            self.outstanding.clear();
            None
        } else {
            Some(self.transition(CircuitState::Closed, now))
        };
        self.window.clear();
        transition
    }

    pub fn failure_ratio(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.failures() as f64 / self.window.len() as f64
    }

    pub fn snapshot(&self, now: Instant) -> CircuitSnapshot {
        CircuitSnapshot {
            state: self.state,
            attempts: self.window.len(),
            failures: self.failures(),
            failure_ratio: self.failure_ratio(),
            retry_in_ms: match self.state {
                CircuitState::Open => Some(self.open_remaining(now).as_millis() as u64),
                _ => None,
            },
            trial_in_flight: self.trial_in_flight,
        }
    }

    fn failures(&self) -> usize {
        self.window.iter().filter(|failed| **failed).count()
    }

    fn open_remaining(&self, now: Instant) -> Duration {
        match self.opened_at {
            Some(opened_at) => (opened_at + self.config.open_delay()).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    fn issue_permit(&mut self) -> Permit {
        let attempt_id = self.next_attempt_id;
        self.next_attempt_id += 1;
        self.outstanding.insert(attempt_id);
        Permit { attempt_id }
    }

    fn transition(&mut self, to: CircuitState, now: Instant) -> Transition {
        let from = self.state;
        self.state = to;
        self.outstanding.clear();
        match to {
            CircuitState::Open => {
                self.opened_at = Some(now);
                self.trial_in_flight = false;
            }
            CircuitState::Closed => {
                self.window.clear();
                self.opened_at = None;
                self.trial_in_flight = false;
            }
            CircuitState::HalfOpen => {}
        }
        Transition { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitConfig {
        CircuitConfig {
            failure_ratio: 0.6,
            volume_threshold: 10,
            window_size: 10,
            open_delay_ms: 10_000,
        }
    }

    fn fail_n(breaker: &mut CircuitBreaker, n: usize, now: Instant) -> Option<Transition> {
        let mut last = None;
        for _ in 0..n {
            let permit = breaker.try_acquire(now).unwrap();
            last = breaker.record(permit, false, now).or(last);
        }
        last
    }

    fn trip(breaker: &mut CircuitBreaker, now: Instant) {
        fail_n(breaker, 10, now);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_stays_closed_below_volume_threshold() {
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new(config());

        assert!(fail_n(&mut breaker, 9, now).is_none());
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_ratio(), 1.0);
    }

    #[test]
    fn test_opens_at_volume_with_ratio_reached() {
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new(config());

        let transition = fail_n(&mut breaker, 10, now).unwrap();
        assert_eq!(
            transition,
            Transition {
                from: CircuitState::Closed,
                to: CircuitState::Open
            }
        );
    }

    #[test]
    fn test_ratio_below_threshold_stays_closed() {
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new(config());

        // 5 failures out of 10 = 0.5 < 0.6
        for i in 0..10 {
            let permit = breaker.try_acquire(now).unwrap();
            breaker.record(permit, i % 2 == 0, now);
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_ratio(), 0.5);
    }

    #[test]
    fn test_window_keeps_only_recent_attempts() {
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new(config());

        // 5 old failures pushed out by 10 successes
        fail_n(&mut breaker, 5, now);
        for _ in 0..10 {
            let permit = breaker.try_acquire(now).unwrap();
            breaker.record(permit, true, now);
        }
        assert_eq!(breaker.snapshot(now).attempts, 10);
        assert_eq!(breaker.failure_ratio(), 0.0);

        // 6 fresh failures reach 0.6 over the last 10
        let transition = fail_n(&mut breaker, 6, now);
        assert!(transition.is_some());
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_open_rejects_until_cool_down() {
        let t0 = Instant::now();
        let mut breaker = CircuitBreaker::new(config());
        trip(&mut breaker, t0);

        let err = breaker
            .try_acquire(t0 + Duration::from_secs(4))
            .unwrap_err();
        assert_eq!(err.retry_in, Duration::from_secs(6));
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_half_open_admits_single_trial() {
        let t0 = Instant::now();
        let mut breaker = CircuitBreaker::new(config());
        trip(&mut breaker, t0);

        let later = t0 + Duration::from_secs(10);
        let trial = breaker.try_acquire(later).unwrap();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        // Second caller during the trial is rejected
        assert!(breaker.try_acquire(later).is_err());
        assert!(breaker.try_acquire(later + Duration::from_secs(30)).is_err());

        breaker.record(trial, true, later);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_success_closes_and_clears_window() {
        let t0 = Instant::now();
        let mut breaker = CircuitBreaker::new(config());
        trip(&mut breaker, t0);

        let later = t0 + Duration::from_secs(11);
        let trial = breaker.try_acquire(later).unwrap();
        let transition = breaker.record(trial, true, later).unwrap();

        assert_eq!(transition.from, CircuitState::HalfOpen);
        assert_eq!(transition.to, CircuitState::Closed);
        assert_eq!(breaker.snapshot(later).attempts, 0);

        // A single new failure does not reopen
        assert!(fail_n(&mut breaker, 1, later).is_none());
    }

    #[test]
    fn test_half_open_failure_reopens_with_fresh_cool_down() {
        let t0 = Instant::now();
        let mut breaker = CircuitBreaker::new(config());
        trip(&mut breaker, t0);

        let trial_at = t0 + Duration::from_secs(12);
        let trial = breaker.try_acquire(trial_at).unwrap();
        let transition = breaker.record(trial, false, trial_at).unwrap();
        assert_eq!(transition.to, CircuitState::Open);

        // Cool-down counts from the failed trial, not the original trip
        let err = breaker
            .try_acquire(trial_at + Duration::from_secs(9))
            .unwrap_err();
        assert_eq!(err.retry_in, Duration::from_secs(1));
        assert!(breaker.try_acquire(trial_at + Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn test_stale_permit_is_ignored_after_transition() {
        let t0 = Instant::now();
        let mut breaker = CircuitBreaker::new(config());

        let straggler = breaker.try_acquire(t0).unwrap();
        trip(&mut breaker, t0);

        // The straggler reports after the breaker opened: no effect
        assert!(breaker.record(straggler, true, t0).is_none());
        assert_eq!(breaker.state(), CircuitState::Open);

        // Nor can it resolve a later half-open trial
        let later = t0 + Duration::from_secs(10);
        let trial = breaker.try_acquire(later).unwrap();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.snapshot(later).trial_in_flight);
        breaker.record(trial, false, later);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_reset_closes_open_breaker() {
        let t0 = Instant::now();
        let mut breaker = CircuitBreaker::new(config());
        trip(&mut breaker, t0);

        let transition = breaker.reset(t0).unwrap();
        assert_eq!(transition.to, CircuitState::Closed);
        assert!(breaker.try_acquire(t0).is_ok());
        assert_eq!(breaker.snapshot(t0).failures, 0);
    }

    #[test]
    fn test_snapshot_reports_retry_in_when_open() {
        let t0 = Instant::now();
        let mut breaker = CircuitBreaker::new(config());
        assert!(breaker.snapshot(t0).retry_in_ms.is_none());

        trip(&mut breaker, t0);
        let snapshot = breaker.snapshot(t0 + Duration::from_secs(3));
        assert_eq!(snapshot.state, CircuitState::Open);
        assert_eq!(snapshot.retry_in_ms, Some(7_000));
        assert_eq!(snapshot.failures, 10);
    }
}
