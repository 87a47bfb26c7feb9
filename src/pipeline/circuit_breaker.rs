//! Circuit Breaker pattern implementation.
//!
//! Stops the crawler from hammering a portal that keeps failing. The breaker
//! wraps the upstream call only; a body that fails to parse after a
//! successful call does not count as a failure here.
//!
//! ## States
//!
//! - `Closed`: calls pass; consecutive failures are counted and reaching
//!   the threshold opens the breaker.
//! - `Open`: calls are denied until the recovery timeout has elapsed since
//!   the last failure; the next check then moves to `HalfOpen`.
//! - `HalfOpen`: exactly one probe call passes. Success closes the breaker,
//!   failure reopens it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::BreakerConfig;

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the breaker. Default: 5
    pub failure_threshold: u32,
    /// Time an open breaker waits before allowing a probe. Default: 300s
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(300),
        }
    }
}

impl From<&BreakerConfig> for CircuitBreakerConfig {
    fn from(config: &BreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            recovery_timeout: Duration::from_secs(config.recovery_timeout_secs),
        }
    }
}

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitStatus {
    Closed,
    Open,
    HalfOpen,
}

/// Mutable breaker state for one crawl run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitState {
    pub status: CircuitStatus,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl Default for CircuitState {
    fn default() -> Self {
        Self {
            status: CircuitStatus::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
        }
    }
}

/// Circuit breaker guarding upstream calls.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: CircuitState,
    probe_in_flight: bool,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default configuration.
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    /// Create a new circuit breaker with custom configuration.
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: CircuitState::default(),
            probe_in_flight: false,
        }
    }

    pub fn state(&self) -> &CircuitState {
        &self.state
    }

    pub fn status(&self) -> CircuitStatus {
        self.state.status
    }

    /// Check whether a call may go through now.
    pub fn allow_request(&mut self) -> bool {
        self.allow_request_at(Utc::now())
    }

    /// Check whether a call may go through at `now`.
    ///
    /// An open breaker becomes half-open here, on the first check after the
    /// recovery timeout, not on a timer.
    pub fn allow_request_at(&mut self, now: DateTime<Utc>) -> bool {
        match self.state.status {
            CircuitStatus::Closed => true,
            CircuitStatus::Open => {
                if self.recovery_elapsed(now) {
                    log::info!("Circuit breaker: HALF_OPEN (probing upstream)");
                    self.state.status = CircuitStatus::HalfOpen;
                    self.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitStatus::HalfOpen => {
                if self.probe_in_flight {
                    false
                } else {
                    self.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Record a successful upstream call.
    pub fn record_success(&mut self) {
        if self.state.status == CircuitStatus::Open {
            return;
        }
        if self.state.status == CircuitStatus::HalfOpen {
            log::info!("Circuit breaker: CLOSED (probe succeeded)");
        }
        self.state.status = CircuitStatus::Closed;
        self.state.consecutive_failures = 0;
        self.probe_in_flight = false;
    }

    /// Record a failed upstream call.
    pub fn record_failure(&mut self) {
        self.record_failure_at(Utc::now());
    }

    /// Record a failed upstream call at `now`.
    pub fn record_failure_at(&mut self, now: DateTime<Utc>) {
        self.state.consecutive_failures += 1;
        match self.state.status {
            CircuitStatus::Closed => {
                if self.state.consecutive_failures >= self.config.failure_threshold {
                    log::error!(
                        "Circuit breaker: OPEN after {} consecutive failures",
                        self.state.consecutive_failures
                    );
                    self.open(now);
                }
            }
            CircuitStatus::HalfOpen => {
                log::warn!("Circuit breaker: OPEN (probe failed)");
                self.open(now);
            }
            CircuitStatus::Open => {
                self.state.last_failure_at = Some(now);
            }
        }
    }

    fn open(&mut self, now: DateTime<Utc>) {
        self.state.status = CircuitStatus::Open;
        self.state.last_failure_at = Some(now);
        self.probe_in_flight = false;
    }

    fn recovery_elapsed(&self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.state.last_failure_at else {
            return true;
        };
        let elapsed = now.signed_duration_since(last);
        match chrono::Duration::from_std(self.config.recovery_timeout) {
            Ok(timeout) => elapsed > timeout,
            Err(_) => false,
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}
