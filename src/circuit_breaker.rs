//! # Circuit Breaker Module
//!
//! Per-service circuit breaker for the external APIs. After repeated
//! failures the breaker opens and calls fail fast until the reset window
//! has passed.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::settings::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker guarding one external service
///
/// # State Machine
///
/// - **Closed**: Normal operation, requests pass through
/// - **Open**: Failure threshold reached, requests fail fast
/// - **Reset**: Once `circuit_breaker_reset_secs` have passed since the last
///   failure, the next check closes the breaker again
#[derive(Debug)]
pub struct CircuitBreaker {
    service: &'static str,
    state: Mutex<BreakerState>,
    config: RecoveryConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker for `service`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use macrocalbot::settings::RecoveryConfig;
    /// use macrocalbot::circuit_breaker::CircuitBreaker;
    ///
    /// let breaker = CircuitBreaker::new("vision", RecoveryConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(service: &'static str, config: RecoveryConfig) -> Self {
        Self {
            service,
            state: Mutex::new(BreakerState::default()),
            config,
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Check if the breaker is open (blocking requests)
    pub fn is_open(&self) -> bool {
        let mut state = self.lock();

        if state.failure_count >= self.config.circuit_breaker_threshold {
            if let Some(last_time) = state.last_failure_time {
                if last_time.elapsed() < Duration::from_secs(self.config.circuit_breaker_reset_secs)
                {
                    return true;
                }
                log::info!("Circuit breaker for {} reset after cool-down", self.service);
                *state = BreakerState::default();
            }
        }
        false
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());

        if state.failure_count == self.config.circuit_breaker_threshold {
            log::warn!(
                "Circuit breaker for {} opened after {} consecutive failures",
                self.service,
                state.failure_count
            );
        }
    }

    /// Record a successful call, closing the breaker
    pub fn record_success(&self) {
        *self.lock() = BreakerState::default();
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_breaker_state_transitions() {
        let config = RecoveryConfig {
            circuit_breaker_threshold: 2,
            ..Default::default()
        };
        let breaker = CircuitBreaker::new("vision", config);

        assert!(!breaker.is_open());

        breaker.record_failure();
        assert!(!breaker.is_open()); // Still closed (1 failure)

        breaker.record_failure();
        assert!(breaker.is_open()); // Now open (2 failures)

        breaker.record_success();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn test_circuit_breaker_resets_after_timeout() {
        let config = RecoveryConfig {
            circuit_breaker_threshold: 1,
            circuit_breaker_reset_secs: 0,
            ..Default::default()
        };
        let breaker = CircuitBreaker::new("nutritionix", config);

        breaker.record_failure();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }
}
