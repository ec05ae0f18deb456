//! # Retry Module
//!
//! Bounded exponential backoff with jitter for external API calls, guarded
//! by a [`CircuitBreaker`] and a per-attempt timeout.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::service_errors::ServiceError;
use crate::settings::RecoveryConfig;

/// Delay in milliseconds before retry number `attempt` (1-based)
///
/// `base * 2^(attempt-1)`, capped at `max_retry_delay_ms`, plus up to 10% jitter.
pub fn calculate_retry_delay(attempt: u32, recovery: &RecoveryConfig) -> u64 {
    let exponent = attempt.saturating_sub(1).min(16);
    let delay = recovery
        .base_retry_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(recovery.max_retry_delay_ms);

    let jitter_max = delay / 10;
    if jitter_max == 0 {
        return delay;
    }
    delay + rand::thread_rng().gen_range(0..=jitter_max)
}

/// Run `operation` with the breaker, timeout and retry policy applied
pub async fn with_retry<T, F, Fut>(
    breaker: &CircuitBreaker,
    recovery: &RecoveryConfig,
    mut operation: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let service = breaker.service();
    if breaker.is_open() {
        warn!(service, "Circuit breaker open, failing fast");
        return Err(ServiceError::CircuitOpen(service));
    }

    let timeout = Duration::from_secs(recovery.operation_timeout_secs);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = match tokio::time::timeout(timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout {
                service,
                seconds: recovery.operation_timeout_secs,
            }),
        };

        match result {
            Ok(value) => {
                breaker.record_success();
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => {
                debug!(service, error = %e, "Non-retryable error");
                breaker.record_failure();
                return Err(e);
            }
            Err(e) if attempt > recovery.max_retries => {
                warn!(service, attempts = attempt, error = %e, "Giving up after retries");
                breaker.record_failure();
                return Err(e);
            }
            Err(e) => {
                let delay = calculate_retry_delay(attempt, recovery);
                warn!(
                    service,
                    attempt,
                    delay_ms = delay,
                    error = %e,
                    "Retryable error, backing off"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}
