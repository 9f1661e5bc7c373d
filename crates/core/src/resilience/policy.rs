//! Timeout, circuit breaking and fallback around one engine.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::breaker::{CircuitBreaker, CircuitSnapshot, CircuitState, Transition};
use super::config::CircuitConfig;
use crate::convert::{ConversionOptions, ConversionOutcome, TargetFormat};
use crate::engine::{ConversionEngine, EngineError};
use crate::metrics::{
    CIRCUIT_STATE, CIRCUIT_TRANSITIONS, CONVERSIONS_TOTAL, CONVERSION_DURATION,
    FALLBACK_ATTEMPTS, PRIMARY_ATTEMPTS,
};

/// Guards conversions to one target format.
///
/// One instance lives for the whole process per conversion operation; its
/// breaker is shared by every concurrent request.
pub struct ResiliencePolicy {
    target: TargetFormat,
    engine: Arc<dyn ConversionEngine>,
    breaker: Arc<Mutex<CircuitBreaker>>,
    timeout: Duration,
}

impl ResiliencePolicy {
    pub fn new(
        target: TargetFormat,
        engine: Arc<dyn ConversionEngine>,
        timeout: Duration,
        circuit: CircuitConfig,
    ) -> Self {
        CIRCUIT_STATE.with_label_values(&[target.pair()]).set(0);
        Self {
            target,
            engine,
            breaker: Arc::new(Mutex::new(CircuitBreaker::new(circuit))),
            timeout,
        }
    }

    pub fn target(&self) -> TargetFormat {
        self.target
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn snapshot(&self) -> CircuitSnapshot {
        self.breaker.lock().await.snapshot(Instant::now())
    }

    /// Closes the breaker and forgets recorded outcomes.
    pub async fn reset(&self) {
        let transition = self.breaker.lock().await.reset(Instant::now());
        if let Some(transition) = transition {
            on_transition(self.target, transition);
        }
        info!(pair = %self.target, "Circuit breaker reset");
    }

    /// Runs one conversion: breaker gate, timed primary attempt, then an
    /// untimed fallback with reduced options if the primary failed.
    pub async fn execute(&self, input: Bytes, options: ConversionOptions) -> ConversionOutcome {
        let started = Instant::now();
        let outcome = self.run(input, options).await;

        let labels = [self.target.pair(), outcome.kind()];
        CONVERSIONS_TOTAL.with_label_values(&labels).inc();
        CONVERSION_DURATION
            .with_label_values(&labels)
            .observe(started.elapsed().as_secs_f64());
        outcome
    }

    async fn run(&self, input: Bytes, options: ConversionOptions) -> ConversionOutcome {
        let target = self.target;

        let admitted = {
            let mut breaker = self.breaker.lock().await;
            let before = breaker.state();
            let admitted = breaker.try_acquire(Instant::now());
            let after = breaker.state();
            if before != after {
                on_transition(target, Transition { from: before, to: after });
            }
            admitted
        };

        let permit = match admitted {
            Ok(permit) => permit,
            Err(rejected) => {
                warn!(
                    pair = %target,
                    retry_in_ms = rejected.retry_in.as_millis() as u64,
                    "Circuit open, rejecting conversion without contacting engine"
                );
                PRIMARY_ATTEMPTS
                    .with_label_values(&[target.pair(), "circuit_open"])
                    .inc();
                return ConversionOutcome::CircuitOpen {
                    retry_in: rejected.retry_in,
                };
            }
        };
        let attempt_id = permit.attempt_id();
        debug!(pair = %target, attempt_id, mode = options.mode.as_str(), "Starting primary conversion");

        // Accounting happens inside the task so it completes even if the
        // caller stops waiting.
        let primary = {
            let engine = Arc::clone(&self.engine);
            let breaker = Arc::clone(&self.breaker);
            let input = input.clone();
            let limit = self.timeout;
            tokio::spawn(async move {
                let outcome = timed_attempt(engine, input, target, options, limit).await;
                let transition =
                    breaker
                        .lock()
                        .await
                        .record(permit, outcome.is_success(), Instant::now());
                if let Some(transition) = transition {
                    on_transition(target, transition);
                }
                outcome
            })
        };

        let primary = primary.await.unwrap_or_else(|e| {
            ConversionOutcome::EngineFailure(EngineError::aborted(e.to_string()))
        });
        PRIMARY_ATTEMPTS
            .with_label_values(&[target.pair(), primary.kind()])
            .inc();

        let failure = match primary {
            ConversionOutcome::Success(converted) => return ConversionOutcome::Success(converted),
            ConversionOutcome::CircuitOpen { retry_in } => {
                return ConversionOutcome::CircuitOpen { retry_in }
            }
            ConversionOutcome::TimedOut { after } => EngineError::Timeout {
                timeout_ms: after.as_millis() as u64,
            },
            ConversionOutcome::EngineFailure(e) => e,
        };

        warn!(
            pair = %target,
            attempt_id,
            error = %failure,
            "Primary conversion failed, using fallback conversion"
        );

        match fallback_attempt(Arc::clone(&self.engine), input, target).await {
            Ok(converted) => {
                FALLBACK_ATTEMPTS
                    .with_label_values(&[target.pair(), "success"])
                    .inc();
                info!(pair = %target, attempt_id, bytes = converted.len(), "Fallback conversion succeeded");
                ConversionOutcome::Success(converted)
            }
            Err(e) => {
                FALLBACK_ATTEMPTS
                    .with_label_values(&[target.pair(), "failure"])
                    .inc();
                error!(
                    pair = %target,
                    attempt_id,
                    primary_error = %failure,
                    fallback_error = %e,
                    "Fallback conversion failed"
                );
                ConversionOutcome::EngineFailure(e)
            }
        }
    }
}

/// Runs the engine in its own task bounded by `limit`. The task is aborted on
/// timeout and a panic inside the engine surfaces as a failure.
async fn timed_attempt(
    engine: Arc<dyn ConversionEngine>,
    input: Bytes,
    target: TargetFormat,
    options: ConversionOptions,
    limit: Duration,
) -> ConversionOutcome {
    let mut call = tokio::spawn(async move { engine.convert(input, target, &options).await });

    match tokio::time::timeout(limit, &mut call).await {
        Ok(Ok(Ok(converted))) => ConversionOutcome::Success(converted),
        Ok(Ok(Err(e))) => ConversionOutcome::EngineFailure(e),
        Ok(Err(join_error)) => {
            ConversionOutcome::EngineFailure(EngineError::aborted(join_error.to_string()))
        }
        Err(_) => {
            call.abort();
            ConversionOutcome::TimedOut { after: limit }
        }
    }
}

/// Runs the fallback in its own task with no time bound so an engine panic
/// still yields an error.
async fn fallback_attempt(
    engine: Arc<dyn ConversionEngine>,
    input: Bytes,
    target: TargetFormat,
) -> Result<Vec<u8>, EngineError> {
    let call = tokio::spawn(async move {
        engine
            .convert(input, target, &ConversionOptions::fallback())
            .await
    });
    call.await
        .unwrap_or_else(|join_error| Err(EngineError::aborted(join_error.to_string())))
}

fn on_transition(target: TargetFormat, transition: Transition) {
    CIRCUIT_TRANSITIONS
        .with_label_values(&[
            target.pair(),
            transition.from.as_str(),
            transition.to.as_str(),
        ])
        .inc();
    CIRCUIT_STATE
        .with_label_values(&[target.pair()])
        .set(crate::metrics::circuit_state_value(transition.to));

    match transition.to {
        CircuitState::Open => warn!(
            pair = %target,
            from = %transition.from,
            "Circuit breaker opened"
        ),
        _ => info!(
            pair = %target,
            from = %transition.from,
            to = %transition.to,
            "Circuit breaker state changed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockEngine, MockResponse};

    fn policy(engine: Arc<MockEngine>, timeout: Duration) -> ResiliencePolicy {
        ResiliencePolicy::new(
            TargetFormat::Docx,
            engine,
            timeout,
            CircuitConfig {
                failure_ratio: 0.6,
                volume_threshold: 4,
                window_size: 4,
                open_delay_ms: 1_000,
            },
        )
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let engine = Arc::new(MockEngine::new());
        let policy = policy(Arc::clone(&engine), Duration::from_secs(5));

        let outcome = policy
            .execute(Bytes::from_static(b"%PDF"), ConversionOptions::default())
            .await;
        assert!(outcome.is_success());
        assert_eq!(engine.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_fallback_uses_reduced_options() {
        let engine = Arc::new(MockEngine::new());
        engine
            .push_responses([
                MockResponse::failure("textbox recognition failed"),
                MockResponse::output(b"degraded".to_vec()),
            ])
            .await;
        let policy = policy(Arc::clone(&engine), Duration::from_secs(5));

        let options = ConversionOptions {
            mode: crate::convert::RecognitionMode::Textbox,
            recognize_bullets: Some(true),
            relative_horizontal_proximity: Some(1.5),
        };
        let outcome = policy.execute(Bytes::from_static(b"%PDF"), options.clone()).await;

        match outcome {
            ConversionOutcome::Success(bytes) => assert_eq!(bytes, b"degraded"),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let calls = engine.recorded_calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].options, options);
        assert_eq!(calls[1].options, ConversionOptions::fallback());
    }

    #[tokio::test]
    async fn test_engine_panic_counts_as_failure() {
        let engine = Arc::new(MockEngine::new());
        engine
            .push_responses([MockResponse::Panic, MockResponse::failure("still broken")])
            .await;
        let policy = policy(Arc::clone(&engine), Duration::from_secs(5));

        let outcome = policy
            .execute(Bytes::from_static(b"%PDF"), ConversionOptions::default())
            .await;
        assert!(matches!(outcome, ConversionOutcome::EngineFailure(_)));
        assert_eq!(policy.snapshot().await.failures, 1);
    }

    #[tokio::test]
    async fn test_fallback_panic_counts_as_failure() {
        let engine = Arc::new(MockEngine::new());
        engine
            .push_responses([MockResponse::failure("corrupt xref"), MockResponse::Panic])
            .await;
        let policy = policy(Arc::clone(&engine), Duration::from_secs(5));

        let outcome = policy
            .execute(Bytes::from_static(b"%PDF"), ConversionOptions::default())
            .await;
        match outcome {
            ConversionOutcome::EngineFailure(EngineError::Aborted { .. }) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(engine.call_count().await, 2);
        assert_eq!(policy.snapshot().await.failures, 1);
    }
}
