//! Invocation orchestrator
//!
//! Drives one [`GenerationRequest`] through an explicit state machine:
//!
//! ```text
//! Pending -> Attempting -> Succeeded
//!               |
//!               +-> Delaying -> Attempting ...
//!               |
//!               +-> Exhausted
//! ```
//!
//! Each attempt is raced against the request's per-attempt deadline. Every
//! transition is reported to an [`InvocationObserver`] and recorded on the
//! returned [`Invocation`], along with one [`AttemptRecord`] per attempt.

use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use super::backoff::BackoffSchedule;
use super::timeout::race;
use crate::config::ResilienceConfig;
use crate::core::GenerationRequest;
use crate::error::{FailureKind, GenGuardError, Result};

/// Which failures the orchestrator retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// Retry every failure until attempts run out
    #[default]
    #[serde(rename = "all")]
    RetryAll,

    /// Retry only transient remote failures and timeouts
    #[serde(rename = "transient_only")]
    TransientOnly,
}

impl RetryPolicy {
    /// Whether a failed attempt may be followed by another one
    pub fn allows(&self, error: &GenGuardError) -> bool {
        match self {
            RetryPolicy::RetryAll => true,
            RetryPolicy::TransientOnly => error.is_retryable(),
        }
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryPolicy::RetryAll => f.write_str("all"),
            RetryPolicy::TransientOnly => f.write_str("transient_only"),
        }
    }
}

impl FromStr for RetryPolicy {
    type Err = GenGuardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "all" | "retry_all" => Ok(RetryPolicy::RetryAll),
            "transient_only" | "transient" => Ok(RetryPolicy::TransientOnly),
            other => Err(GenGuardError::configuration(format!("Unknown retry policy: {}", other))),
        }
    }
}

/// Observable state of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InvocationState {
    Pending,
    Attempting { attempt_index: u32 },
    Delaying { attempt_index: u32, delay: Duration },
    Succeeded { attempt_index: u32 },
    Exhausted { attempts: u32 },
}

impl InvocationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvocationState::Succeeded { .. } | InvocationState::Exhausted { .. })
    }
}

/// How a single attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure { kind: FailureKind, reason: String },
}

impl AttemptOutcome {
    fn failure(error: &GenGuardError) -> Self {
        AttemptOutcome::Failure {
            kind: error.kind(),
            reason: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

/// Diagnostic record of one attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// Zero-based attempt index
    pub attempt_index: u32,

    pub started_at: DateTime<Utc>,

    pub outcome: AttemptOutcome,

    /// Delay scheduled before the next attempt, if one follows
    pub delay_before_next: Option<Duration>,
}

/// A state transition as reported to observers
#[derive(Debug, Clone, Serialize)]
pub struct InvocationEvent {
    pub request_id: Uuid,
    pub operation: &'static str,
    pub state: InvocationState,

    /// Failure that caused the transition, if any
    pub error: Option<String>,

    pub at: DateTime<Utc>,
}

/// Receives every state transition of every invocation
///
/// Observation is advisory: nothing an observer does changes the outcome.
pub trait InvocationObserver: Send + Sync {
    fn on_transition(&self, event: &InvocationEvent);
}

/// Observer that writes transitions to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl InvocationObserver for TracingObserver {
    fn on_transition(&self, event: &InvocationEvent) {
        match event.state {
            InvocationState::Pending => {}
            InvocationState::Attempting { attempt_index } => {
                debug!(request_id = %event.request_id, operation = event.operation, attempt_index, "Attempt started");
            }
            InvocationState::Delaying { attempt_index, delay } => {
                warn!(
                    request_id = %event.request_id,
                    operation = event.operation,
                    attempt_index,
                    delay_ms = delay.as_millis() as u64,
                    error = event.error.as_deref().unwrap_or_default(),
                    "Attempt failed, retrying after delay"
                );
            }
            InvocationState::Succeeded { attempt_index } => {
                info!(request_id = %event.request_id, operation = event.operation, attempt_index, "Invocation succeeded");
            }
            InvocationState::Exhausted { attempts } => {
                error!(
                    request_id = %event.request_id,
                    operation = event.operation,
                    attempts,
                    error = event.error.as_deref().unwrap_or_default(),
                    "Invocation exhausted all attempts"
                );
            }
        }
    }
}

/// Result of driving one request to a terminal state
#[derive(Debug)]
pub struct Invocation<T> {
    pub request_id: Uuid,

    /// The value of the first successful attempt, or [`GenGuardError::Exhausted`]
    pub result: Result<T>,

    /// One record per attempt, in order
    pub attempts: Vec<AttemptRecord>,

    /// Every state entered, in order
    pub transitions: Vec<InvocationState>,
}

impl<T> Invocation<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    /// Sum of every delay waited between attempts
    pub fn total_delay(&self) -> Duration {
        self.attempts
            .iter()
            .filter_map(|record| record.delay_before_next)
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    pub fn into_result(self) -> Result<T> {
        self.result
    }
}

enum Step {
    Attempt(u32),
    Delay { attempt_index: u32, delay: Duration },
}

/// Retry orchestrator for remote calls
#[derive(Clone)]
pub struct Orchestrator {
    backoff: BackoffSchedule,
    policy: RetryPolicy,
    observer: Arc<dyn InvocationObserver>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("backoff", &self.backoff)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(BackoffSchedule::default(), RetryPolicy::default())
    }
}

impl Orchestrator {
    /// Create an orchestrator that reports to [`TracingObserver`]
    pub fn new(backoff: BackoffSchedule, policy: RetryPolicy) -> Self {
        Self {
            backoff,
            policy,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Create an orchestrator from resilience settings
    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self::new(config.backoff(), config.retry_policy)
    }

    /// Replace the transition observer
    pub fn with_observer(mut self, observer: Arc<dyn InvocationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn backoff(&self) -> &BackoffSchedule {
        &self.backoff
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Drive `request` until an attempt succeeds or attempts run out
    ///
    /// `call` is invoked once per attempt with the zero-based attempt index
    /// and must produce an independent future each time. Never more than
    /// `request.max_attempts()` attempts are made.
    pub async fn invoke<T, F, Fut>(&self, request: &GenerationRequest, call: F) -> Invocation<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let span = tracing::info_span!(
            "invocation",
            request_id = %request.request_id(),
            operation = request.operation(),
        );

        self.run(request, call).instrument(span).await
    }

    async fn run<T, F, Fut>(&self, request: &GenerationRequest, mut call: F) -> Invocation<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let max_attempts = request.max_attempts().max(1);
        let deadline = request.per_attempt_timeout();
        let mut attempts = Vec::new();
        let mut transitions = Vec::new();

        self.enter(request, &mut transitions, InvocationState::Pending, None);
        let mut step = Step::Attempt(0);

        loop {
            step = match step {
                Step::Attempt(attempt_index) => {
                    self.enter(request, &mut transitions, InvocationState::Attempting { attempt_index }, None);
                    let started_at = Utc::now();

                    match race(call(attempt_index), deadline).await {
                        Ok(value) => {
                            attempts.push(AttemptRecord {
                                attempt_index,
                                started_at,
                                outcome: AttemptOutcome::Success,
                                delay_before_next: None,
                            });
                            self.enter(request, &mut transitions, InvocationState::Succeeded { attempt_index }, None);

                            return Invocation {
                                request_id: request.request_id(),
                                result: Ok(value),
                                attempts,
                                transitions,
                            };
                        }
                        Err(failure) => {
                            let retry = attempt_index + 1 < max_attempts && self.policy.allows(&failure);
                            let delay = retry.then(|| self.backoff.delay_for(attempt_index));

                            attempts.push(AttemptRecord {
                                attempt_index,
                                started_at,
                                outcome: AttemptOutcome::failure(&failure),
                                delay_before_next: delay,
                            });

                            match delay {
                                Some(delay) => {
                                    self.enter(
                                        request,
                                        &mut transitions,
                                        InvocationState::Delaying { attempt_index, delay },
                                        Some(&failure),
                                    );
                                    Step::Delay { attempt_index, delay }
                                }
                                None => {
                                    let made = attempt_index + 1;
                                    self.enter(
                                        request,
                                        &mut transitions,
                                        InvocationState::Exhausted { attempts: made },
                                        Some(&failure),
                                    );

                                    return Invocation {
                                        request_id: request.request_id(),
                                        result: Err(GenGuardError::exhausted(made, failure)),
                                        attempts,
                                        transitions,
                                    };
                                }
                            }
                        }
                    }
                }
                Step::Delay { attempt_index, delay } => {
                    tokio::time::sleep(delay).await;
                    Step::Attempt(attempt_index + 1)
                }
            };
        }
    }

    fn enter(
        &self,
        request: &GenerationRequest,
        transitions: &mut Vec<InvocationState>,
        state: InvocationState,
        failure: Option<&GenGuardError>,
    ) {
        transitions.push(state);

        let event = InvocationEvent {
            request_id: request.request_id(),
            operation: request.operation(),
            state,
            error: failure.map(ToString::to_string),
            at: Utc::now(),
        };

        if catch_unwind(AssertUnwindSafe(|| self.observer.on_transition(&event))).is_err() {
            warn!(request_id = %event.request_id, "Invocation observer panicked; ignoring");
        }
    }
}
