//! Structured events reported alongside every pipeline result

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{FailureKind, GenGuardError, Result, TRY_AGAIN_MESSAGE};
use crate::extraction::RepairKind;
use crate::resilience::{AttemptOutcome, Invocation};

/// Something notable that happened while serving a request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    AttemptFailed {
        operation: &'static str,
        chunk_index: Option<usize>,
        attempt_index: u32,
        kind: FailureKind,
        reason: String,
    },
    RetryScheduled {
        operation: &'static str,
        chunk_index: Option<usize>,
        attempt_index: u32,
        delay: Duration,
    },
    Succeeded {
        operation: &'static str,
        chunk_index: Option<usize>,
        attempts: u32,
    },
    Exhausted {
        operation: &'static str,
        chunk_index: Option<usize>,
        attempts: u32,
    },
    OutputRepaired {
        repairs: Vec<RepairKind>,
    },
    OutputUnrecoverable {
        reply_chars: usize,
    },
    /// Records that passed validation but could not be converted to typed values
    RecordsDiscarded {
        count: usize,
    },
    TextChunked {
        chunks: usize,
        oversized: usize,
    },
    ArtifactPersisted {
        chunk_index: usize,
    },
    FallbackEvaluated {
        rule: &'static str,
        reason: String,
    },
}

impl PipelineEvent {
    /// Events describing every attempt of an invocation and how it ended
    pub fn from_invocation<T>(
        invocation: &Invocation<T>,
        operation: &'static str,
        chunk_index: Option<usize>,
    ) -> Vec<PipelineEvent> {
        let mut events = Vec::new();

        for record in &invocation.attempts {
            if let AttemptOutcome::Failure { kind, reason } = &record.outcome {
                events.push(PipelineEvent::AttemptFailed {
                    operation,
                    chunk_index,
                    attempt_index: record.attempt_index,
                    kind: *kind,
                    reason: reason.clone(),
                });
            }

            if let Some(delay) = record.delay_before_next {
                events.push(PipelineEvent::RetryScheduled {
                    operation,
                    chunk_index,
                    attempt_index: record.attempt_index,
                    delay,
                });
            }
        }

        let attempts = invocation.attempt_count();
        events.push(if invocation.is_success() {
            PipelineEvent::Succeeded { operation, chunk_index, attempts }
        } else {
            PipelineEvent::Exhausted { operation, chunk_index, attempts }
        });

        events
    }
}

/// Terminal result of a pipeline operation
#[derive(Debug)]
pub struct PipelineReport<T> {
    pub request_id: Uuid,
    pub outcome: Result<T>,
    pub events: Vec<PipelineEvent>,
}

impl<T> PipelineReport<T> {
    pub fn new(request_id: Uuid, outcome: Result<T>, events: Vec<PipelineEvent>) -> Self {
        Self {
            request_id,
            outcome,
            events,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&GenGuardError> {
        self.outcome.as_ref().err()
    }

    /// Message for end users when the operation failed
    pub fn user_message(&self) -> Option<&'static str> {
        self.outcome.as_ref().err().map(|_| TRY_AGAIN_MESSAGE)
    }

    pub fn into_result(self) -> Result<T> {
        self.outcome
    }
}
