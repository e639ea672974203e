//! Resilience patterns for remote generation calls
//!
//! This module provides the pieces the pipelines compose around every
//! remote call:
//! - Deterministic exponential backoff schedule
//! - Deadline race that abandons (without cancelling) slow calls
//! - Invocation orchestrator driving attempts through an explicit state machine

mod backoff;
mod orchestrator;
mod timeout;

pub use backoff::BackoffSchedule;
pub use orchestrator::{
    AttemptOutcome, AttemptRecord, Invocation, InvocationEvent, InvocationObserver,
    InvocationState, Orchestrator, RetryPolicy, TracingObserver,
};
pub use timeout::race;
