//! # GenGuard
//!
//! A resilience layer for applications that depend on a remote, unreliable
//! text and audio generation service.
//!
//! This crate provides:
//!
//! - Retry orchestration with deterministic exponential backoff
//! - Per-attempt deadlines that abandon slow calls without cancelling them
//! - Recovery of structured content from loosely formatted replies
//! - Sentence-aware chunking of long text for speech synthesis
//! - A rule-based fallback when remote answer evaluation is unavailable
//!
//! ## Architecture
//!
//! - `GenerationService` / `SpeechSynthesisService`: The remote edges, implemented over HTTP
//! - `Orchestrator`: Drives a request through attempts, delays and deadlines
//! - `extraction`: Locates, repairs and validates JSON inside a reply
//! - `GenerationPipeline` / `EvaluationPipeline`: The user-facing operations
//! - `ArtifactSink`: Where generated artifacts end up
//! - `GenGuardError`: Error classification shared by every component

// Re-export core modules
pub mod core;
pub use core::{
    ArtifactSink, AudioReference, GenerationRequest, GenerationService, ServiceCall, ServiceReply,
    SpeechSynthesisService, Voice,
};

// Re-export error handling
pub mod error;
pub use error::{FailureKind, GenGuardError, Result};

// Re-export resilience patterns
pub mod resilience;
pub use resilience::{BackoffSchedule, Invocation, InvocationObserver, Orchestrator, RetryPolicy};

// Content handling
pub mod chunker;
pub mod evaluator;
pub mod extraction;
pub use evaluator::{EvaluationOutcome, HeuristicEvaluator};
pub use extraction::{ExtractionResult, ExtractionSchema};

// Pipelines
pub mod pipeline;
pub use pipeline::{EvaluationPipeline, GenerationPipeline, PipelineEvent, PipelineReport};

// Service implementations
pub mod services;
pub use services::{HttpGenerationClient, MemoryArtifactSink};

// Re-export configuration management
pub mod config;
pub use config::{ConfigProvider, GenerationServiceConfig, ResilienceConfig, ServiceConfig};

pub mod logging;

// Utility module for common functionality
mod util;

#[cfg(test)]
mod tests;
