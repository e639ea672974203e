//! Core abstractions for GenGuard
//!
//! This module provides the trait interfaces at the edges of the resilience
//! layer. Everything remote or persistent is reached through one of them:
//!
//! - `GenerationService`: Produces text (or audio) from a message and system prompt
//! - `SpeechSynthesisService`: Turns one text segment into an audio reference
//! - `ArtifactSink`: Stores generated artifacts keyed by request and chunk

pub mod types;
pub use types::{
    ArtifactPayload, AudioReference, GenerationRequest, PersistedArtifact, ServiceCall,
    ServiceReply, Voice,
};

use async_trait::async_trait;

use crate::error::Result;

/// A remote service that generates content
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Service name used in log lines
    fn name(&self) -> &str;

    /// Issue one call and return the raw reply
    async fn generate(&self, call: &ServiceCall) -> Result<ServiceReply>;
}

/// A remote service that synthesizes speech
#[async_trait]
pub trait SpeechSynthesisService: Send + Sync {
    /// Synthesize a single text segment with the given voice
    async fn synthesize(&self, segment: &str, voice: Voice) -> Result<AudioReference>;
}

/// Destination for generated artifacts
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Store one artifact
    async fn append(&self, artifact: PersistedArtifact) -> Result<()>;
}
