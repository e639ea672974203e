//! Data types shared between the orchestrator, the pipelines and the services

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GenGuardError;

/// Voice presets accepted by the speech endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Fable,
    Nova,
    Onyx,
    Sage,
    Shimmer,
}

impl Voice {
    /// Every preset, in declaration order
    pub const ALL: [Voice; 10] = [
        Voice::Alloy,
        Voice::Ash,
        Voice::Ballad,
        Voice::Coral,
        Voice::Echo,
        Voice::Fable,
        Voice::Nova,
        Voice::Onyx,
        Voice::Sage,
        Voice::Shimmer,
    ];

    /// Wire name of the preset
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Ash => "ash",
            Voice::Ballad => "ballad",
            Voice::Coral => "coral",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Nova => "nova",
            Voice::Onyx => "onyx",
            Voice::Sage => "sage",
            Voice::Shimmer => "shimmer",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = GenGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Voice::ALL
            .into_iter()
            .find(|voice| voice.as_str() == wanted)
            .ok_or_else(|| GenGuardError::invalid_input(format!("Unknown voice: {}", s)))
    }
}

/// Opaque reference to a synthesized audio artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioReference(pub String);

impl AudioReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AudioReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One request as sent to the generation service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCall {
    /// Text payload
    pub message: String,

    /// Instructions framing the payload
    pub system_prompt: String,

    /// Voice for audio generation
    pub voice: Option<Voice>,

    /// Whether an audio reference is requested instead of text
    pub generate_audio: bool,
}

impl ServiceCall {
    /// A text generation call
    pub fn text(message: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            system_prompt: system_prompt.into(),
            voice: None,
            generate_audio: false,
        }
    }

    /// An audio generation call for one segment
    pub fn audio(segment: impl Into<String>, voice: Voice) -> Self {
        Self {
            message: segment.into(),
            system_prompt: String::new(),
            voice: Some(voice),
            generate_audio: true,
        }
    }
}

/// Reply returned by the generation service
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceReply {
    /// Generated text
    Content(String),

    /// Reference to generated audio
    Audio(AudioReference),
}

impl ServiceReply {
    /// Text content, or a parsing error if the reply carried audio
    pub fn into_content(self) -> crate::Result<String> {
        match self {
            ServiceReply::Content(text) => Ok(text),
            ServiceReply::Audio(_) => Err(GenGuardError::parsing("expected text content, got an audio reference")),
        }
    }

    /// Audio reference, or a parsing error if the reply carried text
    pub fn into_audio(self) -> crate::Result<AudioReference> {
        match self {
            ServiceReply::Audio(reference) => Ok(reference),
            ServiceReply::Content(_) => Err(GenGuardError::parsing("expected an audio reference, got text content")),
        }
    }
}

/// An immutable description of one logical generation request
///
/// Built once by a pipeline and then handed to the orchestrator; every
/// attempt of the request issues the same [`ServiceCall`].
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    request_id: Uuid,
    operation: &'static str,
    call: ServiceCall,
    max_attempts: u32,
    per_attempt_timeout: Option<Duration>,
}

impl GenerationRequest {
    /// Create a request with a fresh identifier and a single attempt
    pub fn new(operation: &'static str, call: ServiceCall) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            operation,
            call,
            max_attempts: 1,
            per_attempt_timeout: None,
        }
    }

    /// Use an existing request identifier
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    /// Set the total number of attempts, including the first
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the deadline applied to each attempt
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.per_attempt_timeout = timeout;
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn call(&self) -> &ServiceCall {
        &self.call
    }

    pub fn payload(&self) -> &str {
        &self.call.message
    }

    pub fn system_prompt(&self) -> &str {
        &self.call.system_prompt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn per_attempt_timeout(&self) -> Option<Duration> {
        self.per_attempt_timeout
    }
}

/// What an artifact holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ArtifactPayload {
    Content(String),
    AudioReference(AudioReference),
}

/// A generated artifact as handed to an [`ArtifactSink`](super::ArtifactSink)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedArtifact {
    /// Logical request that produced the artifact
    pub request_id: Uuid,

    /// Position of the chunk within the request, 0 for single-part results
    pub chunk_index: usize,

    pub payload: ArtifactPayload,

    pub created_at: DateTime<Utc>,
}

impl PersistedArtifact {
    pub fn new(request_id: Uuid, chunk_index: usize, payload: ArtifactPayload) -> Self {
        Self {
            request_id,
            chunk_index,
            payload,
            created_at: Utc::now(),
        }
    }
}
