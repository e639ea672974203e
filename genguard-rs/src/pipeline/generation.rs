//! Generation pipeline
//!
//! Composes the orchestrator, the extractor and the chunker into the
//! user-facing operations: summaries, quizzes, arbitrary structured output
//! and chunked narration. Every successful artifact is handed to the
//! configured [`ArtifactSink`].

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{PipelineEvent, PipelineReport};
use super::prompts;
use super::quiz::{question_schema, QuizQuestion};
use crate::chunker::{chunk, clean_for_speech, Chunk};
use crate::config::ResilienceConfig;
use crate::core::{
    ArtifactPayload, ArtifactSink, AudioReference, GenerationRequest, GenerationService,
    PersistedArtifact, ServiceCall, SpeechSynthesisService, Voice,
};
use crate::error::{GenGuardError, Result};
use crate::extraction::{extract, ExtractionResult, ExtractionSchema};
use crate::resilience::{Invocation, Orchestrator};

/// One narrated chunk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarratedChunk {
    pub index: usize,
    pub char_count: usize,
    pub audio: AudioReference,
}

/// Audio for every chunk of a narrated text, in chunk order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioNarration {
    pub chunks: Vec<NarratedChunk>,
}

impl AudioNarration {
    /// Audio of the first chunk
    pub fn primary(&self) -> Option<&AudioReference> {
        self.chunks.first().map(|chunk| &chunk.audio)
    }
}

/// Generation operations guarded by retries, deadlines and output repair
pub struct GenerationPipeline {
    service: Arc<dyn GenerationService>,
    speech: Arc<dyn SpeechSynthesisService>,
    sink: Arc<dyn ArtifactSink>,
    orchestrator: Orchestrator,
    config: ResilienceConfig,
    default_voice: Voice,
}

impl GenerationPipeline {
    pub fn new(
        service: Arc<dyn GenerationService>,
        speech: Arc<dyn SpeechSynthesisService>,
        sink: Arc<dyn ArtifactSink>,
        config: ResilienceConfig,
    ) -> Self {
        Self {
            service,
            speech,
            sink,
            orchestrator: Orchestrator::from_config(&config),
            config,
            default_voice: Voice::default(),
        }
    }

    /// Replace the orchestrator, e.g. to attach a custom observer
    pub fn with_orchestrator(mut self, orchestrator: Orchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Voice used when a narration does not name one
    pub fn with_default_voice(mut self, voice: Voice) -> Self {
        self.default_voice = voice;
        self
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// A text request carrying this pipeline's attempt budget
    pub fn text_request(
        &self,
        operation: &'static str,
        message: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> GenerationRequest {
        GenerationRequest::new(operation, ServiceCall::text(message, system_prompt))
            .with_max_attempts(self.config.max_attempts)
    }

    /// Summarize `text` under the summary deadline
    pub async fn summarize(&self, text: &str) -> PipelineReport<String> {
        let request = self
            .text_request("summary", text, prompts::SUMMARY_SYSTEM_PROMPT)
            .with_timeout(self.config.summary_timeout());

        let mut events = Vec::new();
        let outcome = match require_input(text, "text to summarize") {
            Ok(()) => self.run_text(&request, &mut events).await,
            Err(e) => Err(e),
        };

        PipelineReport::new(request.request_id(), outcome, events)
    }

    /// Run an arbitrary text request and persist the reply
    pub async fn generate_text(&self, request: GenerationRequest) -> PipelineReport<String> {
        let mut events = Vec::new();
        let outcome = self.run_text(&request, &mut events).await;

        PipelineReport::new(request.request_id(), outcome, events)
    }

    /// Run a request whose reply must contain structured records
    pub async fn generate_structured(
        &self,
        request: GenerationRequest,
        schema: &ExtractionSchema,
    ) -> PipelineReport<Vec<Value>> {
        let mut events = Vec::new();
        let outcome = self.run_structured_and_persist(&request, schema, &mut events).await;

        PipelineReport::new(request.request_id(), outcome, events)
    }

    /// Generate up to `count` quiz questions from `source`
    pub async fn generate_quiz(&self, source: &str, count: usize) -> PipelineReport<Vec<QuizQuestion>> {
        let request = self.text_request("quiz", source, prompts::quiz_system_prompt(count));

        let mut events = Vec::new();
        let outcome = match (require_input(source, "quiz source"), count) {
            (Err(e), _) => Err(e),
            (Ok(()), 0) => Err(GenGuardError::invalid_input("question count must be at least 1")),
            (Ok(()), _) => self.run_quiz(&request, count, &mut events).await,
        };

        PipelineReport::new(request.request_id(), outcome, events)
    }

    /// Narrate `text`, one synthesis per chunk, in chunk order
    pub async fn narrate(&self, text: &str, voice: Option<Voice>) -> PipelineReport<AudioNarration> {
        let request_id = Uuid::new_v4();
        let voice = voice.unwrap_or(self.default_voice);

        let mut events = Vec::new();
        let outcome = self.run_narration(request_id, text, voice, &mut events).await;

        PipelineReport::new(request_id, outcome, events)
    }

    async fn invoke_text(&self, request: &GenerationRequest) -> Invocation<String> {
        debug!(service = self.service.name(), operation = request.operation(), "Invoking generation service");
        let service = Arc::clone(&self.service);
        let call = request.call().clone();

        self.orchestrator
            .invoke(request, move |_| {
                let service = Arc::clone(&service);
                let call = call.clone();
                async move { service.generate(&call).await?.into_content() }
            })
            .await
    }

    async fn run_text(&self, request: &GenerationRequest, events: &mut Vec<PipelineEvent>) -> Result<String> {
        let invocation = self.invoke_text(request).await;
        events.extend(PipelineEvent::from_invocation(&invocation, request.operation(), None));

        let text = invocation.into_result()?;
        self.persist(request.request_id(), 0, ArtifactPayload::Content(text.clone()), events)
            .await?;

        Ok(text)
    }

    async fn run_structured(
        &self,
        request: &GenerationRequest,
        schema: &ExtractionSchema,
        events: &mut Vec<PipelineEvent>,
    ) -> Result<(String, Vec<Value>)> {
        let invocation = self.invoke_text(request).await;
        events.extend(PipelineEvent::from_invocation(&invocation, request.operation(), None));
        let raw = invocation.into_result()?;

        match extract(&raw, schema) {
            ExtractionResult::Unrecoverable(raw) => {
                warn!(request_id = %request.request_id(), "No structured content recovered from reply");
                events.push(PipelineEvent::OutputUnrecoverable {
                    reply_chars: raw.chars().count(),
                });
                Err(GenGuardError::malformed_output(raw))
            }
            extracted => {
                if !extracted.repairs().is_empty() {
                    events.push(PipelineEvent::OutputRepaired {
                        repairs: extracted.repairs().to_vec(),
                    });
                }
                Ok((raw, extracted.into_items()?))
            }
        }
    }

    async fn run_structured_and_persist(
        &self,
        request: &GenerationRequest,
        schema: &ExtractionSchema,
        events: &mut Vec<PipelineEvent>,
    ) -> Result<Vec<Value>> {
        let (_, items) = self.run_structured(request, schema, events).await?;

        let serialized = serde_json::to_string(&items)?;
        self.persist(request.request_id(), 0, ArtifactPayload::Content(serialized), events)
            .await?;

        Ok(items)
    }

    async fn run_quiz(
        &self,
        request: &GenerationRequest,
        count: usize,
        events: &mut Vec<PipelineEvent>,
    ) -> Result<Vec<QuizQuestion>> {
        let (raw, items) = self.run_structured(request, &question_schema(count), events).await?;

        let total = items.len();
        let questions: Vec<QuizQuestion> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();

        if questions.len() < total {
            events.push(PipelineEvent::RecordsDiscarded {
                count: total - questions.len(),
            });
        }

        if questions.is_empty() {
            return Err(GenGuardError::malformed_output(raw));
        }

        let serialized = serde_json::to_string(&questions)?;
        self.persist(request.request_id(), 0, ArtifactPayload::Content(serialized), events)
            .await?;

        info!(request_id = %request.request_id(), requested = count, generated = questions.len(), "Quiz generated");
        Ok(questions)
    }

    async fn run_narration(
        &self,
        request_id: Uuid,
        text: &str,
        voice: Voice,
        events: &mut Vec<PipelineEvent>,
    ) -> Result<AudioNarration> {
        let cleaned = clean_for_speech(text);
        require_input(&cleaned, "text to narrate")?;

        let max_chunk_size = self.config.max_chunk_size;
        let chunks = chunk(&cleaned, max_chunk_size);
        events.push(PipelineEvent::TextChunked {
            chunks: chunks.len(),
            oversized: chunks.iter().filter(|c| c.is_oversized(max_chunk_size)).count(),
        });

        let mut syntheses = stream::iter(chunks)
            .map(|chunk| self.synthesize_chunk(request_id, chunk, voice))
            .buffered(self.config.audio_concurrency.max(1));

        let mut narrated = Vec::new();
        while let Some((chunk, invocation)) = syntheses.next().await {
            events.extend(PipelineEvent::from_invocation(&invocation, "narrate", Some(chunk.index)));
            let audio = invocation.into_result()?;

            self.persist(request_id, chunk.index, ArtifactPayload::AudioReference(audio.clone()), events)
                .await?;

            narrated.push(NarratedChunk {
                index: chunk.index,
                char_count: chunk.char_count,
                audio,
            });
        }

        Ok(AudioNarration { chunks: narrated })
    }

    async fn synthesize_chunk(
        &self,
        request_id: Uuid,
        chunk: Chunk,
        voice: Voice,
    ) -> (Chunk, Invocation<AudioReference>) {
        let request = GenerationRequest::new("narrate", ServiceCall::audio(chunk.text.clone(), voice))
            .with_request_id(request_id)
            .with_max_attempts(self.config.max_attempts)
            .with_timeout(self.config.audio_timeout());

        let speech = Arc::clone(&self.speech);
        let segment = chunk.text.clone();

        let invocation = self
            .orchestrator
            .invoke(&request, move |_| {
                let speech = Arc::clone(&speech);
                let segment = segment.clone();
                async move { speech.synthesize(&segment, voice).await }
            })
            .await;

        (chunk, invocation)
    }

    async fn persist(
        &self,
        request_id: Uuid,
        chunk_index: usize,
        payload: ArtifactPayload,
        events: &mut Vec<PipelineEvent>,
    ) -> Result<()> {
        self.sink
            .append(PersistedArtifact::new(request_id, chunk_index, payload))
            .await
            .map_err(|e| match e {
                GenGuardError::Persistence(_) => e,
                other => GenGuardError::persistence(other.to_string()),
            })?;

        events.push(PipelineEvent::ArtifactPersisted { chunk_index });
        Ok(())
    }
}

fn require_input(text: &str, what: &str) -> Result<()> {
    if text.trim().is_empty() {
        Err(GenGuardError::invalid_input(format!("{} is empty", what)))
    } else {
        Ok(())
    }
}
