//! HTTP generation service client
//!
//! Talks to a single JSON endpoint that accepts
//! `{message, systemPrompt, voice?, generateAudio?}` and answers with
//! `{content}` for text or `{audioUrl}` for audio. Non-2xx statuses and
//! `{error}` bodies become [`GenGuardError`]s; retrying is left to the
//! orchestrator.

mod models;

pub use models::{GenerateBody, GenerateReplyBody};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::{debug, warn};

use crate::config::{ConfigProvider, GenerationServiceConfig, ServiceConfig, DEFAULT_PROVIDER};
use crate::core::{AudioReference, GenerationService, ServiceCall, ServiceReply, SpeechSynthesisService, Voice};
use crate::error::{GenGuardError, Result};
use crate::services::common::{build_http_client, parse_error_response, UserAgent};
use crate::util::preview;

/// Generation service client over HTTP
#[derive(Debug, Clone)]
pub struct HttpGenerationClient {
    /// HTTP client
    http_client: Client,

    /// Configuration
    config: GenerationServiceConfig,
}

impl HttpGenerationClient {
    /// Create a client from validated configuration
    pub fn new(config: GenerationServiceConfig) -> Result<Self> {
        config.validate()?;

        let http_client = build_http_client(
            Some(UserAgent {
                extra: Some("generation-client".to_string()),
                ..UserAgent::default()
            }),
            Some(Duration::from_secs(config.request_timeout_secs)),
        )?;

        Ok(Self { http_client, config })
    }

    /// Create a client from `GENGUARD_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_provider(&**DEFAULT_PROVIDER)
    }

    /// Create a client from any configuration provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        Self::new(GenerationServiceConfig::from_provider(provider)?)
    }

    /// Create a new builder
    pub fn builder() -> HttpGenerationClientBuilder {
        HttpGenerationClientBuilder::default()
    }

    pub fn config(&self) -> &GenerationServiceConfig {
        &self.config
    }

    async fn post(&self, call: &ServiceCall) -> Result<GenerateReplyBody> {
        let body = GenerateBody {
            message: &call.message,
            system_prompt: &call.system_prompt,
            voice: call.voice,
            generate_audio: call.generate_audio,
        };

        debug!(
            service = self.name(),
            endpoint = %self.config.endpoint,
            audio = call.generate_audio,
            message = %preview(&call.message, 80),
            "Sending generation request"
        );

        let mut request = self.http_client.post(&self.config.endpoint).json(&body);
        if let Some(ref api_key) = self.config.api_key {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", api_key));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let error = parse_error_response(response).await;
            warn!(error = %error, "Generation service returned an error status");
            return Err(error);
        }

        let text = response.text().await?;
        let mut reply: GenerateReplyBody = serde_json::from_str(&text)?;

        if let Some(message) = reply.error.take() {
            return Err(GenGuardError::service(message));
        }

        Ok(reply)
    }
}

#[async_trait]
impl GenerationService for HttpGenerationClient {
    fn name(&self) -> &str {
        "http-generation"
    }

    async fn generate(&self, call: &ServiceCall) -> Result<ServiceReply> {
        let reply = self.post(call).await?;

        match (reply.content, reply.audio_url) {
            (_, Some(url)) if call.generate_audio => Ok(ServiceReply::Audio(AudioReference::new(url))),
            (Some(content), _) => Ok(ServiceReply::Content(content)),
            (None, Some(url)) => Ok(ServiceReply::Audio(AudioReference::new(url))),
            (None, None) => Err(GenGuardError::parsing("Reply carried neither content nor audioUrl")),
        }
    }
}

#[async_trait]
impl SpeechSynthesisService for HttpGenerationClient {
    async fn synthesize(&self, segment: &str, voice: Voice) -> Result<AudioReference> {
        self.generate(&ServiceCall::audio(segment, voice)).await?.into_audio()
    }
}

/// Builder for [`HttpGenerationClient`]
#[derive(Debug, Default)]
pub struct HttpGenerationClientBuilder {
    endpoint: Option<String>,
    api_key: Option<String>,
    timeout_seconds: Option<u64>,
    default_voice: Option<Voice>,
}

impl HttpGenerationClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint URL
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the bearer token
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the transport timeout in seconds
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Set the default voice
    pub fn default_voice(mut self, voice: Voice) -> Self {
        self.default_voice = Some(voice);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<HttpGenerationClient> {
        let defaults = GenerationServiceConfig::default();

        HttpGenerationClient::new(GenerationServiceConfig {
            endpoint: self
                .endpoint
                .ok_or_else(|| GenGuardError::configuration("Generation service endpoint is required"))?,
            api_key: self.api_key,
            request_timeout_secs: self.timeout_seconds.unwrap_or(defaults.request_timeout_secs),
            default_voice: self.default_voice.unwrap_or(defaults.default_voice),
        })
    }
}
