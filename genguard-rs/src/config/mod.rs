//! Configuration management for the resilience layer
//!
//! This module provides utilities for loading and validating configuration
//! for the invocation orchestrator, the pipelines and the generation service
//! client, with support for environment variables.

use std::collections::HashMap;
use std::env;
use std::fmt::Debug;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::chunker::DEFAULT_MAX_CHUNK_SIZE;
use crate::core::Voice;
use crate::error::{GenGuardError, Result};
use crate::resilience::{BackoffSchedule, RetryPolicy};

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value
            .trim()
            .parse::<i64>()
            .map_err(|e| GenGuardError::configuration(format!("Invalid integer for key {}: {}", key, e)))
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(GenGuardError::configuration(format!(
                "Invalid boolean value for key {}: {}",
                key, value
            ))),
        }
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get a typed value if the key is present
    ///
    /// A missing key yields `Ok(None)`; a present but unparsable value is an error.
    fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        <T as FromStr>::Err: std::fmt::Display,
    {
        match self.get_string(key) {
            Ok(value) => value
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| GenGuardError::configuration(format!("Invalid value for key {}: {}", key, e))),
            Err(_) => Ok(None),
        }
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Format a configuration key as an environment variable
    pub(crate) fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));
        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                GenGuardError::configuration(format!("Environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => GenGuardError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            )),
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory config provider with initial values
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| GenGuardError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// A composite config provider that tries multiple providers in order
#[derive(Default)]
pub struct CompositeConfigProvider {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    /// Create a new composite config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the end of the chain
    pub fn with_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }
}

impl ConfigProvider for CompositeConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.providers
            .iter()
            .find_map(|provider| provider.get_string(key).ok())
            .ok_or_else(|| {
                GenGuardError::configuration(format!("Configuration key not found in any provider: {}", key))
            })
    }
}

/// Global default configuration provider, reading `GENGUARD_*` variables
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new().with_prefix("GENGUARD")));

/// Trait for validated configuration sections
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Section name used in log lines and error messages
    fn service_name(&self) -> &str;
}

/// Largest accepted `max_attempts`
pub const MAX_ATTEMPTS_LIMIT: u32 = 100;

/// Retry, deadline and chunking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Total attempts per remote call, including the first
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    pub base_backoff_ms: u64,

    /// Growth factor between successive delays
    pub backoff_multiplier: u32,

    /// Optional ceiling on any single delay, in milliseconds
    pub max_backoff_ms: Option<u64>,

    /// Per-attempt deadline for summaries, in seconds
    pub summary_timeout_secs: Option<u64>,

    /// Deadline for the single evaluation attempt, in seconds
    pub evaluation_timeout_secs: Option<u64>,

    /// Per-attempt deadline for each narrated chunk, in seconds
    pub audio_timeout_secs: Option<u64>,

    /// Maximum characters per narrated chunk
    pub max_chunk_size: usize,

    /// Number of chunks synthesized at once
    pub audio_concurrency: usize,

    /// Which failures are retried
    pub retry_policy: RetryPolicy,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 1000,
            backoff_multiplier: 2,
            max_backoff_ms: None,
            summary_timeout_secs: Some(45),
            evaluation_timeout_secs: None,
            audio_timeout_secs: None,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            audio_concurrency: 1,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl ResilienceConfig {
    /// Load configuration from a config provider, falling back to defaults per key
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            max_attempts: provider.get_parsed("max_attempts")?.unwrap_or(defaults.max_attempts),
            base_backoff_ms: provider
                .get_parsed("base_backoff_ms")?
                .unwrap_or(defaults.base_backoff_ms),
            backoff_multiplier: provider
                .get_parsed("backoff_multiplier")?
                .unwrap_or(defaults.backoff_multiplier),
            max_backoff_ms: provider.get_parsed("max_backoff_ms")?.or(defaults.max_backoff_ms),
            summary_timeout_secs: provider
                .get_parsed("summary_timeout_secs")?
                .or(defaults.summary_timeout_secs),
            evaluation_timeout_secs: provider
                .get_parsed("evaluation_timeout_secs")?
                .or(defaults.evaluation_timeout_secs),
            audio_timeout_secs: provider
                .get_parsed("audio_timeout_secs")?
                .or(defaults.audio_timeout_secs),
            max_chunk_size: provider
                .get_parsed("max_chunk_size")?
                .unwrap_or(defaults.max_chunk_size),
            audio_concurrency: provider
                .get_parsed("audio_concurrency")?
                .unwrap_or(defaults.audio_concurrency),
            retry_policy: provider.get_parsed("retry_policy")?.unwrap_or(defaults.retry_policy),
        };

        config.validate()?;
        Ok(config)
    }

    /// The backoff schedule described by this configuration
    pub fn backoff(&self) -> BackoffSchedule {
        let schedule = BackoffSchedule::new(
            Duration::from_millis(self.base_backoff_ms),
            self.backoff_multiplier,
        );

        match self.max_backoff_ms {
            Some(cap) => schedule.with_max_delay(Duration::from_millis(cap)),
            None => schedule,
        }
    }

    /// Per-attempt deadline for summaries
    pub fn summary_timeout(&self) -> Option<Duration> {
        self.summary_timeout_secs.map(Duration::from_secs)
    }

    /// Deadline for the evaluation attempt
    pub fn evaluation_timeout(&self) -> Option<Duration> {
        self.evaluation_timeout_secs.map(Duration::from_secs)
    }

    /// Per-attempt deadline for narrated chunks
    pub fn audio_timeout(&self) -> Option<Duration> {
        self.audio_timeout_secs.map(Duration::from_secs)
    }
}

impl ServiceConfig for ResilienceConfig {
    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(GenGuardError::configuration("max_attempts must be at least 1"));
        }

        if self.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(GenGuardError::configuration(format!(
                "max_attempts must be at most {}",
                MAX_ATTEMPTS_LIMIT
            )));
        }

        if self.backoff_multiplier == 0 {
            return Err(GenGuardError::configuration("backoff_multiplier must be at least 1"));
        }

        if self.max_chunk_size == 0 {
            return Err(GenGuardError::configuration("max_chunk_size must be at least 1"));
        }

        if self.audio_concurrency == 0 {
            return Err(GenGuardError::configuration("audio_concurrency must be at least 1"));
        }

        let zero_deadline = [
            self.summary_timeout_secs,
            self.evaluation_timeout_secs,
            self.audio_timeout_secs,
        ]
        .contains(&Some(0));
        if zero_deadline {
            return Err(GenGuardError::configuration("timeouts must be positive when set"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "resilience"
    }
}

/// Connection settings for the remote generation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationServiceConfig {
    /// Full URL of the generation endpoint
    pub endpoint: String,

    /// Optional bearer token
    pub api_key: Option<String>,

    /// Transport-level timeout in seconds
    pub request_timeout_secs: u64,

    /// Voice used when a caller does not pick one
    pub default_voice: Voice,
}

impl Default for GenerationServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: None,
            request_timeout_secs: 120,
            default_voice: Voice::default(),
        }
    }
}

impl GenerationServiceConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            endpoint: provider.get_string("endpoint")?,
            api_key: provider.get_string("api_key").ok().filter(|key| !key.is_empty()),
            request_timeout_secs: provider
                .get_parsed("request_timeout_secs")?
                .unwrap_or(defaults.request_timeout_secs),
            default_voice: provider.get_parsed("default_voice")?.unwrap_or(defaults.default_voice),
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for GenerationServiceConfig {
    fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(GenGuardError::configuration("Generation service endpoint is required"));
        }

        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(GenGuardError::configuration(format!(
                "Generation service endpoint must be an http(s) URL: {}",
                self.endpoint
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(GenGuardError::configuration("request_timeout_secs must be positive"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "generation-service"
    }
}
