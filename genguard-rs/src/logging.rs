//! # Structured Logging
//!
//! Installs a global `tracing` subscriber with an env-driven filter and a
//! JSON or human-readable formatter, plus an optional daily rolling file.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::config::{ConfigProvider, ConfigProviderExt};
use crate::error::{GenGuardError, Result};

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Configuration for the logging system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// The log level to use (trace, debug, info, warn, error)
    pub level: String,
    /// The service name for identification
    pub service_name: String,
    /// Whether to use JSON formatting
    pub json_format: bool,
    /// Directory for a daily rolling log file, if any
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            service_name: "genguard".to_string(),
            json_format: false,
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    /// Load logging settings, keeping defaults for missing keys
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            level: provider.get_string_or("log_level", &defaults.level),
            service_name: provider.get_string_or("service_name", &defaults.service_name),
            json_format: match provider.get_string("log_format") {
                Ok(format) => format.trim().eq_ignore_ascii_case("json"),
                Err(_) => defaults.json_format,
            },
            log_dir: provider.get_string("log_dir").ok().filter(|dir| !dir.is_empty()),
        })
    }
}

/// Initializes the structured logging system
///
/// Calling it again after a successful initialization does nothing. The
/// returned guard flushes the log file when dropped and must be kept alive
/// when `log_dir` is set.
pub fn init_logging(config: Option<LoggingConfig>) -> Result<Option<WorkerGuard>> {
    if LOGGING_INITIALIZED.load(Ordering::SeqCst) {
        return Ok(None);
    }

    let config = config.unwrap_or_default();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", config.level)));

    let json_layer = config.json_format.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
    });

    let text_layer = (!config.json_format).then(|| fmt::layer().with_target(true));

    let (file_layer, guard) = match config.log_dir {
        Some(ref log_dir) => {
            let appender = tracing_appender::rolling::daily(log_dir, format!("{}.log", config.service_name));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = Registry::default()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| GenGuardError::configuration(format!("Failed to set global subscriber: {}", e)))?;

    LOGGING_INITIALIZED.store(true, Ordering::SeqCst);

    tracing::info!(
        service = %config.service_name,
        level = %config.level,
        json = config.json_format,
        "Logging initialized"
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigProvider;

    #[test]
    fn test_logging_config_from_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("log_level", "debug");
        provider.set("log_format", "JSON");

        let config = LoggingConfig::from_provider(&provider).unwrap();

        assert_eq!(config.level, "debug");
        assert!(config.json_format);
        assert_eq!(config.service_name, "genguard");
        assert!(config.log_dir.is_none());
    }
}
