//! GenGuard CLI
//!
//! The `genguard` command runs one guarded generation operation against the
//! configured generation service and prints the result with every pipeline
//! event as JSON.
//!
//! ## Commands
//!
//! - `summary`: Summarize study material
//! - `quiz`: Generate quiz questions from study material
//! - `audio`: Narrate text, one synthesis per chunk
//! - `evaluate`: Grade an answer against a reference answer
//!
//! The service is configured through `GENGUARD_*` environment variables,
//! optionally loaded from a `.env` file.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use genguard::config::DEFAULT_PROVIDER;
use genguard::logging::{init_logging, LoggingConfig};
use genguard::{
    EvaluationPipeline, GenerationPipeline, HttpGenerationClient, MemoryArtifactSink, PipelineReport,
    ResilienceConfig, Voice,
};

#[derive(Parser)]
#[command(name = "genguard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Guarded calls to a text and audio generation service", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize study material
    Summary {
        /// Input file (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Generate quiz questions from study material
    Quiz {
        /// Input file (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Number of questions to ask for
        #[arg(short, long, default_value = "5")]
        count: usize,
    },

    /// Narrate text as audio
    Audio {
        /// Input file (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Voice preset (default: GENGUARD_DEFAULT_VOICE or alloy)
        #[arg(long)]
        voice: Option<Voice>,
    },

    /// Grade an answer against a reference answer
    Evaluate {
        #[arg(short, long)]
        question: String,

        #[arg(short, long)]
        reference: String,

        /// Candidate answer to grade
        #[arg(short, long)]
        answer: String,
    },
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn report_json<T: Serialize>(report: &PipelineReport<T>) -> Result<Value> {
    let outcome = match &report.outcome {
        Ok(value) => json!({ "result": value }),
        Err(e) => json!({
            "error": e.to_string(),
            "userMessage": report.user_message(),
        }),
    };

    Ok(json!({
        "requestId": report.request_id,
        "success": report.is_success(),
        "outcome": outcome,
        "events": serde_json::to_value(&report.events)?,
    }))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_provider(&**DEFAULT_PROVIDER)?;
    logging.service_name = "genguard-cli".to_string();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if cli.json {
        logging.json_format = true;
    }
    let _log_guard = init_logging(Some(logging))?;

    let config = ResilienceConfig::from_provider(&**DEFAULT_PROVIDER).context("Invalid resilience settings")?;
    let client = Arc::new(HttpGenerationClient::from_env().context("Invalid generation service settings")?);
    let sink = Arc::new(MemoryArtifactSink::new());

    info!(
        endpoint = %client.config().endpoint,
        max_attempts = config.max_attempts,
        "GenGuard CLI starting"
    );

    let default_voice = client.config().default_voice;
    let generation = GenerationPipeline::new(client.clone(), client.clone(), sink.clone(), config.clone())
        .with_default_voice(default_voice);

    let output = match cli.command {
        Commands::Summary { input } => {
            let text = read_input(input.as_ref())?;
            report_json(&generation.summarize(&text).await)?
        }
        Commands::Quiz { input, count } => {
            let text = read_input(input.as_ref())?;
            report_json(&generation.generate_quiz(&text, count).await)?
        }
        Commands::Audio { input, voice } => {
            let text = read_input(input.as_ref())?;
            report_json(&generation.narrate(&text, voice).await)?
        }
        Commands::Evaluate {
            question,
            reference,
            answer,
        } => {
            let evaluation = EvaluationPipeline::new(client.clone(), &config);
            serde_json::to_value(evaluation.evaluate(&question, &reference, &answer).await)?
        }
    };

    print_json(&output)?;
    info!(artifacts = sink.len().await, "GenGuard CLI finished");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quiz_command() {
        let cli = Cli::try_parse_from(["genguard", "--json", "quiz", "--count", "3", "-i", "notes.md"]).unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Quiz { input, count } => {
                assert_eq!(count, 3);
                assert_eq!(input, Some(PathBuf::from("notes.md")));
            }
            _ => panic!("expected quiz command"),
        }
    }

    #[test]
    fn test_parse_audio_voice() {
        let cli = Cli::try_parse_from(["genguard", "audio", "--voice", "nova"]).unwrap();
        assert!(matches!(cli.command, Commands::Audio { voice: Some(Voice::Nova), .. }));

        assert!(Cli::try_parse_from(["genguard", "audio", "--voice", "robot"]).is_err());
    }

    #[test]
    fn test_evaluate_requires_answer() {
        assert!(Cli::try_parse_from(["genguard", "evaluate", "-q", "Q", "-r", "R"]).is_err());
    }
}
