//! Evaluation pipeline
//!
//! Asks the remote evaluator for a verdict exactly once, optionally under a
//! deadline. Any failure (transport error, timeout or an unusable reply)
//! falls back to the [`HeuristicEvaluator`], so evaluation always produces
//! an outcome.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::events::PipelineEvent;
use super::prompts;
use crate::config::ResilienceConfig;
use crate::core::{GenerationRequest, GenerationService, ServiceCall};
use crate::error::{GenGuardError, Result};
use crate::evaluator::{EvaluationOutcome, HeuristicEvaluator};
use crate::extraction::{extract, ExtractionSchema};
use crate::resilience::Orchestrator;

/// Where a verdict came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationSource {
    Remote,
    Heuristic,
}

/// Verdict on a candidate answer plus how it was reached
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub outcome: EvaluationOutcome,
    pub source: EvaluationSource,
    pub events: Vec<PipelineEvent>,
}

/// Remote-first answer evaluation with a local fallback
pub struct EvaluationPipeline {
    service: Arc<dyn GenerationService>,
    orchestrator: Orchestrator,
    timeout: Option<Duration>,
    heuristic: HeuristicEvaluator,
}

impl EvaluationPipeline {
    pub fn new(service: Arc<dyn GenerationService>, config: &ResilienceConfig) -> Self {
        Self {
            service,
            orchestrator: Orchestrator::from_config(config),
            timeout: config.evaluation_timeout(),
            heuristic: HeuristicEvaluator,
        }
    }

    /// Replace the orchestrator, e.g. to attach a custom observer
    pub fn with_orchestrator(mut self, orchestrator: Orchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Override the deadline for the remote attempt
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Evaluate `candidate` against `reference_answer`
    pub async fn evaluate(&self, question: &str, reference_answer: &str, candidate: &str) -> Evaluation {
        let request = GenerationRequest::new(
            "evaluate",
            ServiceCall::text(
                prompts::evaluation_message(question, reference_answer, candidate),
                prompts::EVALUATION_SYSTEM_PROMPT,
            ),
        )
        .with_max_attempts(1)
        .with_timeout(self.timeout);

        let mut events = Vec::new();

        match self.remote_verdict(&request, &mut events).await {
            Ok(outcome) => {
                info!(request_id = %request.request_id(), score = outcome.score(), "Remote evaluation completed");
                Evaluation {
                    outcome,
                    source: EvaluationSource::Remote,
                    events,
                }
            }
            Err(reason) => {
                let rule = self.heuristic.matching_rule(candidate);
                warn!(
                    request_id = %request.request_id(),
                    rule = rule.name,
                    error = %reason,
                    "Remote evaluation unavailable, using heuristic fallback"
                );

                events.push(PipelineEvent::FallbackEvaluated {
                    rule: rule.name,
                    reason: reason.to_string(),
                });

                Evaluation {
                    outcome: self.heuristic.evaluate(candidate),
                    source: EvaluationSource::Heuristic,
                    events,
                }
            }
        }
    }

    async fn remote_verdict(
        &self,
        request: &GenerationRequest,
        events: &mut Vec<PipelineEvent>,
    ) -> Result<EvaluationOutcome> {
        debug!(service = self.service.name(), "Requesting remote evaluation");
        let service = Arc::clone(&self.service);
        let call = request.call().clone();

        let invocation = self
            .orchestrator
            .invoke(request, move |_| {
                let service = Arc::clone(&service);
                let call = call.clone();
                async move { service.generate(&call).await?.into_content() }
            })
            .await;
        events.extend(PipelineEvent::from_invocation(&invocation, request.operation(), None));

        let raw = invocation.into_result()?;
        let schema = ExtractionSchema::record().require(["feedback"]);
        let extracted = extract(&raw, &schema);

        if !extracted.repairs().is_empty() {
            events.push(PipelineEvent::OutputRepaired {
                repairs: extracted.repairs().to_vec(),
            });
        }

        let items = extracted.into_items()?;
        let record = items
            .first()
            .ok_or_else(|| GenGuardError::malformed_output(raw.clone()))?;

        parse_verdict(record)
    }
}

fn parse_verdict(record: &Value) -> Result<EvaluationOutcome> {
    let is_acceptable = ["isCorrect", "isAcceptable"]
        .iter()
        .find_map(|key| record.get(*key).and_then(as_flag))
        .ok_or_else(|| GenGuardError::parsing("verdict is missing isCorrect"))?;

    let feedback = record
        .get("feedback")
        .and_then(Value::as_str)
        .ok_or_else(|| GenGuardError::parsing("verdict feedback is not text"))?;

    let score = record
        .get("score")
        .and_then(as_number)
        .ok_or_else(|| GenGuardError::parsing("verdict is missing a numeric score"))?;

    Ok(EvaluationOutcome::new(is_acceptable, feedback, score.round() as i64))
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}
