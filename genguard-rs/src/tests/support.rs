//! Scripted fakes for the remote services and observers

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::{AudioReference, GenerationService, ServiceCall, ServiceReply, SpeechSynthesisService, Voice};
use crate::error::{GenGuardError, Result};
use crate::resilience::{InvocationEvent, InvocationObserver, InvocationState};

/// What a scripted call does
#[derive(Debug, Clone)]
pub enum Step {
    Content(String),
    Fail(GenGuardError),
    /// Never resolves
    Hang,
    /// Wait, then do the inner step
    After(Duration, Box<Step>),
}

impl Step {
    pub fn content(text: &str) -> Self {
        Step::Content(text.to_string())
    }

    pub fn fail() -> Self {
        Step::Fail(GenGuardError::service("upstream unavailable"))
    }
}

/// Generation service that plays back a fixed script, one step per call
#[derive(Debug, Default)]
pub struct ScriptedService {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<ServiceCall>>,
}

impl ScriptedService {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, call: &ServiceCall) -> Result<ServiceReply> {
        self.calls.lock().unwrap().push(call.clone());
        let step = self.steps.lock().unwrap().pop_front();

        let mut step = step.ok_or_else(|| GenGuardError::service("script exhausted"))?;
        loop {
            match step {
                Step::Content(text) => return Ok(ServiceReply::Content(text)),
                Step::Fail(error) => return Err(error),
                Step::Hang => futures::future::pending::<()>().await,
                Step::After(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    step = *inner;
                }
            }
        }
    }
}

/// Speech service returning `audio://<segment>`, with optional per-call delays and failures
#[derive(Debug, Default)]
pub struct ScriptedSpeech {
    counter: AtomicUsize,
    segments: Mutex<Vec<(usize, String, Voice)>>,
    delays: Vec<Duration>,
    failing_calls: Vec<usize>,
}

impl ScriptedSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay the n-th call by `delays[n]`
    pub fn with_delays(mut self, delays: Vec<Duration>) -> Self {
        self.delays = delays;
        self
    }

    /// Fail the listed zero-based calls
    pub fn failing_calls(mut self, calls: Vec<usize>) -> Self {
        self.failing_calls = calls;
        self
    }

    /// Segments in the order calls started
    pub fn segments(&self) -> Vec<String> {
        self.segments
            .lock()
            .unwrap()
            .iter()
            .map(|(_, segment, _)| segment.clone())
            .collect()
    }

    pub fn voices(&self) -> Vec<Voice> {
        self.segments.lock().unwrap().iter().map(|(_, _, voice)| *voice).collect()
    }

    pub fn call_count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesisService for ScriptedSpeech {
    async fn synthesize(&self, segment: &str, voice: Voice) -> Result<AudioReference> {
        let call = self.counter.fetch_add(1, Ordering::SeqCst);
        self.segments.lock().unwrap().push((call, segment.to_string(), voice));

        if let Some(delay) = self.delays.get(call) {
            tokio::time::sleep(*delay).await;
        }

        if self.failing_calls.contains(&call) {
            return Err(GenGuardError::service("synthesis failed"));
        }

        Ok(AudioReference::new(format!("audio://{}", segment)))
    }
}

/// Observer that records every state it sees
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub states: Mutex<Vec<InvocationState>>,
}

impl RecordingObserver {
    pub fn states(&self) -> Vec<InvocationState> {
        self.states.lock().unwrap().clone()
    }
}

impl InvocationObserver for RecordingObserver {
    fn on_transition(&self, event: &InvocationEvent) {
        self.states.lock().unwrap().push(event.state);
    }
}

/// Observer that always panics
#[derive(Debug, Default)]
pub struct PanickingObserver;

impl InvocationObserver for PanickingObserver {
    fn on_transition(&self, _event: &InvocationEvent) {
        panic!("telemetry backend down");
    }
}
