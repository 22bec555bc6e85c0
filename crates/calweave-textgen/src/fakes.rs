//! In-memory fakes for the text-generation seam (testing and offline runs)
//!
//! `ScriptedGenerator` answers by task key and records every call;
//! `FailingGenerator` fails every call with a fixed error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{GenerationRequest, GenerationResponse, TextGenerator};
use crate::error::GenerationError;
use crate::GenerationResult;

// ---------------------------------------------------------------------------
// ScriptedGenerator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Scripted {
    Data(Value),
    Fail(GenerationError),
}

/// Generator that answers from a table keyed by task.
///
/// Lookup order: exact task, then the longest registered prefix, then the
/// fallback. Responses pass through the same schema check a real endpoint
/// response would.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<HashMap<String, Scripted>>,
    fallback: Mutex<Option<Value>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<GenerationRequest>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call (exercises bounding and timeouts).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer `task` (or any task starting with it) with `data`.
    pub fn respond(self, task: impl Into<String>, data: Value) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(task.into(), Scripted::Data(data));
        self
    }

    /// Fail `task` (or any task starting with it) with `error`.
    pub fn fail(self, task: impl Into<String>, error: GenerationError) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(task.into(), Scripted::Fail(error));
        self
    }

    /// Answer unmatched tasks with `data` instead of `MissingData`.
    pub fn fallback(self, data: Value) -> Self {
        *self.fallback.lock().unwrap() = Some(data);
        self
    }

    /// Every request received, in arrival order.
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests whose task equals `task`.
    pub fn call_count(&self, task: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.task == task)
            .count()
    }

    /// Highest number of calls observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn lookup(&self, task: &str) -> Option<Scripted> {
        let script = self.script.lock().unwrap();
        if let Some(hit) = script.get(task) {
            return Some(hit.clone());
        }
        script
            .iter()
            .filter(|(key, _)| task.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> GenerationResult<Value> {
        self.calls.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = match self.lookup(&request.task) {
            Some(Scripted::Fail(e)) => Err(e),
            Some(Scripted::Data(v)) => GenerationResponse { data: Some(v) }.into_data(&request),
            None => {
                let fallback = self.fallback.lock().unwrap().clone();
                GenerationResponse { data: fallback }.into_data(&request)
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

// ---------------------------------------------------------------------------
// FailingGenerator
// ---------------------------------------------------------------------------

/// Generator that fails every call.
#[derive(Debug, Clone)]
pub struct FailingGenerator {
    error: GenerationError,
}

impl FailingGenerator {
    pub fn new(error: GenerationError) -> Self {
        Self { error }
    }

    pub fn transport(message: &str) -> Self {
        Self::new(GenerationError::Transport(message.to_string()))
    }
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _request: GenerationRequest) -> GenerationResult<Value> {
        Err(self.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_exact_task_beats_prefix() {
        let gen = ScriptedGenerator::new()
            .respond("source.", json!({ "which": "prefix" }))
            .respond("source.keywords", json!({ "which": "exact" }));
        let data = gen
            .generate(GenerationRequest::new("source.keywords", "p"))
            .await
            .unwrap();
        assert_eq!(data["which"], "exact");

        let data = gen
            .generate(GenerationRequest::new("source.gap_analysis", "p"))
            .await
            .unwrap();
        assert_eq!(data["which"], "prefix");
    }

    #[tokio::test]
    async fn test_unmatched_task_without_fallback_is_missing_data() {
        let gen = ScriptedGenerator::new();
        let err = gen
            .generate(GenerationRequest::new("nope", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MissingData { .. }));
        assert_eq!(gen.call_count("nope"), 1);
    }

    #[tokio::test]
    async fn test_failing_generator_always_fails() {
        let gen = FailingGenerator::transport("down");
        let err = gen
            .generate(GenerationRequest::new("x", "p"))
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::Transport("down".to_string()));
    }
}
