//! Structured observability hooks for pipeline and registry events.
//!
//! This module provides:
//! - A run-scoped tracing span via [`pipeline_span`]
//! - Emission functions for key events: step start/finish, gate evaluation,
//!   degraded fetches, evolution completion
//!
//! Events are emitted at `info!` level, degraded fetches at `warn!`.
//! Filtering follows `RUST_LOG`; see [`crate::telemetry::init_tracing`].

use tracing::{info, warn};

/// Span covering one pipeline run. Attach it with
/// [`tracing::Instrument::instrument`] so it follows the run across awaits.
///
/// # Example
///
/// ```ignore
/// use tracing::Instrument;
/// run(...).instrument(pipeline_span("run-12345", "user-1", "strategy-9")).await;
/// // every event inside now carries run_id, user_id and subject_id
/// ```
pub fn pipeline_span(run_id: &str, user_id: &str, subject_id: &str) -> tracing::Span {
    tracing::info_span!(
        "calweave.pipeline",
        run_id = %run_id,
        user_id = %user_id,
        subject_id = %subject_id,
    )
}

/// Emit event: a pipeline step started.
pub fn emit_step_started(step_key: &str, step_name: &str) {
    info!(event = "step.started", step = %step_key, name = %step_name);
}

/// Emit event: a pipeline step finished.
pub fn emit_step_finished(step_key: &str, status: &str, duration_ms: u64, quality: Option<f64>) {
    info!(
        event = "step.finished",
        step = %step_key,
        status = %status,
        duration_ms = duration_ms,
        quality = quality.unwrap_or(-1.0),
    );
}

/// Emit event: a gate batch was evaluated.
pub fn emit_gates_evaluated(subject: &str, overall_score: f64, passed: usize, failed: usize) {
    info!(
        event = "gates.evaluated",
        subject = %subject,
        overall_score = overall_score,
        passed = passed,
        failed = failed,
    );
}

/// Emit event: a fetch failed and was replaced by an empty payload.
pub fn emit_fetch_degraded(source_id: &str, context: &str, error: &dyn std::fmt::Display) {
    warn!(event = "fetch.degraded", source = %source_id, context = %context, error = %error);
}

/// Emit event: an evolution run finished.
pub fn emit_evolution_finished(source_id: &str, from: &str, to: &str, failed_steps: usize) {
    info!(
        event = "evolution.finished",
        source = %source_id,
        from = %from,
        to = %to,
        failed_steps = failed_steps,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_span_create() {
        let span = pipeline_span("run-1", "user-1", "subject-1");
        let _guard = span.enter();
        emit_step_started("step_01", "Content Strategy Analysis");
    }
}
