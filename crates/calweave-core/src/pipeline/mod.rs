//! Twelve-step calendar generation.
//!
//! Steps run strictly in order. Each reads its upstream results from a
//! shared [`PipelineContext`], produces one JSON result, and is checked
//! against its required fields. Steps 7, 8, 9 and 12 are also scored by the
//! quality gates. Failures are recorded in the [`PipelineReport`]; only the
//! strategy analysis step halts the run.

pub mod assembly;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod step;

pub use assembly::assemble_calendar;
pub use context::PipelineContext;
pub use error::StepError;
pub use orchestrator::{CalendarPipeline, PipelineReport, StepOutcome, StepStatus};
pub use step::{
    default_policy, required_fields, result_schema, step_gates, AssemblyStep, GenerativeStep,
    PipelineStep, RecommendationStep, StepInput, StepPolicy,
};
