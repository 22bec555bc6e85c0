//! calweave core library
//!
//! Data-source registry, source evolution, quality gates, prompt assembly
//! and the twelve-step content-calendar pipeline.

pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod evolution;
pub mod gates;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod prompt;
pub mod recommendations;
pub mod registry;
pub mod reporting;
pub mod sources;
pub mod telemetry;

pub use bootstrap::{default_evolution_manager, default_registry, DEFAULT_DEPENDENCIES};
pub use config::{CalweaveConfig, GenerationConfig, LoggingConfig, RecommendationConfig};
pub use domain::{
    CalendarError, Result, SourceConfig, SourcePriority, SourceType, StepId, ValidationResult,
};
pub use evolution::{
    AddCapability, DataSourceEvolutionManager, EnhancementAction, EvolutionConfig,
    EvolutionRecord, EvolutionStatus, EvolutionStatusReport, DEFAULT_EVOLUTION_ORDER,
};
pub use gates::{GateKind, QualityGate, QualityGateManager, QualityGateResult, QualityReport};
pub use metrics::Metrics;
pub use pipeline::{CalendarPipeline, PipelineReport, StepError, StepOutcome, StepStatus};
pub use prompt::{BuiltPrompt, PipelineStepContext, PromptError, StrategyAwarePromptBuilder};
pub use recommendations::{RecommendationEngine, RecommendationOutcome, ScoredRecommendation};
pub use registry::{DataSourceRegistry, RegistryStatus, ResolvedData, SourceSnapshot};
pub use reporting::{read_pipeline_report, write_pipeline_report};
pub use sources::DataSource;

/// Crate version, stamped into CLI output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
