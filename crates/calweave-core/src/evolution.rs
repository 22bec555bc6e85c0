//! Versioned, best-effort data-source upgrades.
//!
//! Each source may carry an [`EvolutionConfig`]: a target version and an
//! ordered list of [`EnhancementAction`]s. [`DataSourceEvolutionManager::evolve`]
//! runs every action in order, records failures without stopping, and then
//! advances the source's live version regardless. A run with failures ends
//! `partial`; the source keeps working in that state.
//!
//! The manager's upgrade ordering is a fixed table, deliberately independent
//! of the registry's dependency edges.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::domain::{CalendarError, Result, SourcePriority};
use crate::obs;
use crate::registry::DataSourceRegistry;
use crate::sources::{
    ai_analysis::AI_ANALYSIS_SOURCE_ID, content_pillars::CONTENT_PILLARS_SOURCE_ID,
    gap_analysis::GAP_ANALYSIS_SOURCE_ID, keywords::KEYWORDS_SOURCE_ID,
    performance::PERFORMANCE_SOURCE_ID, strategy::STRATEGY_SOURCE_ID,
};

/// Upgrade order used when none is supplied.
pub const DEFAULT_EVOLUTION_ORDER: [&str; 6] = [
    STRATEGY_SOURCE_ID,
    GAP_ANALYSIS_SOURCE_ID,
    KEYWORDS_SOURCE_ID,
    CONTENT_PILLARS_SOURCE_ID,
    PERFORMANCE_SOURCE_ID,
    AI_ANALYSIS_SOURCE_ID,
];

/// Outcome name recorded when the final version bump fails.
pub const VERSION_BUMP_STEP: &str = "set_version";

/// One enhancement step applied during evolution.
#[async_trait]
pub trait EnhancementAction: Send + Sync {
    fn name(&self) -> &str;

    async fn apply(&self, source_id: &str, registry: &DataSourceRegistry) -> Result<()>;
}

/// Records a named capability in the source's metadata. Re-applying an
/// already recorded capability succeeds. Fails on inactive sources.
pub struct AddCapability {
    capability: String,
}

impl AddCapability {
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
        }
    }
}

#[async_trait]
impl EnhancementAction for AddCapability {
    fn name(&self) -> &str {
        &self.capability
    }

    async fn apply(&self, source_id: &str, registry: &DataSourceRegistry) -> Result<()> {
        if !registry.is_active(source_id).await {
            return Err(CalendarError::EvolutionStepFailure {
                source_id: source_id.to_string(),
                step: self.capability.clone(),
                reason: "source is inactive".to_string(),
            });
        }
        registry.add_capability(source_id, &self.capability).await?;
        Ok(())
    }
}

/// Upgrade plan for one source.
#[derive(Clone)]
pub struct EvolutionConfig {
    pub current_version: Version,
    pub target_version: Version,
    pub enhancement_steps: Vec<Arc<dyn EnhancementAction>>,
    pub priority: SourcePriority,
    /// Free-form effort label, e.g. `"medium"`.
    pub estimated_effort: String,
}

impl EvolutionConfig {
    pub fn new(current: Version, target: Version, priority: SourcePriority) -> Self {
        Self {
            current_version: current,
            target_version: target,
            enhancement_steps: Vec::new(),
            priority,
            estimated_effort: "medium".to_string(),
        }
    }

    pub fn with_step(mut self, step: Arc<dyn EnhancementAction>) -> Self {
        self.enhancement_steps.push(step);
        self
    }

    /// Shorthand for a list of [`AddCapability`] steps.
    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        for cap in capabilities {
            self.enhancement_steps.push(Arc::new(AddCapability::new(*cap)));
        }
        self
    }

    pub fn with_effort(mut self, effort: &str) -> Self {
        self.estimated_effort = effort.to_string();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionStatus {
    InProgress,
    Completed,
    Partial,
}

/// Outcome of one enhancement step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementOutcome {
    pub step: String,
    pub success: bool,
    pub error: Option<String>,
}

/// One evolution run. History is append-only per source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionRecord {
    pub source_id: String,
    pub from_version: Version,
    pub to_version: Version,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<EnhancementOutcome>,
    pub status: EvolutionStatus,
}

impl EvolutionRecord {
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.success).count()
    }
}

/// Readiness of one configured source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEvolutionStatus {
    pub current_version: Version,
    pub target_version: Version,
    pub active: bool,
    /// Active and below its target version.
    pub ready: bool,
    pub priority: SourcePriority,
    pub estimated_effort: String,
    pub last_status: Option<EvolutionStatus>,
}

/// Report returned by [`DataSourceEvolutionManager::get_evolution_status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionStatusReport {
    pub sources: BTreeMap<String, SourceEvolutionStatus>,
    pub evolution_order: Vec<String>,
    pub ready_count: usize,
}

pub struct DataSourceEvolutionManager {
    registry: Arc<DataSourceRegistry>,
    configs: Mutex<BTreeMap<String, EvolutionConfig>>,
    history: Mutex<BTreeMap<String, Vec<EvolutionRecord>>>,
    order: Vec<String>,
}

impl DataSourceEvolutionManager {
    pub fn new(registry: Arc<DataSourceRegistry>) -> Self {
        Self::with_order(
            registry,
            DEFAULT_EVOLUTION_ORDER.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_order(registry: Arc<DataSourceRegistry>, order: Vec<String>) -> Self {
        Self {
            registry,
            configs: Mutex::new(BTreeMap::new()),
            history: Mutex::new(BTreeMap::new()),
            order,
        }
    }

    /// Install or replace the plan for `source_id`.
    pub async fn configure(&self, source_id: &str, config: EvolutionConfig) {
        self.configs
            .lock()
            .await
            .insert(source_id.to_string(), config);
    }

    /// Upgrade `source_id` to `target`.
    ///
    /// Fails for unknown sources, a downgrade request, or a source that
    /// disappears before its version is bumped; the last case is still
    /// recorded as `partial`. Step failures are recorded and leave the run
    /// `partial`.
    #[instrument(skip_all, fields(source = %source_id, to = %target))]
    pub async fn evolve(&self, source_id: &str, target: Version) -> Result<EvolutionRecord> {
        let from = self
            .registry
            .version_of(source_id)
            .await
            .ok_or_else(|| CalendarError::SourceNotFound(source_id.to_string()))?;
        if target < from {
            return Err(CalendarError::InvalidVersion(format!(
                "cannot evolve {source_id} from {from} down to {target}"
            )));
        }

        let steps: Vec<Arc<dyn EnhancementAction>> = self
            .configs
            .lock()
            .await
            .get(source_id)
            .map(|c| c.enhancement_steps.clone())
            .unwrap_or_default();

        let mut record = EvolutionRecord {
            source_id: source_id.to_string(),
            from_version: from.clone(),
            to_version: target.clone(),
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::with_capacity(steps.len()),
            status: EvolutionStatus::InProgress,
        };
        let index = {
            let mut history = self.history.lock().await;
            let runs = history.entry(source_id.to_string()).or_default();
            runs.push(record.clone());
            runs.len() - 1
        };

        for step in &steps {
            match step.apply(source_id, &self.registry).await {
                Ok(()) => record.steps.push(EnhancementOutcome {
                    step: step.name().to_string(),
                    success: true,
                    error: None,
                }),
                Err(e) => {
                    warn!(step = %step.name(), error = %e, "enhancement step failed; continuing");
                    record.steps.push(EnhancementOutcome {
                        step: step.name().to_string(),
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if let Err(e) = self.registry.set_version(source_id, target.clone()).await {
            warn!(error = %e, "version bump failed; run left partial");
            record.steps.push(EnhancementOutcome {
                step: VERSION_BUMP_STEP.to_string(),
                success: false,
                error: Some(e.to_string()),
            });
            record.status = EvolutionStatus::Partial;
            record.finished_at = Some(Utc::now());
            self.store_record(source_id, index, &record).await;
            return Err(e);
        }
        if let Some(config) = self.configs.lock().await.get_mut(source_id) {
            config.current_version = target.clone();
        }

        record.status = if record.failed_steps() == 0 {
            EvolutionStatus::Completed
        } else {
            EvolutionStatus::Partial
        };
        record.finished_at = Some(Utc::now());
        self.store_record(source_id, index, &record).await;

        self.registry.metrics().inc_evolutions();
        obs::emit_evolution_finished(
            source_id,
            &from.to_string(),
            &target.to_string(),
            record.failed_steps(),
        );
        Ok(record)
    }

    async fn store_record(&self, source_id: &str, index: usize, record: &EvolutionRecord) {
        if let Some(slot) = self
            .history
            .lock()
            .await
            .get_mut(source_id)
            .and_then(|runs| runs.get_mut(index))
        {
            *slot = record.clone();
        }
    }

    /// Evolve every ready source to its target, in table order.
    pub async fn evolve_ready(&self) -> Vec<EvolutionRecord> {
        let status = self.get_evolution_status().await;
        let mut records = Vec::new();
        for id in &status.evolution_order {
            let Some(entry) = status.sources.get(id) else {
                continue;
            };
            if !entry.ready {
                continue;
            }
            match self.evolve(id, entry.target_version.clone()).await {
                Ok(record) => records.push(record),
                Err(e) => warn!(source = %id, error = %e, "evolution skipped"),
            }
        }
        info!(evolved = records.len(), "evolved ready sources");
        records
    }

    pub async fn get_evolution_status(&self) -> EvolutionStatusReport {
        let configs: Vec<(String, EvolutionConfig)> = self
            .configs
            .lock()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let history = self.history.lock().await.clone();

        let mut sources = BTreeMap::new();
        for (id, config) in configs {
            let current = self
                .registry
                .version_of(&id)
                .await
                .unwrap_or_else(|| config.current_version.clone());
            let active = self.registry.is_active(&id).await;
            let ready = active && current < config.target_version;
            let last_status = history
                .get(&id)
                .and_then(|runs| runs.last())
                .map(|r| r.status);
            sources.insert(
                id,
                SourceEvolutionStatus {
                    current_version: current,
                    target_version: config.target_version,
                    active,
                    ready,
                    priority: config.priority,
                    estimated_effort: config.estimated_effort,
                    last_status,
                },
            );
        }

        let ready_count = sources.values().filter(|s| s.ready).count();
        EvolutionStatusReport {
            sources,
            evolution_order: self.order.clone(),
            ready_count,
        }
    }

    /// Every run recorded for `source_id`, oldest first.
    pub async fn history(&self, source_id: &str) -> Vec<EvolutionRecord> {
        self.history
            .lock()
            .await
            .get(source_id)
            .cloned()
            .unwrap_or_default()
    }
}
