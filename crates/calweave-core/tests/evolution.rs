use std::sync::Arc;

use async_trait::async_trait;
use calweave_core::evolution::VERSION_BUMP_STEP;
use calweave_core::registry::CAPABILITIES_KEY;
use calweave_core::sources::StrategySource;
use calweave_core::{
    default_evolution_manager, default_registry, AddCapability, CalendarError,
    DataSourceEvolutionManager, DataSourceRegistry, EnhancementAction, EvolutionConfig,
    EvolutionStatus, Result, SourceConfig, SourcePriority,
};
use calweave_textgen::fakes::ScriptedGenerator;
use calweave_textgen::TextGenerator;
use semver::Version;
use serde_json::json;

struct AlwaysFails;

#[async_trait]
impl EnhancementAction for AlwaysFails {
    fn name(&self) -> &str {
        "migrate_schema"
    }

    async fn apply(&self, source_id: &str, _registry: &DataSourceRegistry) -> Result<()> {
        Err(CalendarError::EvolutionStepFailure {
            source_id: source_id.to_string(),
            step: "migrate_schema".to_string(),
            reason: "upstream schema unavailable".to_string(),
        })
    }
}

fn v(raw: &str) -> Version {
    Version::parse(raw).unwrap()
}

async fn single_source_registry() -> Arc<DataSourceRegistry> {
    let generator: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new());
    let registry = Arc::new(DataSourceRegistry::new());
    assert!(
        registry
            .register(
                Arc::new(StrategySource::new(generator)),
                SourceConfig::at_version(v("2.0.0")),
            )
            .await
    );
    registry
}

#[tokio::test]
async fn test_clean_evolution_completes_and_records_capabilities() {
    let registry = single_source_registry().await;
    let manager = DataSourceEvolutionManager::new(registry.clone());
    manager
        .configure(
            "content_strategy",
            EvolutionConfig::new(v("2.0.0"), v("2.5.0"), SourcePriority::Critical)
                .with_capabilities(&["competitive_positioning", "goal_kpi_mapping"]),
        )
        .await;

    let record = manager.evolve("content_strategy", v("2.5.0")).await.unwrap();

    assert_eq!(record.status, EvolutionStatus::Completed);
    assert_eq!(record.failed_steps(), 0);
    assert!(record.finished_at.is_some());
    assert_eq!(registry.version_of("content_strategy").await, Some(v("2.5.0")));

    let snapshot = registry.snapshot("content_strategy").await.unwrap();
    assert_eq!(
        snapshot.metadata[CAPABILITIES_KEY],
        json!(["competitive_positioning", "goal_kpi_mapping"])
    );
    assert_eq!(registry.metrics().evolutions(), 1);
}

#[tokio::test]
async fn test_failed_step_leaves_partial_but_version_advances() {
    let registry = single_source_registry().await;
    let manager = DataSourceEvolutionManager::new(registry.clone());
    manager
        .configure(
            "content_strategy",
            EvolutionConfig::new(v("2.0.0"), v("2.5.0"), SourcePriority::Critical)
                .with_step(Arc::new(AddCapability::new("goal_kpi_mapping")))
                .with_step(Arc::new(AlwaysFails))
                .with_step(Arc::new(AddCapability::new("brand_voice_scoring"))),
        )
        .await;

    let record = manager.evolve("content_strategy", v("2.5.0")).await.unwrap();

    assert_eq!(record.status, EvolutionStatus::Partial);
    assert_eq!(record.steps.len(), 3);
    assert_eq!(record.failed_steps(), 1);
    assert!(!record.steps[1].success);
    assert!(record.steps[2].success, "later steps still run");
    assert_eq!(registry.version_of("content_strategy").await, Some(v("2.5.0")));

    let history = manager.history("content_strategy").await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, EvolutionStatus::Partial);
}

#[tokio::test]
async fn test_inactive_source_fails_capability_steps() {
    let registry = single_source_registry().await;
    assert!(registry.set_active("content_strategy", false).await);
    let manager = DataSourceEvolutionManager::new(registry.clone());
    manager
        .configure(
            "content_strategy",
            EvolutionConfig::new(v("2.0.0"), v("2.1.0"), SourcePriority::High)
                .with_capabilities(&["goal_kpi_mapping"]),
        )
        .await;

    let record = manager.evolve("content_strategy", v("2.1.0")).await.unwrap();
    assert_eq!(record.status, EvolutionStatus::Partial);
    assert!(record.steps[0]
        .error
        .as_deref()
        .unwrap()
        .contains("inactive"));
}

#[tokio::test]
async fn test_downgrade_and_unknown_source_are_rejected() {
    let registry = single_source_registry().await;
    let manager = DataSourceEvolutionManager::new(registry.clone());

    let err = manager.evolve("content_strategy", v("1.0.0")).await.unwrap_err();
    assert!(matches!(err, CalendarError::InvalidVersion(_)));
    assert_eq!(registry.version_of("content_strategy").await, Some(v("2.0.0")));

    let err = manager.evolve("ghost", v("9.0.0")).await.unwrap_err();
    assert!(matches!(err, CalendarError::SourceNotFound(_)));
    assert!(manager.history("content_strategy").await.is_empty());
}

#[tokio::test]
async fn test_status_reports_readiness_and_fixed_order() {
    let generator: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new());
    let registry = default_registry(generator).await.unwrap();
    assert!(registry.set_active("keywords", false).await);
    let manager = default_evolution_manager(registry.clone()).await;

    let status = manager.get_evolution_status().await;
    assert_eq!(status.sources.len(), 6);
    assert_eq!(status.evolution_order[0], "content_strategy");
    assert!(status.sources["content_strategy"].ready);
    assert!(!status.sources["keywords"].ready, "inactive sources are never ready");
    assert_eq!(status.ready_count, 5);

    let records = manager.evolve_ready().await;
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.status == EvolutionStatus::Completed));

    let status = manager.get_evolution_status().await;
    assert_eq!(status.ready_count, 0);
    assert_eq!(
        status.sources["content_strategy"].last_status,
        Some(EvolutionStatus::Completed)
    );
}

struct Decommission;

#[async_trait]
impl EnhancementAction for Decommission {
    fn name(&self) -> &str {
        "decommission"
    }

    async fn apply(&self, source_id: &str, registry: &DataSourceRegistry) -> Result<()> {
        registry.unregister(source_id).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_source_removed_mid_run_still_finalizes_history() {
    let registry = single_source_registry().await;
    let manager = DataSourceEvolutionManager::new(registry.clone());
    manager
        .configure(
            "content_strategy",
            EvolutionConfig::new(v("2.0.0"), v("2.5.0"), SourcePriority::Critical)
                .with_step(Arc::new(Decommission)),
        )
        .await;

    let err = manager.evolve("content_strategy", v("2.5.0")).await.unwrap_err();
    assert!(matches!(err, CalendarError::SourceNotFound(_)), "{err}");

    let history = manager.history("content_strategy").await;
    assert_eq!(history.len(), 1);
    let record = &history[0];
    assert_eq!(record.status, EvolutionStatus::Partial);
    assert!(record.finished_at.is_some());
    assert_eq!(record.steps.len(), 2);
    assert!(record.steps[0].success);
    assert_eq!(record.steps[1].step, VERSION_BUMP_STEP);
    assert!(!record.steps[1].success);
    assert_eq!(registry.metrics().evolutions(), 0);
}
