use std::sync::Arc;

use async_trait::async_trait;
use calweave_core::domain::is_empty_value;
use calweave_core::{
    CalendarError, DataSource, DataSourceRegistry, Result, SourceConfig, SourcePriority,
    SourceType, ValidationResult,
};
use serde_json::{json, Value};

/// Returns a fixed payload; enhancement adds an `enhanced` marker.
struct StaticSource {
    id: &'static str,
    source_type: SourceType,
    payload: Option<Value>,
}

impl StaticSource {
    fn ok(id: &'static str, payload: Value) -> Arc<Self> {
        Arc::new(Self {
            id,
            source_type: SourceType::Analysis,
            payload: Some(payload),
        })
    }

    fn broken(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            source_type: SourceType::Research,
            payload: None,
        })
    }
}

#[async_trait]
impl DataSource for StaticSource {
    fn id(&self) -> &str {
        self.id
    }

    fn source_type(&self) -> SourceType {
        self.source_type
    }

    fn priority(&self) -> SourcePriority {
        SourcePriority::Medium
    }

    async fn get_data(&self, _user_id: &str, _subject_id: &str) -> Result<Value> {
        self.payload.clone().ok_or_else(|| CalendarError::FetchFailure {
            source_id: self.id.to_string(),
            reason: "backend down".to_string(),
        })
    }

    async fn validate_data(&self, data: &Value) -> Result<ValidationResult> {
        Ok(ValidationResult::from_required_fields(data, &["name"]))
    }

    async fn enhance_data(&self, mut data: Value) -> Result<Value> {
        if let Some(obj) = data.as_object_mut() {
            obj.insert("enhanced".to_string(), json!(true));
        }
        Ok(data)
    }
}

async fn registry_with(sources: Vec<Arc<StaticSource>>) -> DataSourceRegistry {
    let registry = DataSourceRegistry::new();
    for source in sources {
        assert!(registry.register(source, SourceConfig::default()).await);
    }
    registry
}

#[tokio::test]
async fn test_register_then_unregister_restores_registry() {
    let registry = registry_with(vec![StaticSource::ok("a", json!({ "name": "a" }))]).await;
    let before = registry.get_registry_status().await;

    assert!(
        registry
            .register(StaticSource::ok("b", json!({})), SourceConfig::default())
            .await
    );
    assert!(registry.set_dependencies("b", &["a"]).await);
    assert_eq!(registry.dependents_of("a").await, vec!["b".to_string()]);

    assert!(registry.unregister("b").await);
    let after = registry.get_registry_status().await;

    assert_eq!(after.total, before.total);
    assert_eq!(after.sources.keys().collect::<Vec<_>>(), before.sources.keys().collect::<Vec<_>>());
    assert!(registry.dependents_of("a").await.is_empty());
    assert!(!registry.unregister("b").await);
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let registry = registry_with(vec![StaticSource::ok("a", json!({}))]).await;
    assert!(
        !registry
            .register(StaticSource::ok("a", json!({ "other": 1 })), SourceConfig::default())
            .await
    );
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn test_set_dependencies_rejects_unknown_dependency_without_mutation() {
    let registry = registry_with(vec![
        StaticSource::ok("a", json!({})),
        StaticSource::ok("b", json!({})),
    ])
    .await;
    assert!(registry.set_dependencies("b", &["a"]).await);

    assert!(!registry.set_dependencies("b", &["a", "ghost"]).await);
    assert_eq!(registry.dependencies_of("b").await, vec!["a".to_string()]);

    let err = registry
        .try_set_dependencies("b", &["ghost"])
        .await
        .unwrap_err();
    assert!(matches!(err, CalendarError::DependencyNotRegistered { .. }));

    let err = registry.try_set_dependencies("nope", &["a"]).await.unwrap_err();
    assert!(matches!(err, CalendarError::SourceNotFound(_)));
}

#[tokio::test]
async fn test_cycles_are_rejected_without_mutation() {
    let registry = registry_with(vec![
        StaticSource::ok("a", json!({})),
        StaticSource::ok("b", json!({})),
        StaticSource::ok("c", json!({})),
    ])
    .await;
    assert!(registry.set_dependencies("b", &["a"]).await);
    assert!(registry.set_dependencies("c", &["b"]).await);

    let err = registry.try_set_dependencies("a", &["c"]).await.unwrap_err();
    assert!(matches!(err, CalendarError::DependencyCycle(_)));
    assert!(registry.dependencies_of("a").await.is_empty());

    let order = registry.fetch_order().await;
    let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
    assert!(pos("a") < pos("b"));
    assert!(pos("b") < pos("c"));
}

#[tokio::test]
async fn test_dependency_payload_is_raw_and_primary_is_enhanced() {
    let registry = registry_with(vec![
        StaticSource::ok("a", json!({ "name": "upstream" })),
        StaticSource::ok("b", json!({ "name": "primary" })),
    ])
    .await;
    assert!(registry.set_dependencies("b", &["a"]).await);

    let resolved = registry
        .get_data_with_dependencies("b", "user-1", "subject-1")
        .await
        .unwrap();

    assert_eq!(resolved.dependencies["a"], json!({ "name": "upstream" }));
    assert_eq!(resolved.data["enhanced"], json!(true));
    assert_eq!(resolved.source_metadata.dependencies, vec!["a".to_string()]);
    assert!(!resolved.is_degraded());
}

#[tokio::test]
async fn test_failed_dependency_degrades_to_empty_object() {
    let registry = registry_with(vec![
        StaticSource::broken("a"),
        StaticSource::ok("b", json!({ "name": "primary" })),
    ])
    .await;
    assert!(registry.set_dependencies("b", &["a"]).await);

    let resolved = registry
        .get_data_with_dependencies("b", "user-1", "subject-1")
        .await
        .unwrap();

    assert!(is_empty_value(&resolved.dependencies["a"]));
    assert_eq!(resolved.data["name"], json!("primary"));
    assert_eq!(resolved.degraded.len(), 1);
    assert_eq!(registry.metrics().fetch_failures(), 1);
}

#[tokio::test]
async fn test_unknown_source_is_an_error() {
    let registry = DataSourceRegistry::new();
    let err = registry
        .get_data_with_dependencies("ghost", "u", "s")
        .await
        .unwrap_err();
    assert!(matches!(err, CalendarError::SourceNotFound(_)));
}

#[tokio::test]
async fn test_validate_all_sources_isolates_failures() {
    let registry = registry_with(vec![
        StaticSource::ok("good", json!({ "name": "fine" })),
        StaticSource::broken("bad"),
        StaticSource::ok("partial", json!({})),
    ])
    .await;

    let results = registry.validate_all_sources().await;

    assert_eq!(results.len(), 3);
    assert!(results["good"].is_valid);
    assert_eq!(results["good"].quality_score, 1.0);
    assert!(!results["bad"].is_valid);
    assert_eq!(results["bad"].quality_score, 0.0);
    assert!(!results["bad"].errors.is_empty());
    assert_eq!(results["partial"].missing_fields, vec!["name".to_string()]);

    assert_eq!(registry.quality_score("good").await, Some(1.0));
    assert_eq!(registry.quality_score("bad").await, Some(0.0));
}

#[tokio::test]
async fn test_registry_status_counts_active_and_types() {
    let registry = registry_with(vec![
        StaticSource::ok("a", json!({})),
        StaticSource::ok("b", json!({})),
        StaticSource::broken("c"),
    ])
    .await;
    assert!(registry.set_active("b", false).await);

    let status = registry.get_registry_status().await;
    assert_eq!(status.total, 3);
    assert_eq!(status.active, 2);
    assert_eq!(status.by_type[&SourceType::Analysis], 2);
    assert_eq!(status.by_type[&SourceType::Research], 1);
    assert_eq!(registry.get_active_sources().await, vec!["a".to_string(), "c".to_string()]);
}

#[tokio::test]
async fn test_out_of_range_quality_score_is_ignored() {
    let registry = registry_with(vec![StaticSource::ok("a", json!({}))]).await;
    assert!(registry.update_quality_score("a", 0.4).await);
    assert!(!registry.update_quality_score("a", 1.4).await);
    assert!(!registry.update_quality_score("a", f64::NAN).await);
    assert_eq!(registry.quality_score("a").await, Some(0.4));
}
