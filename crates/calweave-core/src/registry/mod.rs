//! Data-source registry.
//!
//! Owns every provider, the dependency graph between them, and the mutable
//! per-source state (active flag, version, quality score, metadata). One
//! registry instance is created at start-up and shared by `Arc` with the
//! prompt builder, evolution manager and pipeline.
//!
//! Fetch failures inside the registry never escape as errors: a failed
//! dependency or primary fetch is replaced by an empty JSON object, logged,
//! and listed in [`ResolvedData::degraded`].

pub mod graph;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    CalendarError, Result, SourceConfig, SourcePriority, SourceType, ValidationResult,
};
use crate::metrics::Metrics;
use crate::obs;
use crate::sources::DataSource;

pub use graph::DependencyGraph;

/// Subject used by [`DataSourceRegistry::validate_all_sources`] when sampling.
pub const SAMPLE_USER_ID: &str = "registry-sample-user";
pub const SAMPLE_SUBJECT_ID: &str = "registry-sample-subject";

/// Metadata key under which evolution records capabilities.
pub const CAPABILITIES_KEY: &str = "capabilities";

#[derive(Debug, Clone)]
struct SourceState {
    active: bool,
    version: Version,
    last_updated: DateTime<Utc>,
    quality_score: f64,
    metadata: BTreeMap<String, Value>,
}

struct SourceEntry {
    source: Arc<dyn DataSource>,
    /// Single writer per source id.
    state: Mutex<SourceState>,
}

/// Point-in-time view of one registered source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub id: String,
    pub source_type: SourceType,
    pub priority: SourcePriority,
    pub active: bool,
    pub version: Version,
    pub last_updated: DateTime<Utc>,
    pub quality_score: f64,
    pub metadata: BTreeMap<String, Value>,
    pub dependencies: Vec<String>,
}

/// Result of a dependency-aware fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedData {
    pub source_id: String,
    /// Enhanced payload of the primary source (`{}` if its fetch failed).
    pub data: Value,
    /// Raw payload per direct dependency (`{}` when unavailable).
    pub dependencies: BTreeMap<String, Value>,
    pub source_metadata: SourceSnapshot,
    /// One message per fetch or enhancement that degraded.
    pub degraded: Vec<String>,
}

impl ResolvedData {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Registry-wide summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryStatus {
    pub total: usize,
    pub active: usize,
    pub by_type: BTreeMap<SourceType, usize>,
    pub sources: BTreeMap<String, SourceSnapshot>,
    /// Every source, dependencies first.
    pub fetch_order: Vec<String>,
}

/// Central store for data sources and their dependency edges.
pub struct DataSourceRegistry {
    sources: RwLock<BTreeMap<String, Arc<SourceEntry>>>,
    graph: RwLock<DependencyGraph>,
    metrics: Metrics,
}

impl Default for DataSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(BTreeMap::new()),
            graph: RwLock::new(DependencyGraph::new()),
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Register `source`. Returns `false` if its id is already taken.
    pub async fn register(&self, source: Arc<dyn DataSource>, config: SourceConfig) -> bool {
        let id = source.id().to_string();
        let mut sources = self.sources.write().await;
        if sources.contains_key(&id) {
            warn!(source = %id, "data source already registered");
            return false;
        }

        let state = SourceState {
            active: config.active,
            version: config.version,
            last_updated: Utc::now(),
            quality_score: 0.0,
            metadata: config.metadata,
        };
        info!(source = %id, source_type = %source.source_type(), version = %state.version, "registered data source");
        sources.insert(
            id.clone(),
            Arc::new(SourceEntry {
                source,
                state: Mutex::new(state),
            }),
        );
        self.graph.write().await.add_node(&id);
        true
    }

    /// Remove `id` and every edge touching it. Returns `false` if absent.
    pub async fn unregister(&self, id: &str) -> bool {
        let mut sources = self.sources.write().await;
        if sources.remove(id).is_none() {
            warn!(source = %id, "cannot unregister unknown data source");
            return false;
        }
        self.graph.write().await.remove_node(id);
        info!(source = %id, "unregistered data source");
        true
    }

    /// Replace the direct dependencies of `id`.
    ///
    /// Returns `false` without touching the graph when `id` or any dependency
    /// is unregistered, or when the edges would close a cycle.
    pub async fn set_dependencies(&self, id: &str, deps: &[&str]) -> bool {
        match self.try_set_dependencies(id, deps).await {
            Ok(()) => true,
            Err(e) => {
                warn!(source = %id, error = %e, "dependency update rejected");
                false
            }
        }
    }

    /// [`set_dependencies`](Self::set_dependencies) with the rejection reason.
    pub async fn try_set_dependencies(&self, id: &str, deps: &[&str]) -> Result<()> {
        let sources = self.sources.read().await;
        if !sources.contains_key(id) {
            return Err(CalendarError::SourceNotFound(id.to_string()));
        }
        if let Some(missing) = deps.iter().find(|d| !sources.contains_key(**d)) {
            return Err(CalendarError::DependencyNotRegistered {
                source_id: id.to_string(),
                dependency: missing.to_string(),
            });
        }

        let deps: Vec<String> = deps.iter().map(|d| d.to_string()).collect();
        self.graph
            .write()
            .await
            .set_dependencies(id, &deps)
            .map_err(CalendarError::DependencyCycle)?;
        debug!(source = %id, deps = ?deps, "dependencies set");
        Ok(())
    }

    pub async fn dependencies_of(&self, id: &str) -> Vec<String> {
        self.graph.read().await.dependencies_of(id)
    }

    pub async fn dependents_of(&self, id: &str) -> Vec<String> {
        self.graph.read().await.dependents_of(id)
    }

    /// Every registered source, dependencies first.
    pub async fn fetch_order(&self) -> Vec<String> {
        self.graph.read().await.topological_order()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sources.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.sources.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sources.read().await.is_empty()
    }

    /// Provider handle for `id`.
    pub async fn get_source(&self, id: &str) -> Option<Arc<dyn DataSource>> {
        self.entry(id).await.map(|e| Arc::clone(&e.source))
    }

    pub async fn is_active(&self, id: &str) -> bool {
        match self.entry(id).await {
            Some(entry) => entry.state.lock().await.active,
            None => false,
        }
    }

    /// Ids of all active sources, sorted.
    pub async fn get_active_sources(&self) -> Vec<String> {
        let entries = self.entries().await;
        let mut active = Vec::new();
        for (id, entry) in entries {
            if entry.state.lock().await.active {
                active.push(id);
            }
        }
        active
    }

    pub async fn set_active(&self, id: &str, active: bool) -> bool {
        let Some(entry) = self.entry(id).await else {
            return false;
        };
        let mut state = entry.state.lock().await;
        state.active = active;
        state.last_updated = Utc::now();
        true
    }

    pub async fn version_of(&self, id: &str) -> Option<Version> {
        let entry = self.entry(id).await?;
        let version = entry.state.lock().await.version.clone();
        Some(version)
    }

    pub async fn set_version(&self, id: &str, version: Version) -> Result<()> {
        let entry = self
            .entry(id)
            .await
            .ok_or_else(|| CalendarError::SourceNotFound(id.to_string()))?;
        let mut state = entry.state.lock().await;
        debug!(source = %id, from = %state.version, to = %version, "version updated");
        state.version = version;
        state.last_updated = Utc::now();
        Ok(())
    }

    /// Record `capability` in the source's metadata. Returns `false` if it
    /// was already present.
    pub async fn add_capability(&self, id: &str, capability: &str) -> Result<bool> {
        let entry = self
            .entry(id)
            .await
            .ok_or_else(|| CalendarError::SourceNotFound(id.to_string()))?;
        let mut state = entry.state.lock().await;
        let caps = state
            .metadata
            .entry(CAPABILITIES_KEY.to_string())
            .or_insert_with(|| json!([]));
        if !caps.is_array() {
            *caps = json!([]);
        }
        let Some(list) = caps.as_array_mut() else {
            return Ok(false);
        };
        if list.iter().any(|c| c.as_str() == Some(capability)) {
            return Ok(false);
        }
        list.push(json!(capability));
        state.last_updated = Utc::now();
        Ok(true)
    }

    pub async fn quality_score(&self, id: &str) -> Option<f64> {
        let entry = self.entry(id).await?;
        let score = entry.state.lock().await.quality_score;
        Some(score)
    }

    /// Persist a quality score. Values outside 0.0–1.0 (or NaN) are
    /// rejected with a warning.
    pub async fn update_quality_score(&self, id: &str, score: f64) -> bool {
        if !(0.0..=1.0).contains(&score) {
            warn!(source = %id, score, "quality score outside 0-1 rejected");
            return false;
        }
        let Some(entry) = self.entry(id).await else {
            warn!(source = %id, "quality score for unknown source ignored");
            return false;
        };
        let mut state = entry.state.lock().await;
        state.quality_score = score;
        state.last_updated = Utc::now();
        true
    }

    pub async fn snapshot(&self, id: &str) -> Option<SourceSnapshot> {
        let entry = self.entry(id).await?;
        Some(self.snapshot_entry(id, &entry).await)
    }

    /// Fetch the direct dependencies of `id` concurrently, then fetch and
    /// enhance `id` itself. Only one level is resolved: a dependency's own
    /// dependencies are not fetched.
    #[instrument(skip(self), fields(source = %id))]
    pub async fn get_data_with_dependencies(
        &self,
        id: &str,
        user_id: &str,
        subject_id: &str,
    ) -> Result<ResolvedData> {
        let entry = self
            .entry(id)
            .await
            .ok_or_else(|| CalendarError::SourceNotFound(id.to_string()))?;
        let dep_ids = self.dependencies_of(id).await;

        let mut dep_entries = Vec::with_capacity(dep_ids.len());
        for dep_id in &dep_ids {
            dep_entries.push((dep_id.clone(), self.entry(dep_id).await));
        }

        let fetches = dep_entries.into_iter().map(|(dep_id, dep_entry)| async move {
            let Some(dep_entry) = dep_entry else {
                return (dep_id.clone(), json!({}), Some(format!("dependency {dep_id} vanished")));
            };
            if !dep_entry.state.lock().await.active {
                debug!(dependency = %dep_id, "inactive dependency skipped");
                return (dep_id, json!({}), None);
            }
            self.metrics.inc_fetches();
            match dep_entry.source.get_data(user_id, subject_id).await {
                Ok(data) => (dep_id, data, None),
                Err(e) => {
                    self.metrics.inc_fetch_failures();
                    obs::emit_fetch_degraded(&dep_id, id, &e);
                    let msg = format!("dependency {dep_id}: {e}");
                    (dep_id, json!({}), Some(msg))
                }
            }
        });

        let mut dependencies = BTreeMap::new();
        let mut degraded = Vec::new();
        for (dep_id, data, problem) in join_all(fetches).await {
            dependencies.insert(dep_id, data);
            degraded.extend(problem);
        }

        self.metrics.inc_fetches();
        let data = match entry.source.get_data(user_id, subject_id).await {
            Ok(raw) => match entry.source.enhance_data(raw.clone()).await {
                Ok(enhanced) => enhanced,
                Err(e) => {
                    warn!(error = %e, "enhancement failed; keeping raw payload");
                    degraded.push(format!("enhance {id}: {e}"));
                    raw
                }
            },
            Err(e) => {
                self.metrics.inc_fetch_failures();
                obs::emit_fetch_degraded(id, "primary", &e);
                degraded.push(format!("primary {id}: {e}"));
                json!({})
            }
        };

        let source_metadata = self.snapshot_entry(id, &entry).await;
        Ok(ResolvedData {
            source_id: id.to_string(),
            data,
            dependencies,
            source_metadata,
            degraded,
        })
    }

    /// Sample and validate every source with the built-in sample subject.
    pub async fn validate_all_sources(&self) -> BTreeMap<String, ValidationResult> {
        self.validate_all_sources_for(SAMPLE_USER_ID, SAMPLE_SUBJECT_ID)
            .await
    }

    /// Fetch and validate every source concurrently, persisting each score.
    ///
    /// A source whose fetch or validation fails degrades to
    /// [`ValidationResult::failed`]; the others are unaffected.
    #[instrument(skip(self))]
    pub async fn validate_all_sources_for(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> BTreeMap<String, ValidationResult> {
        let entries = self.entries().await;

        let checks = entries.into_iter().map(|(id, entry)| async move {
            self.metrics.inc_fetches();
            self.metrics.inc_validations();
            let result = match entry.source.get_data(user_id, subject_id).await {
                Ok(data) => match entry.source.validate_data(&data).await {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(source = %id, error = %e, "validation raised");
                        ValidationResult::failed(e.to_string())
                    }
                },
                Err(e) => {
                    self.metrics.inc_fetch_failures();
                    obs::emit_fetch_degraded(&id, "validate_all_sources", &e);
                    ValidationResult::failed(e.to_string())
                }
            };
            (id, result)
        });

        let results: BTreeMap<String, ValidationResult> = join_all(checks).await.into_iter().collect();
        for (id, result) in &results {
            self.update_quality_score(id, result.quality_score).await;
        }
        info!(
            sources = results.len(),
            valid = results.values().filter(|r| r.is_valid).count(),
            "validated all data sources"
        );
        results
    }

    /// Counts and per-source snapshots.
    pub async fn get_registry_status(&self) -> RegistryStatus {
        let entries = self.entries().await;
        let mut by_type = BTreeMap::new();
        let mut sources = BTreeMap::new();
        let mut active = 0;

        for (id, entry) in entries {
            let snapshot = self.snapshot_entry(&id, &entry).await;
            *by_type.entry(snapshot.source_type).or_insert(0) += 1;
            if snapshot.active {
                active += 1;
            }
            sources.insert(id, snapshot);
        }

        RegistryStatus {
            total: sources.len(),
            active,
            by_type,
            sources,
            fetch_order: self.fetch_order().await,
        }
    }

    async fn entry(&self, id: &str) -> Option<Arc<SourceEntry>> {
        self.sources.read().await.get(id).cloned()
    }

    /// Clone the entry handles so no registry lock is held across fetches.
    async fn entries(&self) -> Vec<(String, Arc<SourceEntry>)> {
        self.sources
            .read()
            .await
            .iter()
            .map(|(id, e)| (id.clone(), Arc::clone(e)))
            .collect()
    }

    async fn snapshot_entry(&self, id: &str, entry: &SourceEntry) -> SourceSnapshot {
        let state = entry.state.lock().await.clone();
        SourceSnapshot {
            id: id.to_string(),
            source_type: entry.source.source_type(),
            priority: entry.source.priority(),
            active: state.active,
            version: state.version,
            last_updated: state.last_updated,
            quality_score: state.quality_score,
            metadata: state.metadata,
            dependencies: self.dependencies_of(id).await,
        }
    }
}
