//! Stock wiring: the six built-in sources, their dependency edges and
//! their upgrade plans.

use std::sync::Arc;

use calweave_textgen::TextGenerator;
use semver::Version;
use tracing::info;

use crate::domain::{CalendarError, Result, SourceConfig, SourcePriority};
use crate::evolution::{DataSourceEvolutionManager, EvolutionConfig};
use crate::registry::DataSourceRegistry;
use crate::sources::{
    ai_analysis::AI_ANALYSIS_SOURCE_ID, content_pillars::CONTENT_PILLARS_SOURCE_ID,
    gap_analysis::GAP_ANALYSIS_SOURCE_ID, keywords::KEYWORDS_SOURCE_ID,
    performance::PERFORMANCE_SOURCE_ID, strategy::STRATEGY_SOURCE_ID, AiAnalysisSource,
    ContentPillarsSource, DataSource, GapAnalysisSource, KeywordsSource, PerformanceSource,
    StrategySource,
};

/// Direct dependency edges between the built-in sources.
pub const DEFAULT_DEPENDENCIES: [(&str, &[&str]); 4] = [
    (GAP_ANALYSIS_SOURCE_ID, &[STRATEGY_SOURCE_ID]),
    (KEYWORDS_SOURCE_ID, &[STRATEGY_SOURCE_ID]),
    (CONTENT_PILLARS_SOURCE_ID, &[STRATEGY_SOURCE_ID]),
    (
        AI_ANALYSIS_SOURCE_ID,
        &[STRATEGY_SOURCE_ID, GAP_ANALYSIS_SOURCE_ID, KEYWORDS_SOURCE_ID],
    ),
];

struct Plan {
    id: &'static str,
    current: (u64, u64, u64),
    target: (u64, u64, u64),
    priority: SourcePriority,
    effort: &'static str,
    capabilities: &'static [&'static str],
}

const PLANS: [Plan; 6] = [
    Plan {
        id: STRATEGY_SOURCE_ID,
        current: (2, 0, 0),
        target: (2, 5, 0),
        priority: SourcePriority::Critical,
        effort: "medium",
        capabilities: &["competitive_positioning", "goal_kpi_mapping"],
    },
    Plan {
        id: GAP_ANALYSIS_SOURCE_ID,
        current: (1, 5, 0),
        target: (2, 0, 0),
        priority: SourcePriority::High,
        effort: "medium",
        capabilities: &["competitor_gap_scoring", "opportunity_ranking"],
    },
    Plan {
        id: KEYWORDS_SOURCE_ID,
        current: (1, 5, 0),
        target: (2, 0, 0),
        priority: SourcePriority::High,
        effort: "low",
        capabilities: &["long_tail_expansion", "search_intent"],
    },
    Plan {
        id: CONTENT_PILLARS_SOURCE_ID,
        current: (1, 5, 0),
        target: (2, 0, 0),
        priority: SourcePriority::Medium,
        effort: "low",
        capabilities: &["pillar_balance_tracking"],
    },
    Plan {
        id: PERFORMANCE_SOURCE_ID,
        current: (1, 0, 0),
        target: (1, 5, 0),
        priority: SourcePriority::Medium,
        effort: "high",
        capabilities: &["trend_detection", "channel_attribution"],
    },
    Plan {
        id: AI_ANALYSIS_SOURCE_ID,
        current: (2, 0, 0),
        target: (2, 5, 0),
        priority: SourcePriority::High,
        effort: "high",
        capabilities: &["cross_source_synthesis", "recommendation_feedback"],
    },
];

fn version((major, minor, patch): (u64, u64, u64)) -> Version {
    Version::new(major, minor, patch)
}

fn builtin_sources(generator: &Arc<dyn TextGenerator>) -> Vec<Arc<dyn DataSource>> {
    vec![
        Arc::new(StrategySource::new(generator.clone())),
        Arc::new(GapAnalysisSource::new(generator.clone())),
        Arc::new(KeywordsSource::new(generator.clone())),
        Arc::new(ContentPillarsSource::new(generator.clone())),
        Arc::new(PerformanceSource::new(generator.clone())),
        Arc::new(AiAnalysisSource::new(generator.clone())),
    ]
}

/// Registry holding the six built-in sources at their shipped versions,
/// wired with [`DEFAULT_DEPENDENCIES`].
pub async fn default_registry(generator: Arc<dyn TextGenerator>) -> Result<Arc<DataSourceRegistry>> {
    let registry = Arc::new(DataSourceRegistry::new());
    for source in builtin_sources(&generator) {
        let id = source.id().to_string();
        let shipped = PLANS
            .iter()
            .find(|p| p.id == id)
            .map_or_else(|| Version::new(1, 0, 0), |p| version(p.current));
        if !registry
            .register(source, SourceConfig::at_version(shipped))
            .await
        {
            return Err(CalendarError::Config(format!("duplicate source id {id}")));
        }
    }
    for (id, deps) in DEFAULT_DEPENDENCIES {
        registry.try_set_dependencies(id, deps).await?;
    }
    info!(sources = registry.len().await, "default registry ready");
    Ok(registry)
}

/// Evolution manager with an upgrade plan for every built-in source.
pub async fn default_evolution_manager(
    registry: Arc<DataSourceRegistry>,
) -> DataSourceEvolutionManager {
    let manager = DataSourceEvolutionManager::new(registry);
    for plan in &PLANS {
        let config = EvolutionConfig::new(version(plan.current), version(plan.target), plan.priority)
            .with_capabilities(plan.capabilities)
            .with_effort(plan.effort);
        manager.configure(plan.id, config).await;
    }
    manager
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_plan_moves_forward() {
        for plan in &PLANS {
            assert!(version(plan.target) > version(plan.current), "{}", plan.id);
            assert!(!plan.capabilities.is_empty());
        }
    }
}
