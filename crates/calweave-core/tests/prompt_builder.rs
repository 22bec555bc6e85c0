use std::sync::Arc;

use calweave_core::prompt::{step_sources, ALL_SOURCES};
use calweave_core::sources::source_task;
use calweave_core::{default_registry, PromptError, StepId, StrategyAwarePromptBuilder};
use calweave_textgen::fakes::ScriptedGenerator;
use calweave_textgen::{GenerationError, TextGenerator};
use serde_json::json;

fn strategy_payload() -> serde_json::Value {
    json!({
        "strategy_name": "Secure Cloud Q3",
        "industry": "cybersecurity",
        "target_audience": "CISOs",
        "business_goals": ["pipeline growth"],
        "content_pillars": ["zero trust", "compliance"],
    })
}

async fn builder_with(generator: ScriptedGenerator) -> (StrategyAwarePromptBuilder, Arc<ScriptedGenerator>) {
    let generator = Arc::new(generator);
    let dyn_gen: Arc<dyn TextGenerator> = generator.clone();
    let registry = default_registry(dyn_gen).await.unwrap();
    (StrategyAwarePromptBuilder::new(registry), generator)
}

#[tokio::test]
async fn test_context_gathers_declared_sources_only() {
    let (builder, generator) = builder_with(
        ScriptedGenerator::new()
            .respond(source_task("content_strategy"), strategy_payload())
            .fallback(json!({ "note": "generic" })),
    )
    .await;

    let ctx = builder
        .get_step_context(StepId::GapAnalysis, "user-7", "strategy-3")
        .await;

    let ids: Vec<&str> = ctx.sources.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["content_strategy", "gap_analysis", "keywords"]);
    assert!(ctx.sources["content_strategy"].validation.is_valid);
    assert_eq!(ctx.data("content_strategy").unwrap()["industry"], json!("cybersecurity"));
    assert_eq!(generator.calls().len(), 3);
    assert_eq!(ctx.step_name, "Gap Analysis");
}

#[tokio::test]
async fn test_failed_fetch_degrades_to_empty_payload() {
    let (builder, _) = builder_with(
        ScriptedGenerator::new()
            .respond(source_task("content_strategy"), strategy_payload())
            .fail(
                source_task("keywords"),
                GenerationError::Transport("connection reset".to_string()),
            )
            .fallback(json!({})),
    )
    .await;

    let ctx = builder
        .get_step_context(StepId::GapAnalysis, "u", "s")
        .await;

    let keywords = &ctx.sources["keywords"];
    assert_eq!(keywords.data, json!({}));
    assert!(!keywords.validation.is_valid);
    assert_eq!(keywords.validation.quality_score, 0.0);
    assert!(ctx.sources["content_strategy"].validation.is_valid);
    assert!(ctx.average_quality() < 1.0);
}

#[tokio::test]
async fn test_inactive_source_is_skipped_but_placeholder_is_filled() {
    let generator = Arc::new(
        ScriptedGenerator::new()
            .respond(source_task("content_strategy"), strategy_payload())
            .fallback(json!({ "k": 1 })),
    );
    let dyn_gen: Arc<dyn TextGenerator> = generator.clone();
    let registry = default_registry(dyn_gen).await.unwrap();
    assert!(registry.set_active("keywords", false).await);

    let builder = StrategyAwarePromptBuilder::new(registry).with_template(
        StepId::GapAnalysis,
        "strategy={content_strategy}\nkeywords={keywords}\nfor {user_id}/{subject_id}: {step_name}",
    );
    let built = builder
        .build_prompt(StepId::GapAnalysis, "user-1", "subject-9")
        .await
        .unwrap();

    assert!(!built.context.sources.contains_key("keywords"));
    assert!(built.text.contains("keywords={}"));
    assert!(built.text.contains("\"industry\": \"cybersecurity\""));
    assert!(built.text.contains("for user-1/subject-9: Gap Analysis"));
    assert_eq!(generator.call_count(&source_task("keywords")), 0);
}

#[tokio::test]
async fn test_wildcard_step_reads_every_active_source() {
    let (builder, generator) = builder_with(ScriptedGenerator::new().fallback(json!({}))).await;
    assert_eq!(step_sources(StepId::ContentRecommendations), &[ALL_SOURCES]);

    let built = builder
        .build_prompt(StepId::ContentRecommendations, "u", "s")
        .await
        .unwrap();

    assert_eq!(built.context.sources.len(), 6);
    assert_eq!(generator.calls().len(), 6);
    assert!(!built.text.contains("{content_strategy}"));
}

#[tokio::test]
async fn test_missing_template_is_an_error() {
    let (builder, _) = builder_with(ScriptedGenerator::new().fallback(json!({}))).await;
    let builder = builder.without_template(StepId::CalendarFramework);

    let err = builder
        .build_prompt(StepId::CalendarFramework, "u", "s")
        .await
        .unwrap_err();
    assert!(matches!(err, PromptError::TemplateNotFound(StepId::CalendarFramework)));
    assert!(!builder.validate_step_requirements(StepId::CalendarFramework).await);
}

#[tokio::test]
async fn test_step_requirements_need_active_sources() {
    let generator: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new());
    let registry = default_registry(generator).await.unwrap();
    let builder = StrategyAwarePromptBuilder::new(registry.clone());

    assert!(builder.validate_step_requirements(StepId::PerformanceOptimization).await);
    assert!(registry.set_active("ai_analysis", false).await);
    assert!(!builder.validate_step_requirements(StepId::PerformanceOptimization).await);
    assert!(builder.validate_step_requirements(StepId::ContentRecommendations).await);
}
