//! Final calendar artifact.

use chrono::NaiveDate;
use serde_json::{json, Value};

use super::context::PipelineContext;
use crate::domain::StepId;
use crate::gates::structure::parse_date;

fn array(ctx: &PipelineContext, step: StepId, key: &str) -> Vec<Value> {
    ctx.field(step, key).as_array().cloned().unwrap_or_default()
}

fn item_date(item: &Value) -> Option<NaiveDate> {
    item.get("date").and_then(Value::as_str).and_then(parse_date)
}

/// Merge upstream results into one calendar.
///
/// The schedule is ordered by date with undated items last, keeping their
/// relative order. Recommendations come from step 9, KPIs and actions from
/// step 10, alignment from step 11. Every upstream result is carried under
/// `context`.
pub fn assemble_calendar(ctx: &PipelineContext) -> Value {
    let mut schedule = array(ctx, StepId::DailyContentPlanning, "schedule");
    schedule.sort_by_key(|item| match item_date(item) {
        Some(date) => (0, Some(date)),
        None => (1, None),
    });

    let duration_weeks = ctx
        .field(StepId::CalendarFramework, "duration_weeks")
        .as_u64()
        .unwrap_or(0);
    let alignment = ctx.field(StepId::StrategyAlignmentValidation, "alignment_score");

    json!({
        "duration_weeks": duration_weeks,
        "posting_frequency": ctx.field(StepId::CalendarFramework, "posting_frequency"),
        "weekly_themes": array(ctx, StepId::WeeklyThemeDevelopment, "weekly_themes"),
        "schedule": schedule,
        "recommendations": array(ctx, StepId::ContentRecommendations, "recommendations"),
        "kpis": array(ctx, StepId::PerformanceOptimization, "kpis"),
        "optimization_actions": array(ctx, StepId::PerformanceOptimization, "optimization_actions"),
        "alignment": {
            "score": alignment,
            "misalignments": array(ctx, StepId::StrategyAlignmentValidation, "misalignments"),
        },
        "context": ctx.to_json(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_sorted_with_undated_last() {
        let mut ctx = PipelineContext::new();
        ctx.insert(StepId::CalendarFramework, json!({ "duration_weeks": 2 }));
        ctx.insert(
            StepId::DailyContentPlanning,
            json!({ "schedule": [
                { "title": "b", "date": "2026-03-09" },
                { "title": "undated" },
                { "title": "a", "date": "2026-03-02" },
            ]}),
        );

        let calendar = assemble_calendar(&ctx);
        let titles: Vec<&str> = calendar["schedule"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["a", "b", "undated"]);
        assert_eq!(calendar["duration_weeks"], json!(2));
        assert!(calendar["context"]["step_04"].is_object());
        assert_eq!(calendar["kpis"], json!([]));
    }
}
