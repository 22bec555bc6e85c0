//! Built-in per-step prompt templates.
//!
//! Placeholders use `{name}`; see [`super::fill_template`].

use crate::domain::StepId;

pub fn default_template(step: StepId) -> &'static str {
    match step {
        StepId::ContentStrategyAnalysis => STRATEGY_ANALYSIS,
        StepId::GapAnalysis => GAP_ANALYSIS,
        StepId::AudiencePlatformStrategy => AUDIENCE_PLATFORM,
        StepId::CalendarFramework => CALENDAR_FRAMEWORK,
        StepId::ContentPillarDistribution => PILLAR_DISTRIBUTION,
        StepId::PlatformSpecificStrategy => PLATFORM_SPECIFIC,
        StepId::WeeklyThemeDevelopment => WEEKLY_THEMES,
        StepId::DailyContentPlanning => DAILY_PLANNING,
        StepId::ContentRecommendations => RECOMMENDATIONS,
        StepId::PerformanceOptimization => PERFORMANCE_OPTIMIZATION,
        StepId::StrategyAlignmentValidation => STRATEGY_ALIGNMENT,
        StepId::FinalCalendarAssembly => FINAL_ASSEMBLY,
    }
}

const STRATEGY_ANALYSIS: &str = "\
# {step_name}
User: {user_id} | Strategy: {subject_id} | Generated: {timestamp}
Context quality: {quality_summary}

Content strategy:
{content_strategy}

Summarize the strategy, list the business goals, the content pillars and
the target audience. Respond with JSON fields strategy_summary,
business_goals, content_pillars, target_audience.
";

const GAP_ANALYSIS: &str = "\
# {step_name}
User: {user_id} | Strategy: {subject_id} | Generated: {timestamp}
Context quality: {quality_summary}

Strategy:
{content_strategy}

Known gaps:
{gap_analysis}

Keyword research:
{keywords}

Identify the content gaps worth closing and the keyword opportunities
behind them. Respond with JSON fields content_gaps, keyword_opportunities.
";

const AUDIENCE_PLATFORM: &str = "\
# {step_name}
User: {user_id} | Strategy: {subject_id} | Generated: {timestamp}
Context quality: {quality_summary}

Strategy:
{content_strategy}

Historical performance:
{performance_data}

Segment the audience and choose a strategy per platform. Respond with JSON
fields audience_segments, platform_strategies.
";

const CALENDAR_FRAMEWORK: &str = "\
# {step_name}
User: {user_id} | Strategy: {subject_id} | Generated: {timestamp}
Context quality: {quality_summary}

Strategy:
{content_strategy}

Pillars:
{content_pillars}

Lay out the calendar frame: its length in weeks, the posting frequency per
platform and the timeline milestones. Respond with JSON fields
duration_weeks, posting_frequency, timeline.
";

const PILLAR_DISTRIBUTION: &str = "\
# {step_name}
User: {user_id} | Strategy: {subject_id} | Generated: {timestamp}
Context quality: {quality_summary}

Pillars:
{content_pillars}

Strategy:
{content_strategy}

Distribute the calendar's volume across the content pillars. Respond with
JSON field pillar_distribution.
";

const PLATFORM_SPECIFIC: &str = "\
# {step_name}
User: {user_id} | Strategy: {subject_id} | Generated: {timestamp}
Context quality: {quality_summary}

Historical performance:
{performance_data}

Strategy:
{content_strategy}

Refine each platform's formats, cadence and tone. Respond with JSON field
platform_strategies.
";

const WEEKLY_THEMES: &str = "\
# {step_name}
User: {user_id} | Strategy: {subject_id} | Generated: {timestamp}
Context quality: {quality_summary}

Pillars:
{content_pillars}

Keyword research:
{keywords}

Write one distinct theme per calendar week. Respond with JSON field
weekly_themes, a list of objects with week, theme and focus.
";

const DAILY_PLANNING: &str = "\
# {step_name}
User: {user_id} | Strategy: {subject_id} | Generated: {timestamp}
Context quality: {quality_summary}

Strategy:
{content_strategy}

Keyword research:
{keywords}

Pillars:
{content_pillars}

Plan every content item. Respond with JSON field schedule, a list of objects
with title, theme, content_type, platform, category, keywords, date,
description, call_to_action and kpi.
";

const RECOMMENDATIONS: &str = "\
# {step_name}
User: {user_id} | Strategy: {subject_id} | Generated: {timestamp}
Context quality: {quality_summary}

Strategy:
{content_strategy}

Gaps:
{gap_analysis}

Keywords:
{keywords}

Pillars:
{content_pillars}

Performance:
{performance_data}

AI insights:
{ai_analysis}

Propose content ideas. Respond with JSON field recommendations, a list of
objects with title, content_type, platform, priority, pillar, keywords and
description.
";

const PERFORMANCE_OPTIMIZATION: &str = "\
# {step_name}
User: {user_id} | Strategy: {subject_id} | Generated: {timestamp}
Context quality: {quality_summary}

Historical performance:
{performance_data}

AI insights:
{ai_analysis}

Define the KPIs this calendar should move and the actions that optimize
them. Respond with JSON fields kpis (name, target, measurement) and
optimization_actions.
";

const STRATEGY_ALIGNMENT: &str = "\
# {step_name}
User: {user_id} | Strategy: {subject_id} | Generated: {timestamp}
Context quality: {quality_summary}

Strategy:
{content_strategy}

AI insights:
{ai_analysis}

Score how well the plan serves the strategy in 0-1 and list every
misalignment. Respond with JSON fields alignment_score, misalignments.
";

const FINAL_ASSEMBLY: &str = "\
# {step_name}
User: {user_id} | Strategy: {subject_id} | Generated: {timestamp}
Context quality: {quality_summary}

Strategy:
{content_strategy}

Gaps:
{gap_analysis}

Keywords:
{keywords}

Pillars:
{content_pillars}

Performance:
{performance_data}

AI insights:
{ai_analysis}

Assemble the final calendar from the upstream results.
";
