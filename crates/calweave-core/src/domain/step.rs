//! The twelve calendar-generation steps.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One pipeline step. Steps run strictly in declaration order; each reads
/// the results of its [`inputs`](StepId::inputs) from the shared context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StepId {
    #[serde(rename = "step_01")]
    ContentStrategyAnalysis,
    #[serde(rename = "step_02")]
    GapAnalysis,
    #[serde(rename = "step_03")]
    AudiencePlatformStrategy,
    #[serde(rename = "step_04")]
    CalendarFramework,
    #[serde(rename = "step_05")]
    ContentPillarDistribution,
    #[serde(rename = "step_06")]
    PlatformSpecificStrategy,
    #[serde(rename = "step_07")]
    WeeklyThemeDevelopment,
    #[serde(rename = "step_08")]
    DailyContentPlanning,
    #[serde(rename = "step_09")]
    ContentRecommendations,
    #[serde(rename = "step_10")]
    PerformanceOptimization,
    #[serde(rename = "step_11")]
    StrategyAlignmentValidation,
    #[serde(rename = "step_12")]
    FinalCalendarAssembly,
}

impl StepId {
    pub const ALL: [StepId; 12] = [
        StepId::ContentStrategyAnalysis,
        StepId::GapAnalysis,
        StepId::AudiencePlatformStrategy,
        StepId::CalendarFramework,
        StepId::ContentPillarDistribution,
        StepId::PlatformSpecificStrategy,
        StepId::WeeklyThemeDevelopment,
        StepId::DailyContentPlanning,
        StepId::ContentRecommendations,
        StepId::PerformanceOptimization,
        StepId::StrategyAlignmentValidation,
        StepId::FinalCalendarAssembly,
    ];

    /// 1-based position in the pipeline.
    pub fn number(self) -> usize {
        self as usize + 1
    }

    /// Stable context key, `step_01` … `step_12`.
    pub fn key(self) -> &'static str {
        match self {
            StepId::ContentStrategyAnalysis => "step_01",
            StepId::GapAnalysis => "step_02",
            StepId::AudiencePlatformStrategy => "step_03",
            StepId::CalendarFramework => "step_04",
            StepId::ContentPillarDistribution => "step_05",
            StepId::PlatformSpecificStrategy => "step_06",
            StepId::WeeklyThemeDevelopment => "step_07",
            StepId::DailyContentPlanning => "step_08",
            StepId::ContentRecommendations => "step_09",
            StepId::PerformanceOptimization => "step_10",
            StepId::StrategyAlignmentValidation => "step_11",
            StepId::FinalCalendarAssembly => "step_12",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StepId::ContentStrategyAnalysis => "Content Strategy Analysis",
            StepId::GapAnalysis => "Gap Analysis",
            StepId::AudiencePlatformStrategy => "Audience & Platform Strategy",
            StepId::CalendarFramework => "Calendar Framework",
            StepId::ContentPillarDistribution => "Content Pillar Distribution",
            StepId::PlatformSpecificStrategy => "Platform-Specific Strategy",
            StepId::WeeklyThemeDevelopment => "Weekly Theme Development",
            StepId::DailyContentPlanning => "Daily Content Planning",
            StepId::ContentRecommendations => "Content Recommendations",
            StepId::PerformanceOptimization => "Performance Optimization",
            StepId::StrategyAlignmentValidation => "Strategy Alignment Validation",
            StepId::FinalCalendarAssembly => "Final Calendar Assembly",
        }
    }

    /// Upstream steps whose results this step consumes.
    pub fn inputs(self) -> &'static [StepId] {
        use StepId::*;
        match self {
            ContentStrategyAnalysis => &[],
            GapAnalysis => &[ContentStrategyAnalysis],
            AudiencePlatformStrategy => &[ContentStrategyAnalysis, GapAnalysis],
            CalendarFramework => &[ContentStrategyAnalysis, AudiencePlatformStrategy],
            ContentPillarDistribution => &[ContentStrategyAnalysis, CalendarFramework],
            PlatformSpecificStrategy => &[AudiencePlatformStrategy, ContentPillarDistribution],
            WeeklyThemeDevelopment => &[CalendarFramework, ContentPillarDistribution],
            DailyContentPlanning => &[PlatformSpecificStrategy, WeeklyThemeDevelopment],
            ContentRecommendations => &[
                ContentStrategyAnalysis,
                GapAnalysis,
                AudiencePlatformStrategy,
                DailyContentPlanning,
            ],
            PerformanceOptimization => &[DailyContentPlanning, ContentRecommendations],
            StrategyAlignmentValidation => &[
                ContentStrategyAnalysis,
                DailyContentPlanning,
                PerformanceOptimization,
            ],
            FinalCalendarAssembly => &[
                CalendarFramework,
                WeeklyThemeDevelopment,
                DailyContentPlanning,
                ContentRecommendations,
                PerformanceOptimization,
                StrategyAlignmentValidation,
            ],
        }
    }

    pub fn from_key(key: &str) -> Option<StepId> {
        StepId::ALL.into_iter().find(|s| s.key() == key)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
