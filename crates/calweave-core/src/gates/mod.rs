//! Quality gates for generated calendar artifacts.
//!
//! Each gate scores one property of a JSON artifact in 0.0–1.0 and passes
//! when the score reaches its threshold (inclusive). The
//! [`QualityGateManager`] runs gates independently: a gate that errors is
//! recorded as a failed, zero-score result and the batch carries on.

mod artifact;
pub mod chain_context;
pub mod enterprise;
pub mod kpi;
pub mod mix;
pub mod structure;
pub mod uniqueness;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::domain::{Result, StepId};
use crate::obs;

pub use chain_context::ChainContextGate;
pub use enterprise::EnterpriseStandardsGate;
pub use kpi::KpiIntegrationGate;
pub use mix::ContentMixGate;
pub use structure::CalendarStructureGate;
pub use uniqueness::ContentUniquenessGate;

/// The built-in gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    ContentUniqueness,
    ContentMix,
    ChainContext,
    CalendarStructure,
    EnterpriseStandards,
    KpiIntegration,
}

impl GateKind {
    pub const ALL: [GateKind; 6] = [
        GateKind::ContentUniqueness,
        GateKind::ContentMix,
        GateKind::ChainContext,
        GateKind::CalendarStructure,
        GateKind::EnterpriseStandards,
        GateKind::KpiIntegration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GateKind::ContentUniqueness => "content_uniqueness",
            GateKind::ContentMix => "content_mix",
            GateKind::ChainContext => "chain_context",
            GateKind::CalendarStructure => "calendar_structure",
            GateKind::EnterpriseStandards => "enterprise_standards",
            GateKind::KpiIntegration => "kpi_integration",
        }
    }

    /// Fresh instance of the gate.
    pub fn gate(self) -> Arc<dyn QualityGate> {
        match self {
            GateKind::ContentUniqueness => Arc::new(ContentUniquenessGate),
            GateKind::ContentMix => Arc::new(ContentMixGate),
            GateKind::ChainContext => Arc::new(ChainContextGate),
            GateKind::CalendarStructure => Arc::new(CalendarStructureGate),
            GateKind::EnterpriseStandards => Arc::new(EnterpriseStandardsGate),
            GateKind::KpiIntegration => Arc::new(KpiIntegrationGate),
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validator for one artifact property.
pub trait QualityGate: Send + Sync {
    fn name(&self) -> &str;

    /// Minimum passing score, inclusive.
    fn pass_threshold(&self) -> f64;

    fn validate(&self, artifact: &Value, step: Option<StepId>) -> Result<QualityGateResult>;
}

/// Verdict of one gate on one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGateResult {
    pub gate_name: String,
    pub passed: bool,
    pub score: f64,
    pub threshold: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl QualityGateResult {
    /// Build a result, deciding `passed` against `threshold`.
    pub fn evaluate(
        gate_name: &str,
        score: f64,
        threshold: f64,
        issues: Vec<String>,
        recommendations: Vec<String>,
    ) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            gate_name: gate_name.to_string(),
            passed: score >= threshold,
            score,
            threshold,
            issues,
            recommendations,
        }
    }

    /// Zero-score result for a gate that could not run.
    pub fn errored(gate_name: &str, threshold: f64, reason: impl Into<String>) -> Self {
        Self {
            gate_name: gate_name.to_string(),
            passed: false,
            score: 0.0,
            threshold,
            issues: vec![reason.into()],
            recommendations: Vec::new(),
        }
    }
}

/// Aggregate over one batch of gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub gate_results: Vec<QualityGateResult>,
    /// Mean of gate scores; 0.0 when no gate ran.
    pub overall_score: f64,
    pub passed_gates: usize,
    pub failed_gates: usize,
    pub total_gates: usize,
    pub recommendations: Vec<String>,
}

impl QualityReport {
    pub fn from_results(gate_results: Vec<QualityGateResult>) -> Self {
        let total_gates = gate_results.len();
        let passed_gates = gate_results.iter().filter(|r| r.passed).count();
        let overall_score = if total_gates == 0 {
            0.0
        } else {
            gate_results.iter().map(|r| r.score).sum::<f64>() / total_gates as f64
        };
        let recommendations = gate_results
            .iter()
            .flat_map(|r| r.recommendations.iter().cloned())
            .collect();
        Self {
            gate_results,
            overall_score,
            passed_gates,
            failed_gates: total_gates - passed_gates,
            total_gates,
            recommendations,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed_gates == 0
    }

    pub fn failed_gate_names(&self) -> Vec<String> {
        self.gate_results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.gate_name.clone())
            .collect()
    }
}

/// Runs a fixed set of gates.
pub struct QualityGateManager {
    gates: Vec<Arc<dyn QualityGate>>,
}

impl Default for QualityGateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityGateManager {
    /// Manager over every built-in gate.
    pub fn new() -> Self {
        Self::with_gates(GateKind::ALL.iter().map(|k| k.gate()).collect())
    }

    pub fn with_gates(gates: Vec<Arc<dyn QualityGate>>) -> Self {
        Self { gates }
    }

    pub fn gate_names(&self) -> Vec<&str> {
        self.gates.iter().map(|g| g.name()).collect()
    }

    pub fn validate_all_gates(&self, artifact: &Value, step: Option<StepId>) -> QualityReport {
        self.run(self.gates.iter(), artifact, step)
    }

    /// Run only the gates named by `kinds`.
    pub fn validate_gates(
        &self,
        artifact: &Value,
        step: Option<StepId>,
        kinds: &[GateKind],
    ) -> QualityReport {
        let selected = self
            .gates
            .iter()
            .filter(|g| kinds.iter().any(|k| k.name() == g.name()));
        self.run(selected, artifact, step)
    }

    fn run<'a>(
        &self,
        gates: impl Iterator<Item = &'a Arc<dyn QualityGate>>,
        artifact: &Value,
        step: Option<StepId>,
    ) -> QualityReport {
        let results: Vec<QualityGateResult> = gates
            .map(|gate| match gate.validate(artifact, step) {
                Ok(result) => result,
                Err(e) => {
                    warn!(gate = %gate.name(), error = %e, "quality gate errored");
                    QualityGateResult::errored(gate.name(), gate.pass_threshold(), e.to_string())
                }
            })
            .collect();

        let report = QualityReport::from_results(results);
        obs::emit_gates_evaluated(
            step.map_or("artifact", StepId::key),
            report.overall_score,
            report.passed_gates,
            report.failed_gates,
        );
        report
    }
}
