use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Confidence bookkeeping.
// A step without a removal records `None`. Absent values are skipped when
// averaging, never counted as zero.

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum CleaningPhase {
    StructuralRemoval,
    ContentRemoval,
    Reflow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepConfidence {
    pub step: String,
    pub phase: CleaningPhase,
    pub confidence: Option<f64>,
    /// Set when a deterministic fallback replaced the AI result
    pub fallback: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfidenceLedger {
    steps: Vec<StepConfidence>,
}

impl ConfidenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        step: impl Into<String>,
        phase: CleaningPhase,
        confidence: Option<f64>,
        fallback: bool,
    ) {
        self.steps.push(StepConfidence {
            step: step.into(),
            phase,
            confidence,
            fallback,
        });
    }

    pub fn steps(&self) -> &[StepConfidence] {
        &self.steps
    }

    pub fn phase_confidence(&self, phase: CleaningPhase) -> Option<f64> {
        mean(
            self.steps
                .iter()
                .filter(|s| s.phase == phase)
                .filter_map(|s| s.confidence),
        )
    }

    /// Every phase with at least one recorded step, absent or not
    pub fn phase_confidences(&self) -> BTreeMap<CleaningPhase, Option<f64>> {
        let mut phases = BTreeMap::new();
        for step in &self.steps {
            phases
                .entry(step.phase)
                .or_insert_with(|| self.phase_confidence(step.phase));
        }
        phases
    }

    pub fn pipeline_confidence(&self) -> Option<f64> {
        mean(self.phase_confidences().into_values().flatten())
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
