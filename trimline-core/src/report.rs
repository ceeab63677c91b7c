use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::confidence::CleaningPhase;
use crate::types::DefenseDecision;

/// What happened to one pipeline step
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step: String,
    pub phase: CleaningPhase,
    /// Present only for section removal steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DefenseDecision>,
    pub confidence: Option<f64>,
    pub fallback: bool,
    pub lines_before: usize,
    pub lines_after: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningReport {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub input_lines: usize,
    pub input_words: usize,
    pub output_lines: usize,
    pub output_words: usize,
    pub steps: Vec<StepRecord>,
    pub phase_confidences: BTreeMap<CleaningPhase, Option<f64>>,
    pub pipeline_confidence: Option<f64>,
    pub cancelled: bool,
    #[serde(skip)]
    pub text: String,
}

impl CleaningReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn removed_lines(&self) -> usize {
        self.input_lines.saturating_sub(self.output_lines)
    }

    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.step == name)
    }
}
