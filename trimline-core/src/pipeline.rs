use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::confidence::{CleaningPhase, ConfidenceLedger};
use crate::config::CleaningConfig;
use crate::error::CleaningError;
use crate::progress::{CancellationToken, NullObserver, PipelineEvent, ProgressObserver};
use crate::proposer::{BoundaryProposer, NoProposer};
use crate::report::{CleaningReport, StepRecord};
use crate::rewrite::{run_rewrite_step, NoRewriter, RewriteKind, TextRewriter};
use crate::rules::{DefenseChain, SectionResolution};
use crate::text_ops::{LineTextOps, TextOps};
use crate::types::{DefenseDecision, SectionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    RemoveSection(SectionType),
    Rewrite(RewriteKind),
}

impl PipelineStep {
    /// Step names as they appear in config; unknown names are None
    pub fn from_name(name: &str) -> Option<Self> {
        let step = match name {
            "FrontMatter" => PipelineStep::RemoveSection(SectionType::FrontMatter),
            "TableOfContents" => PipelineStep::RemoveSection(SectionType::TableOfContents),
            "AuxiliaryLists" => PipelineStep::RemoveSection(SectionType::AuxiliaryLists),
            "Index" => PipelineStep::RemoveSection(SectionType::Index),
            "BackMatter" => PipelineStep::RemoveSection(SectionType::BackMatter),
            "FootnotesEndnotes" => PipelineStep::RemoveSection(SectionType::FootnotesEndnotes),
            "ParagraphReflow" => PipelineStep::Rewrite(RewriteKind::ParagraphReflow),
            "ParagraphSplit" => PipelineStep::Rewrite(RewriteKind::ParagraphSplit),
            _ => return None,
        };
        Some(step)
    }

    pub fn phase(&self) -> CleaningPhase {
        match self {
            PipelineStep::RemoveSection(section) => section.phase(),
            PipelineStep::Rewrite(_) => CleaningPhase::Reflow,
        }
    }
}

/// Sequential cleaning run over one document. Each step sees the output of the
/// previous one, so every section is re-detected on the current text.
pub struct CleaningPipeline {
    chain: DefenseChain,
    rewriter: Box<dyn TextRewriter>,
    text_ops: Arc<dyn TextOps + Send + Sync>,
    config: CleaningConfig,
}

impl CleaningPipeline {
    /// Create a pipeline with full dependency injection
    pub fn new(
        proposer: Box<dyn BoundaryProposer>,
        rewriter: Box<dyn TextRewriter>,
        text_ops: Arc<dyn TextOps + Send + Sync>,
        config: CleaningConfig,
    ) -> Result<Self, CleaningError> {
        let chain = DefenseChain::new(proposer, Arc::clone(&text_ops), config.proposal.clone())?;
        Ok(Self {
            chain,
            rewriter,
            text_ops,
            config,
        })
    }

    /// Heuristics only: no proposer, no rewriter, default line model
    pub fn with_defaults() -> Result<Self, CleaningError> {
        Self::new(
            Box::new(NoProposer),
            Box::new(NoRewriter),
            Arc::new(LineTextOps::new()),
            CleaningConfig::default(),
        )
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    pub fn chain(&self) -> &DefenseChain {
        &self.chain
    }

    pub fn resolve_section(&self, section: SectionType, text: &str) -> SectionResolution {
        self.chain.resolve_section(section, text)
    }

    pub fn clean(&self, text: &str) -> Result<CleaningReport, CleaningError> {
        self.run(text, &CancellationToken::new(), &mut NullObserver)
    }

    pub fn run(
        &self,
        text: &str,
        cancel: &CancellationToken,
        observer: &mut dyn ProgressObserver,
    ) -> Result<CleaningReport, CleaningError> {
        if text.trim().is_empty() {
            return Err(CleaningError::EmptyDocument);
        }

        let run_id = Uuid::new_v4();
        let created_at = Utc::now();
        let steps = self.planned_steps();
        let total = steps.len();
        info!(run_id = %run_id, steps = total, "starting cleaning run");

        let mut current = text.to_string();
        let mut ledger = ConfidenceLedger::new();
        let mut records = Vec::with_capacity(total);
        let mut cancelled = false;

        for (index, (name, step)) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(run_id = %run_id, completed = index, "cleaning run cancelled");
                observer.on_event(&PipelineEvent::Cancelled {
                    completed_steps: index,
                });
                cancelled = true;
                break;
            }

            observer.on_event(&PipelineEvent::StepStarted {
                step: name.clone(),
                index,
                total,
            });

            let started = Instant::now();
            let lines_before = self.text_ops.count_lines(&current);
            let (decision, confidence, fallback) = match step {
                PipelineStep::RemoveSection(section) => {
                    let resolution = self.chain.resolve_section(*section, &current);
                    observer.on_event(&PipelineEvent::SectionResolved {
                        section: *section,
                        decision: resolution.decision.clone(),
                    });
                    current = self.chain.apply_resolution(&current, &resolution);
                    let confidence = resolution.decision.confidence();
                    (Some(resolution.decision), confidence, false)
                }
                PipelineStep::Rewrite(kind) => {
                    let outcome = run_rewrite_step(
                        self.rewriter.as_ref(),
                        self.text_ops.as_ref(),
                        &current,
                        *kind,
                        self.config.rewrite.max_sentences_per_paragraph,
                    );
                    current = outcome.text;
                    (None::<DefenseDecision>, Some(outcome.confidence), outcome.fallback)
                }
            };
            let lines_after = self.text_ops.count_lines(&current);
            let duration_ms = started.elapsed().as_millis() as u64;

            ledger.record(name.as_str(), step.phase(), confidence, fallback);
            info!(
                step = %name,
                lines_before,
                lines_after,
                confidence = ?confidence,
                fallback,
                duration_ms,
                "step complete"
            );
            records.push(StepRecord {
                step: name.clone(),
                phase: step.phase(),
                decision,
                confidence,
                fallback,
                lines_before,
                lines_after,
                duration_ms,
            });
            observer.on_event(&PipelineEvent::StepCompleted {
                step: name.clone(),
                confidence,
                fallback,
            });
        }

        let report = CleaningReport {
            run_id,
            created_at,
            input_lines: self.text_ops.count_lines(text),
            input_words: self.text_ops.count_words(text),
            output_lines: self.text_ops.count_lines(&current),
            output_words: self.text_ops.count_words(&current),
            steps: records,
            phase_confidences: ledger.phase_confidences(),
            pipeline_confidence: ledger.pipeline_confidence(),
            cancelled,
            text: current,
        };
        info!(
            run_id = %run_id,
            removed_lines = report.removed_lines(),
            pipeline_confidence = ?report.pipeline_confidence,
            cancelled,
            "cleaning run finished"
        );
        Ok(report)
    }

    fn planned_steps(&self) -> Vec<(String, PipelineStep)> {
        self.config
            .pipeline
            .enabled_steps()
            .filter_map(|name| match PipelineStep::from_name(name) {
                Some(step) => Some((name.to_string(), step)),
                None => {
                    warn!(step = %name, "unknown step, skipping");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StepConfig;

    fn pipeline_with_steps(names: &[&str]) -> CleaningPipeline {
        let mut config = CleaningConfig::default();
        config.pipeline.steps = names.iter().map(|n| StepConfig::new(n)).collect();
        CleaningPipeline::new(
            Box::new(NoProposer),
            Box::new(NoRewriter),
            Arc::new(LineTextOps::new()),
            config,
        )
        .unwrap()
    }

    #[test]
    fn empty_document_is_an_error() {
        let pipeline = CleaningPipeline::with_defaults().unwrap();
        assert!(matches!(pipeline.clean("  \n"), Err(CleaningError::EmptyDocument)));
    }

    #[test]
    fn unknown_steps_are_skipped() {
        let pipeline = pipeline_with_steps(&["Colophon", "ParagraphReflow"]);
        let report = pipeline.clean("one\ntwo\n").unwrap();
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.text, "one two\n");
    }

    #[test]
    fn disabled_steps_are_not_planned() {
        let mut pipeline = pipeline_with_steps(&["Index", "BackMatter", "ParagraphReflow"]);
        pipeline.config.pipeline.steps[1].enabled = false;
        let planned: Vec<String> = pipeline.planned_steps().into_iter().map(|(n, _)| n).collect();
        assert_eq!(planned, vec!["Index", "ParagraphReflow"]);

        let report = pipeline.clean("one\ntwo\n").unwrap();
        assert_eq!(report.steps.len(), 2);
        assert!(report.steps.iter().all(|s| s.step != "BackMatter"));
    }

    #[test]
    fn preserved_sections_record_absent_confidence() {
        let pipeline = pipeline_with_steps(&["Index", "ParagraphReflow"]);
        let report = pipeline.clean("plain text\nwith nothing to remove\n").unwrap();
        assert_eq!(report.steps[0].confidence, None);
        assert_eq!(report.phase_confidences[&CleaningPhase::StructuralRemoval], None);
        // Only the reflow phase contributes
        assert_eq!(report.pipeline_confidence, Some(0.75));
    }

    #[test]
    fn cancelled_before_start_returns_input() {
        let pipeline = CleaningPipeline::with_defaults().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut events = Vec::new();
        let mut observer = |e: &PipelineEvent| events.push(e.clone());
        let report = pipeline.run("some\ntext\n", &cancel, &mut observer).unwrap();
        assert!(report.cancelled);
        assert!(report.steps.is_empty());
        assert_eq!(report.text, "some\ntext\n");
        assert_eq!(events, vec![PipelineEvent::Cancelled { completed_steps: 0 }]);
    }

    #[test]
    fn step_names_map_to_phases() {
        assert_eq!(
            PipelineStep::from_name("FootnotesEndnotes").unwrap().phase(),
            CleaningPhase::ContentRemoval
        );
        assert_eq!(
            PipelineStep::from_name("TableOfContents").unwrap().phase(),
            CleaningPhase::StructuralRemoval
        );
        assert_eq!(
            PipelineStep::from_name("ParagraphSplit").unwrap().phase(),
            CleaningPhase::Reflow
        );
        assert_eq!(PipelineStep::from_name("Appendix"), None);
    }
}
