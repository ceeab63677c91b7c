use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::content_verification::ContentVerifier;
use super::heuristic_detection::HeuristicDetector;
use super::patterns::PatternLibrary;
use super::position_validation::PositionValidator;
use crate::config::ProposalConfig;
use crate::error::CleaningError;
use crate::proposer::BoundaryProposer;
use crate::sampling::build_sample;
use crate::text_ops::{snapshot_fingerprint, TextOps};
use crate::types::*;

// DefenseChain - gates every content-removing decision.
//
//   proposal -> position validation -> content verification -> Remove(AI)
//       |               | invalid             | failed
//       v               v                     v
//   heuristic detection --------------------------> Remove(Heuristic) | Preserve
//
// Nothing is removed unless it passed A+B (AI path) or C (heuristic path).
// Preserve is a correct outcome, never an error.

/// One entry in the audit trace of a section resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum PhaseOutcome {
    ProposalUnavailable { reason: String },
    Proposed { boundary: BoundaryInfo },
    PositionValidation { result: ValidationResult },
    ContentVerification { result: VerificationResult },
    HeuristicDetection { result: RegionDetection },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResolution {
    pub section: SectionType,
    pub decision: DefenseDecision,
    pub trace: Vec<PhaseOutcome>,
    /// Fingerprint of the text the decision's line numbers refer to
    pub snapshot: String,
    pub line_count: usize,
}

pub struct DefenseChain {
    proposer: Box<dyn BoundaryProposer>,
    text_ops: Arc<dyn TextOps + Send + Sync>,
    proposal: ProposalConfig,
    validator: PositionValidator,
    verifier: ContentVerifier,
    detector: HeuristicDetector,
}

impl DefenseChain {
    pub fn new(
        proposer: Box<dyn BoundaryProposer>,
        text_ops: Arc<dyn TextOps + Send + Sync>,
        proposal: ProposalConfig,
    ) -> Result<Self, CleaningError> {
        let patterns = Arc::new(PatternLibrary::compile()?);
        Ok(Self {
            proposer,
            text_ops,
            proposal,
            validator: PositionValidator::new(),
            verifier: ContentVerifier::new(Arc::clone(&patterns)),
            detector: HeuristicDetector::new(patterns),
        })
    }

    pub fn text_ops(&self) -> &(dyn TextOps + Send + Sync) {
        self.text_ops.as_ref()
    }

    /// Just the decision, for callers that do not need the trace
    pub fn decide(&self, section: SectionType, text: &str) -> DefenseDecision {
        self.resolve_section(section, text).decision
    }

    pub fn resolve_section(&self, section: SectionType, text: &str) -> SectionResolution {
        let line_count = self.text_ops.count_lines(text);
        let mut trace = Vec::new();
        let decision = self.run_chain(section, text, line_count, &mut trace);

        match &decision {
            DefenseDecision::Remove {
                start_line,
                end_line,
                confidence,
                source,
            } => info!(
                section = %section,
                start_line,
                end_line,
                confidence,
                source = ?source,
                "section boundary accepted"
            ),
            DefenseDecision::Preserve { reason } => {
                info!(section = %section, "section preserved: {}", reason)
            }
        }

        SectionResolution {
            section,
            decision,
            trace,
            snapshot: snapshot_fingerprint(text),
            line_count,
        }
    }

    fn run_chain(
        &self,
        section: SectionType,
        text: &str,
        line_count: usize,
        trace: &mut Vec<PhaseOutcome>,
    ) -> DefenseDecision {
        if section == SectionType::Other {
            return DefenseDecision::Preserve {
                reason: "sections of type other are never removed".to_string(),
            };
        }
        if line_count == 0 {
            return DefenseDecision::Preserve {
                reason: "document is empty".to_string(),
            };
        }

        // 1. Proposal
        let mut ai_note = None;
        match self.request_proposal(section, text) {
            Err(reason) => {
                debug!(section = %section, "no proposal: {}", reason);
                ai_note = Some(format!("no AI proposal ({})", reason));
                trace.push(PhaseOutcome::ProposalUnavailable { reason });
            }
            Ok(boundary) => {
                trace.push(PhaseOutcome::Proposed {
                    boundary: boundary.clone(),
                });

                // 2. Position/size
                let validation = self.validator.validate(&boundary, section, line_count);
                trace.push(PhaseOutcome::PositionValidation {
                    result: validation.clone(),
                });

                match validation {
                    ValidationResult::Valid => {
                        if let Some((start, end)) = boundary.effective_range(section, line_count) {
                            // 3. Content
                            let verification = self.verifier.verify(section, text, start, Some(end));
                            trace.push(PhaseOutcome::ContentVerification {
                                result: verification.clone(),
                            });
                            match verification {
                                VerificationResult::Failed { reason, .. } => {
                                    debug!(section = %section, reason = %reason, "proposal failed content check");
                                    ai_note = Some(format!("AI proposal failed content check ({})", reason));
                                }
                                VerificationResult::Verified { .. } | VerificationResult::NotApplicable => {
                                    return DefenseDecision::Remove {
                                        start_line: start,
                                        end_line: end,
                                        confidence: boundary.confidence,
                                        source: DecisionSource::Ai,
                                    };
                                }
                            }
                        }
                    }
                    ValidationResult::Invalid { reason, .. } => {
                        ai_note = Some(format!("AI proposal rejected ({})", reason));
                    }
                    ValidationResult::NoBoundary => {
                        ai_note = Some("AI reported no boundary".to_string());
                    }
                }
            }
        }

        // 4. Heuristic fallback
        let detection = self.detector.detect_region(section, text);
        trace.push(PhaseOutcome::HeuristicDetection {
            result: detection.clone(),
        });
        match detection {
            RegionDetection::Found(region) => DefenseDecision::Remove {
                start_line: region.start_line,
                end_line: region.end_line,
                confidence: region.confidence,
                source: DecisionSource::Heuristic,
            },
            RegionDetection::NotFound { explanation } => DefenseDecision::Preserve {
                reason: match ai_note {
                    Some(note) => format!("{}; heuristic: {}", note, explanation),
                    None => format!("heuristic: {}", explanation),
                },
            },
        }
    }

    fn request_proposal(&self, section: SectionType, text: &str) -> Result<BoundaryInfo, String> {
        if !self.proposal.enabled {
            return Err("proposals disabled".to_string());
        }
        let sample = build_sample(section, text, self.proposal.max_sample_lines);
        if sample.text.is_empty() {
            return Err("empty sample".to_string());
        }
        self.proposer
            .propose(&sample.text, section)
            .map_err(|e| format!("{}: {}", self.proposer.name(), e))
    }

    /// Apply a decision to the text it was computed on. Line numbers from any
    /// other snapshot are refused and the text comes back unchanged.
    pub fn apply_resolution(&self, text: &str, resolution: &SectionResolution) -> String {
        if snapshot_fingerprint(text) != resolution.snapshot {
            warn!(
                section = %resolution.section,
                "refusing to apply boundary computed on a different text snapshot"
            );
            return text.to_string();
        }
        match resolution.decision {
            DefenseDecision::Remove {
                start_line,
                end_line,
                ..
            } => self.text_ops.remove_lines(text, start_line, end_line),
            DefenseDecision::Preserve { .. } => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposer::{NoProposer, StaticProposer};
    use crate::text_ops::LineTextOps;

    fn chain(proposer: Box<dyn BoundaryProposer>) -> DefenseChain {
        DefenseChain::new(proposer, Arc::new(LineTextOps::new()), ProposalConfig::default()).unwrap()
    }

    fn document_with_notes() -> String {
        let mut lines: Vec<String> = (0..500)
            .map(|i| format!("Body line {} with an unremarkable sentence.", i))
            .collect();
        lines[410] = "# NOTES".to_string();
        for i in 0..5 {
            lines[411 + i] = format!("{}. Author, Some Book, p. {}.", i + 1, i + 3);
        }
        lines.join("\n")
    }

    #[test]
    fn other_is_always_preserved() {
        let proposer = StaticProposer::new().with(SectionType::Other, BoundaryInfo::range(1, 3, 1.0));
        let resolution = chain(Box::new(proposer)).resolve_section(SectionType::Other, "a\nb\nc\nd");
        assert!(!resolution.decision.is_remove());
        assert!(resolution.trace.is_empty());
    }

    #[test]
    fn verified_proposal_is_removed_with_ai_confidence() {
        let proposer =
            StaticProposer::new().with(SectionType::BackMatter, BoundaryInfo::starting_at(410, 0.8));
        let resolution = chain(Box::new(proposer)).resolve_section(SectionType::BackMatter, &document_with_notes());
        assert_eq!(
            resolution.decision,
            DefenseDecision::Remove {
                start_line: 410,
                end_line: 499,
                confidence: 0.8,
                source: DecisionSource::Ai,
            }
        );
        assert_eq!(resolution.trace.len(), 3);
    }

    #[test]
    fn rejected_proposal_falls_back_to_heuristics() {
        let proposer =
            StaticProposer::new().with(SectionType::BackMatter, BoundaryInfo::starting_at(4, 0.9));
        let resolution = chain(Box::new(proposer)).resolve_section(SectionType::BackMatter, &document_with_notes());
        match resolution.decision {
            DefenseDecision::Remove { start_line, source, .. } => {
                assert_eq!(start_line, 410);
                assert_eq!(source, DecisionSource::Heuristic);
            }
            other => panic!("expected heuristic removal, got {:?}", other),
        }
        assert!(matches!(
            resolution.trace[1],
            PhaseOutcome::PositionValidation {
                result: ValidationResult::Invalid {
                    reason: BoundaryRejectionReason::PositionTooEarly,
                    ..
                }
            }
        ));
    }

    #[test]
    fn stale_snapshot_is_refused() {
        let chain = chain(Box::new(NoProposer));
        let text = document_with_notes();
        let resolution = chain.resolve_section(SectionType::BackMatter, &text);
        assert!(resolution.decision.is_remove());

        let edited = format!("new first line\n{}", text);
        assert_eq!(chain.apply_resolution(&edited, &resolution), edited);

        let trimmed = chain.apply_resolution(&text, &resolution);
        assert_eq!(chain.text_ops().count_lines(&trimmed), 410);
    }

    #[test]
    fn disabled_proposals_skip_the_proposer() {
        let proposer =
            StaticProposer::new().with(SectionType::BackMatter, BoundaryInfo::starting_at(410, 0.8));
        let config = ProposalConfig {
            enabled: false,
            ..ProposalConfig::default()
        };
        let chain = DefenseChain::new(Box::new(proposer), Arc::new(LineTextOps::new()), config).unwrap();
        let resolution = chain.resolve_section(SectionType::BackMatter, &document_with_notes());
        assert!(matches!(resolution.trace[0], PhaseOutcome::ProposalUnavailable { .. }));
        assert!(matches!(
            resolution.decision,
            DefenseDecision::Remove {
                source: DecisionSource::Heuristic,
                ..
            }
        ));
    }
}
