use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::confidence::CleaningPhase;

// ===== SECTION MODEL =====
// Shared vocabulary for every phase of the boundary defense.
// Line numbers are always 0-indexed and only valid against the text snapshot
// they were computed from.

/// Closed set of removable document regions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum SectionType {
    FrontMatter,
    TableOfContents,
    AuxiliaryLists,
    Index,
    BackMatter,
    FootnotesEndnotes,
    Other,
}

/// Which side of the document a section is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryAnchor {
    /// Always starts at line 0, only the end line is meaningful
    DocumentStart,
    /// Runs from the start line through the end of the document
    DocumentEnd,
    /// Needs both a start and an end line
    ClosedRange,
}

impl SectionType {
    /// Removable section types in default pipeline order
    pub const REMOVABLE: [SectionType; 6] = [
        SectionType::FrontMatter,
        SectionType::TableOfContents,
        SectionType::AuxiliaryLists,
        SectionType::Index,
        SectionType::BackMatter,
        SectionType::FootnotesEndnotes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::FrontMatter => "frontMatter",
            SectionType::TableOfContents => "tableOfContents",
            SectionType::AuxiliaryLists => "auxiliaryLists",
            SectionType::Index => "index",
            SectionType::BackMatter => "backMatter",
            SectionType::FootnotesEndnotes => "footnotesEndnotes",
            SectionType::Other => "other",
        }
    }

    /// Human-readable name used in explanations and log lines
    pub fn label(&self) -> &'static str {
        match self {
            SectionType::FrontMatter => "front matter",
            SectionType::TableOfContents => "table of contents",
            SectionType::AuxiliaryLists => "auxiliary lists",
            SectionType::Index => "index",
            SectionType::BackMatter => "back matter",
            SectionType::FootnotesEndnotes => "footnotes/endnotes",
            SectionType::Other => "other",
        }
    }

    pub fn anchor(&self) -> BoundaryAnchor {
        match self {
            SectionType::FrontMatter => BoundaryAnchor::DocumentStart,
            SectionType::Index | SectionType::BackMatter => BoundaryAnchor::DocumentEnd,
            SectionType::TableOfContents
            | SectionType::AuxiliaryLists
            | SectionType::FootnotesEndnotes
            | SectionType::Other => BoundaryAnchor::ClosedRange,
        }
    }

    /// Confidence phase the removal step for this section belongs to
    pub fn phase(&self) -> CleaningPhase {
        match self {
            SectionType::FootnotesEndnotes | SectionType::Other => CleaningPhase::ContentRemoval,
            _ => CleaningPhase::StructuralRemoval,
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = String;

    /// Accepts camelCase, kebab-case and snake_case spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "frontmatter" => Ok(SectionType::FrontMatter),
            "tableofcontents" | "toc" => Ok(SectionType::TableOfContents),
            "auxiliarylists" => Ok(SectionType::AuxiliaryLists),
            "index" => Ok(SectionType::Index),
            "backmatter" => Ok(SectionType::BackMatter),
            "footnotesendnotes" | "footnotes" | "endnotes" => Ok(SectionType::FootnotesEndnotes),
            "other" => Ok(SectionType::Other),
            _ => Err(format!("unknown section type: {s}")),
        }
    }
}

/// Candidate removal region. Untrusted when it comes from the AI proposer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryInfo {
    #[serde(default)]
    pub start_line: Option<usize>,
    #[serde(default)]
    pub end_line: Option<usize>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl BoundaryInfo {
    pub fn new(start_line: Option<usize>, end_line: Option<usize>, confidence: f64) -> Self {
        Self {
            start_line,
            end_line,
            confidence,
            notes: None,
        }
    }

    pub fn range(start_line: usize, end_line: usize, confidence: f64) -> Self {
        Self::new(Some(start_line), Some(end_line), confidence)
    }

    pub fn starting_at(start_line: usize, confidence: f64) -> Self {
        Self::new(Some(start_line), None, confidence)
    }

    pub fn ending_at(end_line: usize, confidence: f64) -> Self {
        Self::new(None, Some(end_line), confidence)
    }

    /// Neither side present: "no boundary"
    pub fn is_empty(&self) -> bool {
        self.start_line.is_none() && self.end_line.is_none()
    }

    /// Resolve absent sides into a concrete inclusive range.
    ///
    /// Front matter always starts at line 0. A missing start resolves to 0 and a
    /// missing end resolves to the last line of the document.
    pub fn effective_range(&self, section: SectionType, line_count: usize) -> Option<(usize, usize)> {
        if self.is_empty() || line_count == 0 {
            return None;
        }
        let last = line_count - 1;
        let start = match section.anchor() {
            BoundaryAnchor::DocumentStart => 0,
            BoundaryAnchor::DocumentEnd | BoundaryAnchor::ClosedRange => {
                self.start_line.unwrap_or(0)
            }
        };
        let end = self.end_line.unwrap_or(last);
        Some((start, end))
    }
}

// ===== PHASE A: POSITION/SIZE VALIDATION =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoundaryRejectionReason {
    PositionTooEarly,
    PositionTooLate,
    InvalidRange,
    OutOfBounds,
    ExcessiveRemoval,
    SectionTooSmall,
    LowConfidence,
}

impl fmt::Display for BoundaryRejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BoundaryRejectionReason::PositionTooEarly => "positionTooEarly",
            BoundaryRejectionReason::PositionTooLate => "positionTooLate",
            BoundaryRejectionReason::InvalidRange => "invalidRange",
            BoundaryRejectionReason::OutOfBounds => "outOfBounds",
            BoundaryRejectionReason::ExcessiveRemoval => "excessiveRemoval",
            BoundaryRejectionReason::SectionTooSmall => "sectionTooSmall",
            BoundaryRejectionReason::LowConfidence => "lowConfidence",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum ValidationResult {
    Valid,
    Invalid {
        reason: BoundaryRejectionReason,
        explanation: String,
    },
    NoBoundary,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn rejection(&self) -> Option<BoundaryRejectionReason> {
        match self {
            ValidationResult::Invalid { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

// ===== PHASE B: CONTENT VERIFICATION =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentVerificationFailure {
    NoExpectedHeaders,
    NoExpectedStructure,
    ChapterContentFound,
    NarrativeProseFound,
    MainBodyContentFound,
    InsufficientContent,
    AmbiguousPatterns,
}

impl fmt::Display for ContentVerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ContentVerificationFailure::NoExpectedHeaders => "noExpectedHeaders",
            ContentVerificationFailure::NoExpectedStructure => "noExpectedStructure",
            ContentVerificationFailure::ChapterContentFound => "chapterContentFound",
            ContentVerificationFailure::NarrativeProseFound => "narrativeProseFound",
            ContentVerificationFailure::MainBodyContentFound => "mainBodyContentFound",
            ContentVerificationFailure::InsufficientContent => "insufficientContent",
            ContentVerificationFailure::AmbiguousPatterns => "ambiguousPatterns",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum VerificationResult {
    Verified {
        confidence: f64,
        matched_patterns: Vec<String>,
        explanation: String,
    },
    Failed {
        reason: ContentVerificationFailure,
        explanation: String,
    },
    NotApplicable,
}

impl VerificationResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, VerificationResult::Failed { .. })
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            VerificationResult::Verified { confidence, .. } => Some(*confidence),
            _ => None,
        }
    }
}

// ===== PHASE C: HEURISTIC DETECTION =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum HeuristicDetectionResult {
    Found {
        boundary_line: usize,
        confidence: f64,
        matched_patterns: Vec<String>,
        explanation: String,
    },
    NotFound {
        explanation: String,
    },
}

/// Heuristic hit resolved into a concrete, envelope-checked removal range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicRegion {
    pub start_line: usize,
    pub end_line: usize,
    pub confidence: f64,
    pub matched_patterns: Vec<String>,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum RegionDetection {
    Found(HeuristicRegion),
    NotFound { explanation: String },
}

// ===== DEFENSE CHAIN OUTPUT =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecisionSource {
    Ai,
    Heuristic,
}

/// Final per-section verdict. Created fresh for every section on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum DefenseDecision {
    Remove {
        start_line: usize,
        end_line: usize,
        confidence: f64,
        source: DecisionSource,
    },
    Preserve {
        reason: String,
    },
}

impl DefenseDecision {
    pub fn is_remove(&self) -> bool {
        matches!(self, DefenseDecision::Remove { .. })
    }

    /// Confidence of an accepted removal; absent when content is preserved
    pub fn confidence(&self) -> Option<f64> {
        match self {
            DefenseDecision::Remove { confidence, .. } => Some(*confidence),
            DefenseDecision::Preserve { .. } => None,
        }
    }

    pub fn range(&self) -> Option<(usize, usize)> {
        match self {
            DefenseDecision::Remove {
                start_line,
                end_line,
                ..
            } => Some((*start_line, *end_line)),
            DefenseDecision::Preserve { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_type_serializes_camel_case() {
        let json = serde_json::to_string(&SectionType::FootnotesEndnotes).unwrap();
        assert_eq!(json, "\"footnotesEndnotes\"");
        let parsed: SectionType = serde_json::from_str("\"tableOfContents\"").unwrap();
        assert_eq!(parsed, SectionType::TableOfContents);
    }

    #[test]
    fn section_type_parses_loose_spellings() {
        assert_eq!("back-matter".parse::<SectionType>().unwrap(), SectionType::BackMatter);
        assert_eq!("front_matter".parse::<SectionType>().unwrap(), SectionType::FrontMatter);
        assert_eq!("toc".parse::<SectionType>().unwrap(), SectionType::TableOfContents);
        assert!("appendix".parse::<SectionType>().is_err());
    }

    #[test]
    fn front_matter_range_always_starts_at_zero() {
        let boundary = BoundaryInfo::range(12, 40, 0.9);
        assert_eq!(
            boundary.effective_range(SectionType::FrontMatter, 500),
            Some((0, 40))
        );
    }

    #[test]
    fn back_matter_range_runs_to_document_end() {
        let boundary = BoundaryInfo::starting_at(410, 0.8);
        assert_eq!(
            boundary.effective_range(SectionType::BackMatter, 500),
            Some((410, 499))
        );
    }

    #[test]
    fn empty_boundary_has_no_range() {
        let boundary = BoundaryInfo::new(None, None, 0.9);
        assert!(boundary.is_empty());
        assert_eq!(boundary.effective_range(SectionType::Index, 500), None);
        assert_eq!(
            BoundaryInfo::starting_at(0, 0.9).effective_range(SectionType::Index, 0),
            None
        );
    }

    #[test]
    fn boundary_info_accepts_missing_fields() {
        let boundary: BoundaryInfo =
            serde_json::from_str(r#"{"startLine": 410, "confidence": 0.8}"#).unwrap();
        assert_eq!(boundary.start_line, Some(410));
        assert_eq!(boundary.end_line, None);
        assert_eq!(boundary.notes, None);
    }

    #[test]
    fn preserve_has_no_confidence() {
        let decision = DefenseDecision::Preserve {
            reason: "nothing found".to_string(),
        };
        assert_eq!(decision.confidence(), None);
        assert_eq!(decision.range(), None);
        assert!(!decision.is_remove());
    }
}
