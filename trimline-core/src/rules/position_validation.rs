use tracing::warn;

use crate::constraints::ValidationConstraints;
use crate::types::*;

// PositionValidator - Phase A of the boundary defense.
// Rejects any proposal that falls outside the per-section position, size or
// confidence envelope. Pure: the only side effect is the audit log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionValidator;

/// Percentages computed while checking a boundary, kept for the audit log
#[derive(Debug, Clone, Copy)]
struct Envelope {
    start: usize,
    end: usize,
    start_pct: f64,
    end_pct: f64,
    removal_pct: f64,
    removed_lines: usize,
}

impl PositionValidator {
    pub fn new() -> Self {
        Self
    }

    /// Full check: position, size and confidence
    pub fn validate(
        &self,
        boundary: &BoundaryInfo,
        section: SectionType,
        line_count: usize,
    ) -> ValidationResult {
        match self.check_envelope(boundary, section, line_count) {
            Ok(Some(_)) => {}
            Ok(None) => return ValidationResult::NoBoundary,
            Err(invalid) => return invalid,
        }

        let constraints = section.constraints();
        // NaN never passes
        if !(boundary.confidence >= constraints.min_confidence) {
            return self.reject(
                section,
                BoundaryRejectionReason::LowConfidence,
                format!(
                    "confidence {:.2} is below the {} minimum of {:.2}",
                    boundary.confidence,
                    section.label(),
                    constraints.min_confidence
                ),
                boundary,
                line_count,
                constraints.min_confidence,
            );
        }

        ValidationResult::Valid
    }

    /// Position and size checks only. Heuristic boundaries carry their own
    /// confidence gate, so they are held to the same envelope without it.
    pub fn validate_envelope(
        &self,
        boundary: &BoundaryInfo,
        section: SectionType,
        line_count: usize,
    ) -> ValidationResult {
        match self.check_envelope(boundary, section, line_count) {
            Ok(Some(_)) => ValidationResult::Valid,
            Ok(None) => ValidationResult::NoBoundary,
            Err(invalid) => invalid,
        }
    }

    fn check_envelope(
        &self,
        boundary: &BoundaryInfo,
        section: SectionType,
        line_count: usize,
    ) -> Result<Option<Envelope>, ValidationResult> {
        // 1. Nothing proposed
        if boundary.is_empty() {
            return Ok(None);
        }

        // 2. Bounds
        for line in [boundary.start_line, boundary.end_line].into_iter().flatten() {
            if line >= line_count {
                return Err(self.reject(
                    section,
                    BoundaryRejectionReason::OutOfBounds,
                    format!(
                        "line {} is outside a document of {} lines",
                        line, line_count
                    ),
                    boundary,
                    line_count,
                    line_count as f64,
                ));
            }
        }

        // 3. Inverted range
        if let (Some(start), Some(end)) = (boundary.start_line, boundary.end_line) {
            if start > end {
                return Err(self.reject(
                    section,
                    BoundaryRejectionReason::InvalidRange,
                    format!("start line {} is after end line {}", start, end),
                    boundary,
                    line_count,
                    0.0,
                ));
            }
        }

        // Bounds and ordering are settled, so start <= end from here on
        let Some((start, end)) = boundary.effective_range(section, line_count) else {
            return Ok(None);
        };

        let total = line_count as f64;
        let removed_lines = end - start + 1;
        let envelope = Envelope {
            start,
            end,
            start_pct: start as f64 / total,
            end_pct: end as f64 / total,
            removal_pct: removed_lines as f64 / total,
            removed_lines,
        };
        let constraints = section.constraints();

        // 4. Position
        self.check_position(section, &constraints, &envelope, boundary, line_count)?;

        // 5. Removal size
        let ceiling = constraints.max_removal_for(section, envelope.start_pct);
        if envelope.removal_pct > ceiling {
            return Err(self.reject(
                section,
                BoundaryRejectionReason::ExcessiveRemoval,
                format!(
                    "removing lines {}-{} deletes {:.1}% of the document, {} allows at most {:.1}%",
                    envelope.start,
                    envelope.end,
                    envelope.removal_pct * 100.0,
                    section.label(),
                    ceiling * 100.0
                ),
                boundary,
                line_count,
                ceiling,
            ));
        }

        // 6. Minimum size
        if envelope.removed_lines < constraints.min_lines {
            return Err(self.reject(
                section,
                BoundaryRejectionReason::SectionTooSmall,
                format!(
                    "{} lines is smaller than the {} minimum of {} lines",
                    envelope.removed_lines,
                    section.label(),
                    constraints.min_lines
                ),
                boundary,
                line_count,
                constraints.min_lines as f64,
            ));
        }

        Ok(Some(envelope))
    }

    fn check_position(
        &self,
        section: SectionType,
        constraints: &ValidationConstraints,
        envelope: &Envelope,
        boundary: &BoundaryInfo,
        line_count: usize,
    ) -> Result<(), ValidationResult> {
        if let Some(min_start) = constraints.min_start_percent {
            if envelope.start_pct < min_start {
                return Err(self.reject(
                    section,
                    BoundaryRejectionReason::PositionTooEarly,
                    format!(
                        "{} cannot start at line {} ({:.1}%), earliest legal start is {:.0}%",
                        section.label(),
                        envelope.start,
                        envelope.start_pct * 100.0,
                        min_start * 100.0
                    ),
                    boundary,
                    line_count,
                    min_start,
                ));
            }
        }

        if let Some(max_end) = constraints.max_end_percent {
            if envelope.end_pct > max_end {
                return Err(self.reject(
                    section,
                    BoundaryRejectionReason::PositionTooLate,
                    format!(
                        "{} cannot end at line {} ({:.1}%), latest legal end is {:.0}%",
                        section.label(),
                        envelope.end,
                        envelope.end_pct * 100.0,
                        max_end * 100.0
                    ),
                    boundary,
                    line_count,
                    max_end,
                ));
            }
        }

        Ok(())
    }

    fn reject(
        &self,
        section: SectionType,
        reason: BoundaryRejectionReason,
        explanation: String,
        boundary: &BoundaryInfo,
        line_count: usize,
        threshold: f64,
    ) -> ValidationResult {
        let pct = |line: Option<usize>| match line {
            Some(l) if line_count > 0 => format!("{:.1}", l as f64 / line_count as f64 * 100.0),
            _ => "-".to_string(),
        };
        let removal = boundary
            .effective_range(section, line_count)
            .filter(|(s, e)| s <= e)
            .map(|(s, e)| format!("{:.1}", (e - s + 1) as f64 / line_count as f64 * 100.0))
            .unwrap_or_else(|| "-".to_string());

        warn!(
            section = %section,
            reason = %reason,
            start_pct = %pct(boundary.start_line),
            end_pct = %pct(boundary.end_line),
            removal_pct = %removal,
            threshold,
            line_count,
            "boundary rejected: {}",
            explanation
        );

        ValidationResult::Invalid {
            reason,
            explanation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(result: ValidationResult) -> BoundaryRejectionReason {
        result.rejection().expect("expected a rejection")
    }

    #[test]
    fn empty_proposal_is_no_boundary() {
        let v = PositionValidator::new();
        let result = v.validate(&BoundaryInfo::new(None, None, 0.9), SectionType::BackMatter, 500);
        assert_eq!(result, ValidationResult::NoBoundary);
    }

    #[test]
    fn back_matter_at_line_four_is_too_early() {
        let v = PositionValidator::new();
        let result = v.validate(&BoundaryInfo::starting_at(4, 0.9), SectionType::BackMatter, 500);
        assert_eq!(reason(result), BoundaryRejectionReason::PositionTooEarly);
    }

    #[test]
    fn back_matter_in_last_fifth_is_valid() {
        let v = PositionValidator::new();
        let result = v.validate(&BoundaryInfo::starting_at(410, 0.8), SectionType::BackMatter, 500);
        assert!(result.is_valid());
    }

    #[test]
    fn out_of_bounds_checked_before_range() {
        let v = PositionValidator::new();
        let result = v.validate(&BoundaryInfo::range(600, 10, 0.9), SectionType::Index, 500);
        assert_eq!(reason(result), BoundaryRejectionReason::OutOfBounds);
    }

    #[test]
    fn inverted_range_rejected() {
        let v = PositionValidator::new();
        let result = v.validate(
            &BoundaryInfo::range(40, 30, 0.9),
            SectionType::TableOfContents,
            500,
        );
        assert_eq!(reason(result), BoundaryRejectionReason::InvalidRange);
    }

    #[test]
    fn toc_ending_past_window_is_too_late() {
        let v = PositionValidator::new();
        let result = v.validate(
            &BoundaryInfo::range(170, 180, 0.9),
            SectionType::TableOfContents,
            500,
        );
        assert_eq!(reason(result), BoundaryRejectionReason::PositionTooLate);
    }

    #[test]
    fn oversized_toc_is_excessive() {
        let v = PositionValidator::new();
        // 110 of 500 lines = 22% > 20%
        let result = v.validate(
            &BoundaryInfo::range(10, 119, 0.9),
            SectionType::TableOfContents,
            500,
        );
        assert_eq!(reason(result), BoundaryRejectionReason::ExcessiveRemoval);
    }

    #[test]
    fn early_footnotes_use_lower_ceiling() {
        let v = PositionValidator::new();
        // 40 lines = 8%: too much in the first half, fine in the second
        let early = v.validate(
            &BoundaryInfo::range(100, 139, 0.9),
            SectionType::FootnotesEndnotes,
            500,
        );
        assert_eq!(reason(early), BoundaryRejectionReason::ExcessiveRemoval);

        let late = v.validate(
            &BoundaryInfo::range(400, 439, 0.9),
            SectionType::FootnotesEndnotes,
            500,
        );
        assert!(late.is_valid());
    }

    #[test]
    fn tiny_index_is_too_small() {
        let v = PositionValidator::new();
        let result = v.validate(&BoundaryInfo::range(480, 484, 0.9), SectionType::Index, 500);
        assert_eq!(reason(result), BoundaryRejectionReason::SectionTooSmall);
    }

    #[test]
    fn confidence_is_checked_last() {
        let v = PositionValidator::new();
        let low = v.validate(&BoundaryInfo::starting_at(410, 0.5), SectionType::BackMatter, 500);
        assert_eq!(reason(low), BoundaryRejectionReason::LowConfidence);

        let nan = v.validate(
            &BoundaryInfo::starting_at(410, f64::NAN),
            SectionType::BackMatter,
            500,
        );
        assert_eq!(reason(nan), BoundaryRejectionReason::LowConfidence);

        // Envelope check ignores confidence entirely
        let envelope = v.validate_envelope(
            &BoundaryInfo::starting_at(410, 0.1),
            SectionType::BackMatter,
            500,
        );
        assert!(envelope.is_valid());
    }

    #[test]
    fn front_matter_only_needs_end_line() {
        let v = PositionValidator::new();
        let ok = v.validate(&BoundaryInfo::ending_at(30, 0.9), SectionType::FrontMatter, 500);
        assert!(ok.is_valid());

        let late = v.validate(&BoundaryInfo::ending_at(250, 0.9), SectionType::FrontMatter, 500);
        assert_eq!(reason(late), BoundaryRejectionReason::PositionTooLate);
    }

    #[test]
    fn open_ended_range_resolves_to_document_end() {
        let v = PositionValidator::new();
        // Start on the last line resolves to a single-line range, not an inverted one
        let last = v.validate(&BoundaryInfo::starting_at(499, 0.9), SectionType::Index, 500);
        assert_eq!(reason(last), BoundaryRejectionReason::SectionTooSmall);

        let front = v.validate(&BoundaryInfo::ending_at(0, 0.9), SectionType::FrontMatter, 500);
        assert_eq!(reason(front), BoundaryRejectionReason::SectionTooSmall);
    }

    #[test]
    fn other_is_never_removable() {
        let v = PositionValidator::new();
        let result = v.validate(&BoundaryInfo::range(100, 120, 1.0), SectionType::Other, 500);
        assert_eq!(reason(result), BoundaryRejectionReason::ExcessiveRemoval);
    }
}
