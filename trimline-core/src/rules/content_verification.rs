use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use super::patterns::{entry_text, header_text, PatternLibrary};
use crate::text_ops::document_lines;
use crate::types::*;

// ContentVerifier - Phase B of the boundary defense.
// Reads the text inside a proposed region and checks that it looks like the
// section it claims to be, and not like main-body content.

/// Fewer entry lines than this without a header is not convincing
pub const MIN_ENTRY_LINES: usize = 3;

/// Share of prose lines at which an index/back matter window reads as body text
pub const MAIN_BODY_PROSE_RATIO: f64 = 0.5;

/// Multiplier applied when negative evidence sits alongside positive evidence
pub const NEGATIVE_EVIDENCE_DISCOUNT: f64 = 0.7;

const CONFIDENCE_CEILING: f64 = 0.95;
const CONFIDENCE_SPREAD: f64 = 0.45;
const CONFIDENCE_DECAY: f64 = 0.8;
const MAX_COUNTED_HEADERS: usize = 3;
const MAX_COUNTED_ENTRIES: usize = 30;

/// Lines examined per section: (floor, cap)
pub fn verification_window(section: SectionType) -> (usize, usize) {
    match section {
        // Whole candidate region: any chapter heading anywhere disqualifies it
        SectionType::FrontMatter => (3, usize::MAX),
        SectionType::TableOfContents => (3, 150),
        SectionType::AuxiliaryLists => (3, 100),
        SectionType::Index => (5, 200),
        SectionType::BackMatter => (3, 120),
        SectionType::FootnotesEndnotes => (3, 100),
        SectionType::Other => (0, 0),
    }
}

/// Confidence from evidence counts, saturating toward 0.95
pub fn evidence_confidence(headers: usize, entries: usize, negative: bool) -> f64 {
    let score =
        2 * headers.min(MAX_COUNTED_HEADERS) as i32 + entries.min(MAX_COUNTED_ENTRIES) as i32;
    let base = CONFIDENCE_CEILING - CONFIDENCE_SPREAD * CONFIDENCE_DECAY.powi(score);
    if negative {
        base * NEGATIVE_EVIDENCE_DISCOUNT
    } else {
        base
    }
}

#[derive(Debug, Default)]
struct Evidence {
    headers: usize,
    entries: usize,
    chapters: usize,
    prose: usize,
    non_blank: usize,
    matched: BTreeSet<String>,
}

pub struct ContentVerifier {
    patterns: Arc<PatternLibrary>,
}

impl ContentVerifier {
    pub fn new(patterns: Arc<PatternLibrary>) -> Self {
        Self { patterns }
    }

    pub fn verify(
        &self,
        section: SectionType,
        text: &str,
        start_line: usize,
        end_line: Option<usize>,
    ) -> VerificationResult {
        if section == SectionType::Other {
            return VerificationResult::NotApplicable;
        }

        let lines = document_lines(text);
        let (floor, cap) = verification_window(section);
        let region_len = match lines.len().checked_sub(1) {
            Some(last) if start_line <= last => {
                let end = end_line.unwrap_or(last).min(last);
                end.checked_sub(start_line).map(|d| d + 1).unwrap_or(0)
            }
            _ => 0,
        };
        let window_len = region_len.min(cap);
        if window_len < floor {
            return self.fail(
                section,
                ContentVerificationFailure::InsufficientContent,
                format!(
                    "only {} lines to examine, {} needs at least {}",
                    window_len,
                    section.label(),
                    floor
                ),
            );
        }

        let window = &lines[start_line..start_line + window_len];
        let evidence = self.gather(section, window);
        debug!(
            section = %section,
            start_line,
            window_len,
            headers = evidence.headers,
            entries = evidence.entries,
            chapters = evidence.chapters,
            prose = evidence.prose,
            "content evidence gathered"
        );

        match section {
            SectionType::FrontMatter => self.decide_front_matter(evidence),
            _ => self.decide(section, evidence),
        }
    }

    fn gather(&self, section: SectionType, window: &[&str]) -> Evidence {
        let tables = self.patterns.section(section);
        let mut evidence = Evidence::default();

        for line in window {
            if line.trim().is_empty() {
                continue;
            }
            evidence.non_blank += 1;

            if self.patterns.is_chapter_heading(line) {
                evidence.chapters += 1;
                evidence.matched.insert("negative:chapter-heading".to_string());
                continue;
            }

            if let Some(header) = tables.headers.best_match(header_text(line)) {
                evidence.headers += 1;
                evidence.matched.insert(format!("header:{}", header.name));
                continue;
            }

            let entry = entry_text(line);
            let mut is_entry = false;
            for name in tables.entries.matching_names(entry) {
                evidence.matched.insert(format!("entry:{}", name));
                is_entry = true;
            }
            if section == SectionType::Index && self.patterns.is_index_divider(line) {
                evidence.matched.insert("entry:divider".to_string());
                is_entry = true;
            }
            if is_entry {
                evidence.entries += 1;
            } else if self.patterns.is_narrative_prose(line) {
                evidence.prose += 1;
            }
        }

        evidence
    }

    // Front matter is stricter: a single chapter heading anywhere fails it
    fn decide_front_matter(&self, evidence: Evidence) -> VerificationResult {
        let section = SectionType::FrontMatter;
        if evidence.chapters > 0 {
            return self.fail(
                section,
                ContentVerificationFailure::ChapterContentFound,
                format!(
                    "{} chapter heading(s) inside the proposed front matter",
                    evidence.chapters
                ),
            );
        }
        if evidence.headers == 0 {
            return self.fail(
                section,
                ContentVerificationFailure::NoExpectedHeaders,
                "no copyright, dedication, preface or title page markers".to_string(),
            );
        }
        self.verified(section, evidence, false)
    }

    fn decide(&self, section: SectionType, evidence: Evidence) -> VerificationResult {
        let checks_prose = matches!(
            section,
            SectionType::AuxiliaryLists | SectionType::FootnotesEndnotes
        );
        let requires_entries = matches!(
            section,
            SectionType::TableOfContents | SectionType::Index | SectionType::AuxiliaryLists
        );
        let weak = evidence.headers == 0 && evidence.entries < MIN_ENTRY_LINES;
        let has_prose = checks_prose && evidence.prose > 0;
        let negative = evidence.chapters > 0 || has_prose;

        if evidence.chapters > 0 && weak {
            return self.fail(
                section,
                ContentVerificationFailure::ChapterContentFound,
                format!(
                    "{} chapter heading(s) and no convincing {} structure",
                    evidence.chapters,
                    section.label()
                ),
            );
        }

        if has_prose && weak {
            return self.fail(
                section,
                ContentVerificationFailure::NarrativeProseFound,
                format!(
                    "{} narrative prose line(s) and no convincing {} structure",
                    evidence.prose,
                    section.label()
                ),
            );
        }

        if weak && matches!(section, SectionType::Index | SectionType::BackMatter) {
            let ratio = if evidence.non_blank == 0 {
                0.0
            } else {
                evidence.prose as f64 / evidence.non_blank as f64
            };
            if ratio >= MAIN_BODY_PROSE_RATIO {
                return self.fail(
                    section,
                    ContentVerificationFailure::MainBodyContentFound,
                    format!(
                        "{:.0}% of the examined lines read as running prose",
                        ratio * 100.0
                    ),
                );
            }
        }

        if evidence.headers == 0 && evidence.entries == 0 {
            return self.fail(
                section,
                ContentVerificationFailure::NoExpectedHeaders,
                format!("no {} headers or entries in the examined lines", section.label()),
            );
        }

        if requires_entries && evidence.headers > 0 && evidence.entries == 0 {
            return self.fail(
                section,
                ContentVerificationFailure::NoExpectedStructure,
                format!("{} header found but no entry lines follow it", section.label()),
            );
        }

        if evidence.headers == 0 && evidence.entries < MIN_ENTRY_LINES {
            return self.fail(
                section,
                ContentVerificationFailure::AmbiguousPatterns,
                format!(
                    "{} entry-like line(s) without a header, need at least {}",
                    evidence.entries, MIN_ENTRY_LINES
                ),
            );
        }

        self.verified(section, evidence, negative)
    }

    fn verified(&self, section: SectionType, evidence: Evidence, negative: bool) -> VerificationResult {
        let confidence = evidence_confidence(evidence.headers, evidence.entries, negative);
        let explanation = format!(
            "{} verified: {} header(s), {} entry line(s){}",
            section.label(),
            evidence.headers,
            evidence.entries,
            if negative {
                ", discounted for body-like lines"
            } else {
                ""
            }
        );
        debug!(section = %section, confidence, "content verified");
        VerificationResult::Verified {
            confidence,
            matched_patterns: evidence.matched.into_iter().collect(),
            explanation,
        }
    }

    fn fail(
        &self,
        section: SectionType,
        reason: ContentVerificationFailure,
        explanation: String,
    ) -> VerificationResult {
        debug!(section = %section, reason = %reason, "content verification failed: {}", explanation);
        VerificationResult::Failed {
            reason,
            explanation,
        }
    }
}
