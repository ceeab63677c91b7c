use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

use super::patterns::{header_text, PatternLibrary};
use super::position_validation::PositionValidator;
use crate::text_ops::document_lines;
use crate::types::*;

// HeuristicDetector - Phase C of the boundary defense.
// Finds section boundaries from the text alone, with no AI input. Every result
// is a pure function of the text; it prefers reporting nothing over guessing.

/// Candidates below this confidence are discarded
pub const ACCEPT_THRESHOLD: f64 = 0.60;

/// Lines after a header examined for supporting entries
pub const EVIDENCE_LOOKAHEAD: usize = 20;

const DENSITY_BOOST_FACTOR: f64 = 0.6;
const DENSITY_BOOST_CAP: f64 = 0.25;

/// Distrust for matches sitting right at the edge of the legal window
const EDGE_PENALTY: f64 = 0.05;
const EDGE_MARGIN: f64 = 0.02;

/// Headerless index: long run of `term, page` lines
pub const INDEX_MIN_RUN: usize = 30;
const INDEX_RUN_BASE: f64 = 0.55;
const INDEX_RUN_STEP: f64 = 0.005;
const INDEX_RUN_CEILING: f64 = 0.75;

/// Headerless contents: run of dotted-leader / wide-gap lines
pub const TOC_MIN_RUN: usize = 8;
const TOC_RUN_BASE: f64 = 0.60;
const TOC_RUN_STEP: f64 = 0.02;
const TOC_RUN_CEILING: f64 = 0.80;

const FRONT_MARKER_STEP: f64 = 0.06;
const FRONT_MARKER_CAP: f64 = 0.25;

/// End finder gives up after this many consecutive non-entry lines
pub const END_FINDER_MAX_MISSES: usize = 3;

/// A header with no entry lines behind it is never enough on its own
pub const MIN_SUPPORTING_ENTRIES: usize = 1;

/// Fractions of the document each section may be found in
pub fn scan_window(section: SectionType) -> (f64, f64) {
    match section {
        SectionType::FrontMatter => (0.0, 0.40),
        SectionType::TableOfContents => (0.0, 0.35),
        SectionType::AuxiliaryLists => (0.0, 0.40),
        SectionType::Index => (0.60, 1.0),
        SectionType::BackMatter => (0.50, 1.0),
        SectionType::FootnotesEndnotes => (0.0, 1.0),
        SectionType::Other => (0.0, 0.0),
    }
}

/// Line range for `scan_window`, start inclusive, end exclusive
pub fn window_lines(section: SectionType, line_count: usize) -> Range<usize> {
    let (from, to) = scan_window(section);
    let n = line_count as f64;
    let start = ((n * from).ceil() as usize).min(line_count);
    let end = ((n * to).floor() as usize).min(line_count);
    start..end.max(start)
}

pub struct HeuristicDetector {
    patterns: Arc<PatternLibrary>,
    validator: PositionValidator,
}

impl HeuristicDetector {
    pub fn new(patterns: Arc<PatternLibrary>) -> Self {
        Self {
            patterns,
            validator: PositionValidator::new(),
        }
    }

    /// Boundary line is the start line for every section except front matter,
    /// where it is the last line of the front matter.
    pub fn detect(&self, section: SectionType, text: &str) -> HeuristicDetectionResult {
        let lines = document_lines(text);
        self.detect_lines(section, &lines)
    }

    fn detect_lines(&self, section: SectionType, lines: &[&str]) -> HeuristicDetectionResult {
        if section == SectionType::Other {
            return not_found("other sections are never detected heuristically");
        }
        if lines.is_empty() {
            return not_found("document is empty");
        }

        let window = window_lines(section, lines.len());
        if window.is_empty() {
            return not_found(format!(
                "document too short for a {} scan window",
                section.label()
            ));
        }

        let result = match section {
            SectionType::FrontMatter => self.detect_front_matter(lines, window),
            _ => match self.detect_by_header(section, lines, window.clone()) {
                found @ HeuristicDetectionResult::Found { .. } => found,
                HeuristicDetectionResult::NotFound { explanation } => {
                    match self.detect_headerless(section, lines, window) {
                        Some(found) => found,
                        None => not_found(explanation),
                    }
                }
            },
        };

        debug!(section = %section, result = ?result, "heuristic detection");
        result
    }

    fn detect_by_header(
        &self,
        section: SectionType,
        lines: &[&str],
        window: Range<usize>,
    ) -> HeuristicDetectionResult {
        let tables = self.patterns.section(section);
        let hits = tables.headers.scan(lines, window.clone(), header_text);
        if hits.is_empty() {
            return not_found(format!(
                "no {} header between lines {} and {}",
                section.label(),
                window.start,
                window.end
            ));
        }

        let margin = edge_margin(lines.len());
        let mut best_rejected = 0.0_f64;
        let mut unsupported = 0;
        let mut swallowing = 0;
        for hit in &hits {
            let lookahead = (hit.line + 1)..(hit.line + 1 + EVIDENCE_LOOKAHEAD).min(lines.len());
            let examined = lookahead.len();
            let mut matched = BTreeSet::new();
            matched.insert(format!("header:{}", hit.name));

            let mut supporting = 0;
            for line in &lines[lookahead] {
                let mut is_entry = false;
                for name in tables.entries.matching_names(line.trim()) {
                    matched.insert(format!("entry:{}", name));
                    is_entry = true;
                }
                if section == SectionType::Index && self.patterns.is_index_divider(line) {
                    matched.insert("entry:divider".to_string());
                    is_entry = true;
                }
                if is_entry {
                    supporting += 1;
                }
            }
            if supporting < MIN_SUPPORTING_ENTRIES {
                unsupported += 1;
                continue;
            }

            let density = supporting as f64 / examined as f64;
            let mut confidence =
                (hit.weight + (density * DENSITY_BOOST_FACTOR).min(DENSITY_BOOST_CAP)).min(1.0);
            let at_edge = hit.line < window.start + margin || hit.line + margin >= window.end;
            if at_edge {
                confidence -= EDGE_PENALTY;
            }
            if confidence < ACCEPT_THRESHOLD {
                best_rejected = best_rejected.max(confidence);
                continue;
            }

            let (start, end) = self.candidate_range(section, lines, hit.line);
            if let Some(chapter) = self.chapter_heading_in(lines, start, end) {
                debug!(
                    section = %section,
                    header_line = hit.line,
                    chapter_line = chapter,
                    "header skipped, its range would swallow a chapter heading"
                );
                swallowing += 1;
                continue;
            }

            return HeuristicDetectionResult::Found {
                boundary_line: hit.line,
                confidence,
                matched_patterns: matched.into_iter().collect(),
                explanation: format!(
                    "{} header '{}' at line {} with {} supporting entries in the next {} lines{}",
                    section.label(),
                    hit.name,
                    hit.line,
                    supporting,
                    examined,
                    if at_edge { ", near window edge" } else { "" }
                ),
            };
        }

        not_found(format!(
            "{} {} header(s) found, none accepted: {} without supporting entries, {} would remove chapter headings, best remaining confidence {:.2} (threshold {:.2})",
            hits.len(),
            section.label(),
            unsupported,
            swallowing,
            best_rejected,
            ACCEPT_THRESHOLD
        ))
    }

    // Long runs of entry lines with no header at all
    fn detect_headerless(
        &self,
        section: SectionType,
        lines: &[&str],
        window: Range<usize>,
    ) -> Option<HeuristicDetectionResult> {
        let (min_run, base, step, ceiling) = match section {
            SectionType::Index => (INDEX_MIN_RUN, INDEX_RUN_BASE, INDEX_RUN_STEP, INDEX_RUN_CEILING),
            SectionType::TableOfContents => (TOC_MIN_RUN, TOC_RUN_BASE, TOC_RUN_STEP, TOC_RUN_CEILING),
            _ => return None,
        };

        let (run_start, run_len, names) = self.longest_entry_run(section, lines, window)?;
        if run_len < min_run {
            debug!(
                section = %section,
                run_len,
                min_run,
                "entry run too short for headerless detection"
            );
            return None;
        }

        let confidence = (base + step * run_len as f64).min(ceiling);
        Some(HeuristicDetectionResult::Found {
            boundary_line: run_start,
            confidence,
            matched_patterns: names.into_iter().map(|n| format!("entry:{}", n)).collect(),
            explanation: format!(
                "no {} header, but {} consecutive entry lines start at line {}",
                section.label(),
                run_len,
                run_start
            ),
        })
    }

    /// Earliest longest run of entry lines; blanks and dividers do not break a run
    fn longest_entry_run(
        &self,
        section: SectionType,
        lines: &[&str],
        window: Range<usize>,
    ) -> Option<(usize, usize, BTreeSet<&'static str>)> {
        let entries = &self.patterns.section(section).entries;
        let mut best: Option<(usize, usize, BTreeSet<&'static str>)> = None;
        let mut current: Option<(usize, usize, BTreeSet<&'static str>)> = None;

        for i in window {
            let line = lines[i].trim();
            let names: Vec<&'static str> = entries.matching_names(line).collect();
            if !names.is_empty() {
                let run = current.get_or_insert_with(|| (i, 0, BTreeSet::new()));
                run.1 += 1;
                run.2.extend(names);
                continue;
            }
            let neutral = line.is_empty()
                || (section == SectionType::Index && self.patterns.is_index_divider(line));
            if neutral {
                continue;
            }
            if let Some(run) = current.take() {
                if best.as_ref().map_or(true, |b| run.1 > b.1) {
                    best = Some(run);
                }
            }
        }
        if let Some(run) = current.take() {
            if best.as_ref().map_or(true, |b| run.1 > b.1) {
                best = Some(run);
            }
        }
        best
    }

    // Inverted anchor: find where the body starts and end the front matter
    // on the line before it.
    fn detect_front_matter(&self, lines: &[&str], window: Range<usize>) -> HeuristicDetectionResult {
        let Some((body_line, marker)) = window
            .clone()
            .find_map(|i| self.patterns.body_start(lines[i]).map(|p| (i, p)))
        else {
            return not_found(format!(
                "no chapter, part, prologue or introduction heading in the first {} lines",
                window.end
            ));
        };

        if body_line == 0 {
            return not_found("body starts on the first line, there is no front matter");
        }

        let mut matched = BTreeSet::new();
        matched.insert(format!("body:{}", marker.name));
        let front = &self.patterns.section(SectionType::FrontMatter).headers;
        let mut markers = 0;
        for line in &lines[..body_line] {
            if let Some(hit) = front.best_match(header_text(line)) {
                markers += 1;
                matched.insert(format!("marker:{}", hit.name));
            }
        }
        if markers == 0 {
            return not_found(format!(
                "'{}' heading at line {} but nothing before it looks like front matter",
                marker.name, body_line
            ));
        }

        let mut confidence =
            (marker.weight + (FRONT_MARKER_STEP * markers as f64).min(FRONT_MARKER_CAP)).min(1.0);
        let at_edge = body_line + edge_margin(lines.len()) >= window.end;
        if at_edge {
            confidence -= EDGE_PENALTY;
        }
        if confidence < ACCEPT_THRESHOLD {
            return not_found(format!(
                "front matter confidence {:.2} is below {:.2}",
                confidence, ACCEPT_THRESHOLD
            ));
        }

        HeuristicDetectionResult::Found {
            boundary_line: body_line - 1,
            confidence,
            matched_patterns: matched.into_iter().collect(),
            explanation: format!(
                "body starts at line {} ('{}'), {} front matter marker(s) before it",
                body_line, marker.name, markers
            ),
        }
    }

    /// Last line of a closed section starting at `start_line`.
    /// Extends through entries, blank lines and repeated headers of the same type.
    pub fn find_end_boundary(
        &self,
        section: SectionType,
        text: &str,
        start_line: usize,
    ) -> Option<usize> {
        let lines = document_lines(text);
        self.find_end_lines(section, &lines, start_line)
    }

    fn find_end_lines(&self, section: SectionType, lines: &[&str], start_line: usize) -> Option<usize> {
        if start_line >= lines.len() || section == SectionType::Other {
            return None;
        }
        let tables = self.patterns.section(section);
        let mut last = start_line;
        let mut misses = 0;

        for (i, line) in lines.iter().enumerate().skip(start_line + 1) {
            if line.trim().is_empty() {
                continue;
            }
            let belongs = tables.entries.is_match(line.trim())
                || tables.headers.is_match(header_text(line));
            if belongs {
                last = i;
                misses = 0;
            } else {
                misses += 1;
                if misses >= END_FINDER_MAX_MISSES {
                    break;
                }
            }
        }
        Some(last)
    }

    /// Detection resolved to a concrete range and held to the position/size
    /// envelope. Envelope violations come back as `NotFound`.
    pub fn detect_region(&self, section: SectionType, text: &str) -> RegionDetection {
        let lines = document_lines(text);
        let (boundary_line, confidence, matched_patterns, explanation) =
            match self.detect_lines(section, &lines) {
                HeuristicDetectionResult::Found {
                    boundary_line,
                    confidence,
                    matched_patterns,
                    explanation,
                } => (boundary_line, confidence, matched_patterns, explanation),
                HeuristicDetectionResult::NotFound { explanation } => {
                    return RegionDetection::NotFound { explanation }
                }
            };

        let (start_line, end_line) = self.candidate_range(section, &lines, boundary_line);
        if let Some(chapter) = self.chapter_heading_in(&lines, start_line, end_line) {
            return RegionDetection::NotFound {
                explanation: format!(
                    "heuristic range {}-{} contains the chapter heading at line {}",
                    start_line, end_line, chapter
                ),
            };
        }

        let boundary = BoundaryInfo::range(start_line, end_line, confidence);
        match self.validator.validate_envelope(&boundary, section, lines.len()) {
            ValidationResult::Valid => RegionDetection::Found(HeuristicRegion {
                start_line,
                end_line,
                confidence,
                matched_patterns,
                explanation,
            }),
            ValidationResult::Invalid {
                reason,
                explanation: why,
            } => RegionDetection::NotFound {
                explanation: format!(
                    "heuristic range {}-{} rejected ({}): {}",
                    start_line, end_line, reason, why
                ),
            },
            ValidationResult::NoBoundary => RegionDetection::NotFound {
                explanation: "heuristic produced no range".to_string(),
            },
        }
    }

    /// Inclusive range a boundary line resolves to for this section's anchor
    fn candidate_range(
        &self,
        section: SectionType,
        lines: &[&str],
        boundary_line: usize,
    ) -> (usize, usize) {
        let last = lines.len().saturating_sub(1);
        match section.anchor() {
            BoundaryAnchor::DocumentStart => (0, boundary_line),
            BoundaryAnchor::DocumentEnd => (boundary_line, last),
            BoundaryAnchor::ClosedRange => (
                boundary_line,
                self.find_end_lines(section, lines, boundary_line)
                    .unwrap_or(boundary_line),
            ),
        }
    }

    /// First chapter heading inside `start..=end`, if any
    fn chapter_heading_in(&self, lines: &[&str], start: usize, end: usize) -> Option<usize> {
        if start >= lines.len() {
            return None;
        }
        let end = end.min(lines.len() - 1);
        (start..=end).find(|&i| self.patterns.is_chapter_heading(lines[i]))
    }
}

fn edge_margin(line_count: usize) -> usize {
    ((line_count as f64 * EDGE_MARGIN).ceil() as usize).max(1)
}

fn not_found(explanation: impl Into<String>) -> HeuristicDetectionResult {
    HeuristicDetectionResult::NotFound {
        explanation: explanation.into(),
    }
}
