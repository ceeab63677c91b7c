use serde::Serialize;

use crate::text_ops::document_lines;
use crate::types::{BoundaryAnchor, SectionType};

// Document samples handed to the boundary proposer.
// Every line carries its absolute number so a proposal can be mapped straight
// back onto the full text.

pub const DEFAULT_MAX_SAMPLE_LINES: usize = 1500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSample {
    pub text: String,
    pub first_line: usize,
    pub last_line: usize,
}

impl DocumentSample {
    pub fn line_count(&self) -> usize {
        if self.text.is_empty() {
            0
        } else {
            self.last_line - self.first_line + 1
        }
    }
}

/// Head of the document for start-of-book sections, tail for end-of-book
/// sections, everything for footnotes. Capped at `max_lines`.
pub fn build_sample(section: SectionType, text: &str, max_lines: usize) -> DocumentSample {
    let lines = document_lines(text);
    let n = lines.len();
    if n == 0 || max_lines == 0 {
        return DocumentSample {
            text: String::new(),
            first_line: 0,
            last_line: 0,
        };
    }

    let constraints = section.constraints();
    let (first, last) = match (section, section.anchor()) {
        (SectionType::FootnotesEndnotes | SectionType::Other, _) => (0, n - 1),
        (_, BoundaryAnchor::DocumentEnd) => {
            let from = constraints.min_start_percent.unwrap_or(0.0);
            (((n as f64 * from).floor() as usize).min(n - 1), n - 1)
        }
        _ => {
            let to = constraints.max_end_percent.unwrap_or(1.0);
            (0, ((n as f64 * to).ceil() as usize).clamp(1, n) - 1)
        }
    };

    // Tail samples keep their last lines, head samples their first
    let (first, last) = if last - first + 1 > max_lines {
        match section.anchor() {
            BoundaryAnchor::DocumentEnd => (last + 1 - max_lines, last),
            _ => (first, first + max_lines - 1),
        }
    } else {
        (first, last)
    };

    let text = (first..=last)
        .map(|i| format!("[{}] {}", i, lines[i]))
        .collect::<Vec<_>>()
        .join("\n");

    DocumentSample {
        text,
        first_line: first,
        last_line: last,
    }
}
