// Line/word utilities the defense chain relies on.
//
// The chain never tokenizes text itself; it goes through `TextOps` so a host
// pipeline can supply its own line model. `LineTextOps` is the default.

use sha2::{Digest, Sha256};

pub trait TextOps {
    /// Remove the inclusive line range `start_line..=end_line`
    fn remove_lines(&self, text: &str, start_line: usize, end_line: usize) -> String;

    /// Remove several inclusive line ranges in one pass
    fn remove_line_ranges(&self, text: &str, ranges: &[(usize, usize)]) -> String;

    fn count_lines(&self, text: &str) -> usize;

    fn count_words(&self, text: &str) -> usize;
}

/// Default line model: lines as produced by `str::lines`, words as
/// whitespace-separated tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineTextOps;

impl LineTextOps {
    pub fn new() -> Self {
        Self
    }
}

impl TextOps for LineTextOps {
    fn remove_lines(&self, text: &str, start_line: usize, end_line: usize) -> String {
        self.remove_line_ranges(text, &[(start_line, end_line)])
    }

    fn remove_line_ranges(&self, text: &str, ranges: &[(usize, usize)]) -> String {
        let kept: Vec<&str> = text
            .lines()
            .enumerate()
            .filter(|(i, _)| !ranges.iter().any(|(start, end)| i >= start && i <= end))
            .map(|(_, line)| line)
            .collect();

        let mut result = kept.join("\n");
        if text.ends_with('\n') && !result.is_empty() {
            result.push('\n');
        }
        result
    }

    fn count_lines(&self, text: &str) -> usize {
        text.lines().count()
    }

    fn count_words(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Split text into lines using the same model as `LineTextOps`
pub fn document_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

/// SHA-256 fingerprint of a text snapshot.
/// Line numbers are only meaningful against the snapshot they were computed on.
pub fn snapshot_fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
