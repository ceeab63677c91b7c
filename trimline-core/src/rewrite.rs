use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::text_ops::TextOps;

// Word-count-preserving rewrites (paragraph reflow and splitting).
// An AI rewrite is only kept when it has exactly the same number of words as
// its input; anything else reruns with a deterministic heuristic.

pub const AI_REWRITE_CONFIDENCE: f64 = 0.90;
pub const FALLBACK_REWRITE_CONFIDENCE: f64 = 0.75;

const HEADING_MAX_CHARS: usize = 60;
const ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "st.", "prof.", "vs.", "e.g.", "i.e.", "etc.", "no.", "vol.",
    "ch.", "p.", "pp.", "cf.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RewriteKind {
    ParagraphReflow,
    ParagraphSplit,
}

impl RewriteKind {
    pub fn step_name(&self) -> &'static str {
        match self {
            RewriteKind::ParagraphReflow => "ParagraphReflow",
            RewriteKind::ParagraphSplit => "ParagraphSplit",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RewriteError {
    #[error("text rewriter unavailable: {0}")]
    Unavailable(String),
    #[error("text rewriter failed: {0}")]
    Failed(String),
}

pub trait TextRewriter: Send + Sync {
    fn rewrite(&self, text: &str, kind: RewriteKind) -> Result<String, RewriteError>;

    fn name(&self) -> &str;
}

/// Rewriter that always declines, so every rewrite uses the heuristic
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRewriter;

impl TextRewriter for NoRewriter {
    fn rewrite(&self, _text: &str, _kind: RewriteKind) -> Result<String, RewriteError> {
        Err(RewriteError::Unavailable("no rewriter configured".to_string()))
    }

    fn name(&self) -> &str {
        "none"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RewriteOutcome {
    pub text: String,
    pub confidence: f64,
    pub fallback: bool,
}

pub fn run_rewrite_step(
    rewriter: &dyn TextRewriter,
    text_ops: &dyn TextOps,
    text: &str,
    kind: RewriteKind,
    max_sentences: usize,
) -> RewriteOutcome {
    let expected = text_ops.count_words(text);

    match rewriter.rewrite(text, kind) {
        Ok(rewritten) => {
            let actual = text_ops.count_words(&rewritten);
            if actual == expected {
                debug!(step = kind.step_name(), words = actual, "AI rewrite accepted");
                return RewriteOutcome {
                    text: rewritten,
                    confidence: AI_REWRITE_CONFIDENCE,
                    fallback: false,
                };
            }
            warn!(
                step = kind.step_name(),
                expected,
                actual,
                "AI rewrite changed the word count, using heuristic"
            );
        }
        Err(e) => {
            debug!(step = kind.step_name(), rewriter = rewriter.name(), "{}", e);
        }
    }

    let text = match kind {
        RewriteKind::ParagraphReflow => reflow_paragraphs(text),
        RewriteKind::ParagraphSplit => split_paragraphs(text, max_sentences),
    };
    RewriteOutcome {
        text,
        confidence: FALLBACK_REWRITE_CONFIDENCE,
        fallback: true,
    }
}

/// Short lines without lowercase letters, or markdown headings
fn is_heading(line: &str) -> bool {
    if line.starts_with('#') {
        return true;
    }
    line.chars().count() <= HEADING_MAX_CHARS
        && line.chars().any(|c| c.is_alphabetic())
        && !line.chars().any(|c| c.is_lowercase())
}

fn keep_trailing_newline(original: &str, mut result: String) -> String {
    if original.ends_with('\n') && !result.is_empty() {
        result.push('\n');
    }
    result
}

/// Join soft-wrapped lines inside each paragraph with a single space.
/// Blank lines and headings stay where they are.
pub fn reflow_paragraphs(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    fn flush(paragraph: &mut Vec<&str>, out: &mut Vec<String>) {
        if !paragraph.is_empty() {
            out.push(paragraph.join(" "));
            paragraph.clear();
        }
    }

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush(&mut paragraph, &mut out);
            out.push(String::new());
        } else if is_heading(trimmed) {
            flush(&mut paragraph, &mut out);
            out.push(trimmed.to_string());
        } else {
            paragraph.push(trimmed);
        }
    }
    flush(&mut paragraph, &mut out);

    keep_trailing_newline(text, out.join("\n"))
}

fn ends_sentence(token: &str) -> bool {
    let core = token.trim_end_matches(|c| matches!(c, '"' | '\'' | '”' | '’' | ')'));
    let terminal = core.ends_with('.') || core.ends_with('!') || core.ends_with('?');
    terminal && !ABBREVIATIONS.contains(&core.to_lowercase().as_str())
}

fn starts_sentence(token: &str) -> bool {
    token
        .chars()
        .find(|c| !matches!(c, '"' | '\'' | '“' | '‘' | '('))
        .map(|c| c.is_uppercase() || c.is_ascii_digit())
        .unwrap_or(false)
}

/// Sentences as whitespace-separated tokens; joining them back keeps every word
fn sentences(paragraph: &str) -> Vec<Vec<&str>> {
    let tokens: Vec<&str> = paragraph.split_whitespace().collect();
    let mut result = Vec::new();
    let mut current = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        current.push(*token);
        let next_starts = tokens.get(i + 1).map_or(false, |next| starts_sentence(next));
        if ends_sentence(token) && next_starts {
            result.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}

/// Break paragraphs longer than `max_sentences` into blank-line separated chunks
pub fn split_paragraphs(text: &str, max_sentences: usize) -> String {
    if max_sentences == 0 {
        return text.to_string();
    }
    let mut out: Vec<String> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_heading(trimmed) {
            out.push(line.to_string());
            continue;
        }
        let parts = sentences(trimmed);
        if parts.len() <= max_sentences {
            out.push(line.to_string());
            continue;
        }
        let chunks: Vec<String> = parts
            .chunks(max_sentences)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|sentence| sentence.join(" "))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        out.push(chunks.join("\n\n"));
    }
    keep_trailing_newline(text, out.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_ops::LineTextOps;

    struct FixedRewriter(String);

    impl TextRewriter for FixedRewriter {
        fn rewrite(&self, _text: &str, _kind: RewriteKind) -> Result<String, RewriteError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn reflow_joins_soft_wrapped_lines() {
        let text = "CHAPTER ONE\nIt was a dark\nand stormy night.\n\nThe end\ncame soon.\n";
        assert_eq!(
            reflow_paragraphs(text),
            "CHAPTER ONE\nIt was a dark and stormy night.\n\nThe end came soon.\n"
        );
    }

    #[test]
    fn split_breaks_long_paragraphs() {
        let text = "One. Two. Three. Four. Five.";
        assert_eq!(split_paragraphs(text, 2), "One. Two.\n\nThree. Four.\n\nFive.");
        assert_eq!(split_paragraphs(text, 5), text);
    }

    #[test]
    fn split_respects_abbreviations() {
        let text = "Dr. Smith arrived. He left.";
        assert_eq!(sentences(text).len(), 2);
    }

    #[test]
    fn heuristics_preserve_word_count() {
        let ops = LineTextOps::new();
        let text = "A line that\nwraps here. And a second sentence!\nAnother? Yes.\n\n# Heading\nMore text.";
        assert_eq!(ops.count_words(&reflow_paragraphs(text)), ops.count_words(text));
        assert_eq!(ops.count_words(&split_paragraphs(text, 1)), ops.count_words(text));
    }

    #[test]
    fn ai_rewrite_kept_when_word_count_matches() {
        let rewriter = FixedRewriter("alpha beta gamma".to_string());
        let outcome = run_rewrite_step(
            &rewriter,
            &LineTextOps::new(),
            "alpha\nbeta gamma",
            RewriteKind::ParagraphReflow,
            6,
        );
        assert_eq!(outcome.text, "alpha beta gamma");
        assert!(!outcome.fallback);
        assert_eq!(outcome.confidence, AI_REWRITE_CONFIDENCE);
    }

    #[test]
    fn ai_rewrite_that_drops_words_falls_back() {
        let rewriter = FixedRewriter("alpha gamma".to_string());
        let outcome = run_rewrite_step(
            &rewriter,
            &LineTextOps::new(),
            "alpha\nbeta gamma",
            RewriteKind::ParagraphReflow,
            6,
        );
        assert_eq!(outcome.text, "alpha beta gamma");
        assert!(outcome.fallback);
        assert_eq!(outcome.confidence, FALLBACK_REWRITE_CONFIDENCE);
    }

    #[test]
    fn unavailable_rewriter_falls_back() {
        let outcome = run_rewrite_step(
            &NoRewriter,
            &LineTextOps::new(),
            "One. Two. Three.",
            RewriteKind::ParagraphSplit,
            1,
        );
        assert_eq!(outcome.text, "One.\n\nTwo.\n\nThree.");
        assert!(outcome.fallback);
    }
}
