use regex::Regex;
use std::ops::Range;

use crate::types::SectionType;

// ============================================================================
// PATTERN TABLES - literal (name, regex, weight) data per section type
// ============================================================================
//
// Header patterns are matched against `header_text(line)` (markdown markers and
// trailing colons stripped). Entry patterns are matched against the trimmed line.
// Weights only matter for header tables; entry tables use 1.0 throughout.

#[derive(Debug, Clone, Copy)]
pub struct PatternSpec {
    pub name: &'static str,
    pub pattern: &'static str,
    pub weight: f64,
}

const fn spec(name: &'static str, pattern: &'static str, weight: f64) -> PatternSpec {
    PatternSpec {
        name,
        pattern,
        weight,
    }
}

pub const BACK_MATTER_HEADERS: &[PatternSpec] = &[
    spec("notes", r"(?i)^notes$", 0.70),
    spec(
        "notes-to-text",
        r"(?i)^notes\s+(?:to|on)\s+(?:the\s+)?(?:chapters|text|sources)$",
        0.80,
    ),
    spec(
        "appendix",
        r"(?i)^appendi(?:x|ces)(?:\s+[a-z0-9]{1,4})?(?:[\s:.\-–—].{0,60})?$",
        0.80,
    ),
    spec("glossary", r"(?i)^glossary(?:\s+of\s+terms)?$", 0.85),
    spec("bibliography", r"(?i)^(?:select(?:ed)?\s+)?bibliography$", 0.90),
    spec("references", r"(?i)^references$", 0.80),
    spec("works-cited", r"(?i)^works\s+cited$", 0.90),
    spec(
        "sources",
        r"(?i)^(?:sources|notes\s+and\s+sources|a\s+note\s+on\s+(?:the\s+)?sources)$",
        0.75,
    ),
    spec("further-reading", r"(?i)^(?:further|suggested)\s+reading$", 0.85),
    spec("acknowledgments", r"(?i)^acknowledge?ments$", 0.70),
    spec("about-the-author", r"(?i)^about\s+the\s+authors?$", 0.85),
    spec("colophon", r"(?i)^colophon$", 0.85),
    spec(
        "localized-back-matter",
        r"(?i)^(?:anhang|anmerkungen|literaturverzeichnis|bibliographie|bibliografía|bibliografia|glosario|glossaire|annexes?|apéndices?|notas)$",
        0.80,
    ),
];

pub const BACK_MATTER_ENTRIES: &[PatternSpec] = &[
    spec("numbered-note", r"^\d{1,3}[.)]\s+\S", 1.0),
    spec("bracketed-note", r"^\[\d{1,3}\]\s*\S", 1.0),
    spec(
        "citation",
        r"^\p{Lu}[\p{L}'’\-]+,\s+\p{Lu}.*\b(?:1[5-9]|20)\d{2}\b",
        1.0,
    ),
    spec("ibid", r"(?i)\b(?:ibid|op\.\s*cit|loc\.\s*cit)\b", 1.0),
    spec("page-cite", r"\bpp?\.\s*\d+", 1.0),
];

pub const INDEX_HEADERS: &[PatternSpec] = &[
    spec("index", r"(?i)^index$", 0.85),
    spec(
        "qualified-index",
        r"(?i)^(?:(?:general|subject|name|author)\s+index|index\s+of\s+\w+(?:\s+\w+)?)$",
        0.85,
    ),
    spec(
        "localized-index",
        r"(?i)^(?:register|sachregister|personenregister|índice\s+analítico|index\s+général)$",
        0.80,
    ),
];

pub const INDEX_ENTRIES: &[PatternSpec] = &[
    spec(
        "term-pages",
        r#"^[\p{L}'"(][^\d]{0,80}?,\s*\d{1,4}(?:\s*[-–]\s*\d{1,4})?(?:\s*,\s*\d{1,4}(?:\s*[-–]\s*\d{1,4})?)*$"#,
        1.0,
    ),
    spec(
        "see-also",
        r"(?i)^\p{L}[^\d]{0,80}?[,.]\s*see(?:\s+also)?\s+\S.{0,60}$",
        1.0,
    ),
];

/// Single-letter alphabet dividers inside an index ("A", "B", ...)
pub const INDEX_DIVIDER: &str = r"^\p{Lu}$";

pub const TOC_HEADERS: &[PatternSpec] = &[
    spec("contents", r"(?i)^(?:table\s+of\s+)?contents$", 0.90),
    spec(
        "localized-contents",
        r"(?i)^(?:inhalt|inhaltsverzeichnis|sommaire|table\s+des\s+matières|contenido|índice\s+general)$",
        0.85,
    ),
];

pub const TOC_ENTRIES: &[PatternSpec] = &[
    spec(
        "dotted-leader",
        r"^\S.*?(?:(?:\.\s?){3,}|…+)\s*(?:\d{1,4}|[ivxlcIVXLC]{1,6})$",
        1.0,
    ),
    spec(
        "wide-gap",
        r"^\S.*?\S(?:\s{3,}|\t+)(?:\d{1,4}|[ivxlcIVXLC]{1,6})$",
        1.0,
    ),
    spec(
        "chapter-page",
        r"(?i)^(?:chapter|part|book)\s+\S+.*\s\d{1,4}$",
        1.0,
    ),
];

pub const AUXILIARY_LIST_HEADERS: &[PatternSpec] = &[
    spec(
        "list-of",
        r"(?i)^list\s+of\s+(?:figures|tables|illustrations|maps|plates|charts|diagrams|abbreviations|exhibits)(?:\s+and\s+\w+)?$",
        0.90,
    ),
    spec("illustrations", r"(?i)^(?:illustrations|figures|maps|plates)$", 0.70),
    spec("abbreviations", r"(?i)^abbreviations$", 0.70),
    spec(
        "localized-lists",
        r"(?i)^(?:abbildungsverzeichnis|tabellenverzeichnis|abkürzungsverzeichnis|liste\s+des\s+(?:figures|tableaux|illustrations)|índice\s+de\s+(?:figuras|tablas))$",
        0.85,
    ),
];

pub const AUXILIARY_LIST_ENTRIES: &[PatternSpec] = &[
    spec(
        "figure-entry",
        r"(?i)^(?:figure|fig\.|table|plate|map|illustration|chart|exhibit)\s+\d+(?:[.\-–]\d+)*\b",
        1.0,
    ),
    spec(
        "abbreviation-entry",
        r"^\p{Lu}[\p{Lu}0-9&.]{1,9}(?:\s{2,}|\t|\s+[-–—=:]\s+)\S",
        1.0,
    ),
];

pub const FOOTNOTE_HEADERS: &[PatternSpec] = &[
    spec("notes", r"(?i)^notes$", 0.75),
    spec("endnotes", r"(?i)^(?:end\s*notes|footnotes)$", 0.90),
    spec(
        "chapter-notes",
        r"(?i)^notes\s+(?:to|for)\s+(?:chapter|part)\s+\S+$",
        0.90,
    ),
    spec(
        "localized-notes",
        r"(?i)^(?:anmerkungen|fußnoten|endnoten|notas|notes\s+de\s+fin)$",
        0.80,
    ),
];

pub const FOOTNOTE_ENTRIES: &[PatternSpec] = &[
    spec("numbered-note", r#"^\d{1,3}[.)]?\s+[\p{Lu}"“‘'(]"#, 1.0),
    spec("bracketed-note", r"^\[\d{1,3}\]", 1.0),
    spec("symbol-note", r"^[*†‡§]{1,3}\s*\S", 1.0),
    spec("ibid", r"(?i)\b(?:ibid|op\.\s*cit|loc\.\s*cit)\b", 1.0),
    spec("page-cite", r"\bpp?\.\s*\d+", 1.0),
];

/// Positive evidence for front matter: copyright pages, dedications, prefaces
pub const FRONT_MATTER_MARKERS: &[PatternSpec] = &[
    spec("copyright", r"(?i)(?:©|\(c\)\s*\d{4}|\bcopyright\b)", 1.0),
    spec("rights-reserved", r"(?i)all\s+rights\s+reserved", 1.0),
    spec("isbn", r"(?i)\bisbn(?:-1[03])?[:\s]", 1.0),
    spec(
        "cataloging",
        r"(?i)library\s+of\s+congress|cataloging[- ]in[- ]publication|british\s+library",
        1.0,
    ),
    spec(
        "publication",
        r"(?i)^(?:first\s+(?:published|edition)|published\s+by|printed\s+in|\w+\s+edition)\b",
        1.0,
    ),
    spec(
        "dedication",
        r"(?i)^(?:dedication|for\s+my\s+\w+|to\s+my\s+\w+|in\s+memory\s+of)\b",
        1.0,
    ),
    spec(
        "front-heading",
        r"(?i)^(?:preface|foreword|epigraph|title\s+page|half\s+title|also\s+by\s+.+|praise\s+for\s+.+|acknowledge?ments|(?:table\s+of\s+)?contents)$",
        1.0,
    ),
];

/// Where the body of a book starts; used to close the front matter region
pub const BODY_START_MARKERS: &[PatternSpec] = &[
    spec(
        "chapter-one",
        r"(?i)^(?:chapter|ch\.)\s+(?:1|one|i)\b(?:[\s:.\-–—].{0,80})?$",
        0.85,
    ),
    spec(
        "part-one",
        r"(?i)^part\s+(?:1|one|i)\b(?:[\s:.\-–—].{0,80})?$",
        0.80,
    ),
    spec(
        "book-one",
        r"(?i)^book\s+(?:1|one|i)\b(?:[\s:.\-–—].{0,80})?$",
        0.80,
    ),
    spec("prologue", r"(?i)^prologue(?:[\s:.\-–—].{0,80})?$", 0.75),
    spec("introduction", r"(?i)^introduction$", 0.70),
];

/// Negative evidence: narrative chapter headings
pub const CHAPTER_HEADINGS: &[PatternSpec] = &[
    spec(
        "chapter-heading",
        r"(?i)^(?:chapter|ch\.)\s+(?:\d{1,3}|[ivxlc]{1,7}|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|twenty)\b(?:[\s:.\-–—].{0,80})?$",
        1.0,
    ),
    spec(
        "part-heading",
        r"(?i)^(?:part|book)\s+(?:\d{1,2}|[ivx]{1,5}|one|two|three|four|five|six|seven|eight|nine|ten)\b(?:[\s:.\-–—].{0,80})?$",
        1.0,
    ),
];

/// Lines longer than this (in chars) may count as narrative prose
pub const NARRATIVE_MIN_CHARS: usize = 100;
const NARRATIVE_MIN_WORDS: usize = 15;

// ============================================================================
// COMPILED TABLES
// ============================================================================

#[derive(Debug, Clone)]
pub struct WeightedPattern {
    pub name: &'static str,
    pub regex: Regex,
    pub weight: f64,
}

/// A hit from scanning a window of lines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternHit {
    pub line: usize,
    pub name: &'static str,
    pub weight: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    patterns: Vec<WeightedPattern>,
}

impl PatternTable {
    pub fn compile(specs: &[PatternSpec]) -> Result<Self, regex::Error> {
        let mut patterns = Vec::with_capacity(specs.len());
        for spec in specs {
            patterns.push(WeightedPattern {
                name: spec.name,
                regex: Regex::new(spec.pattern)?,
                weight: spec.weight,
            });
        }
        Ok(Self { patterns })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.regex.is_match(text))
    }

    /// Highest-weight matching pattern; the earlier entry wins ties
    pub fn best_match(&self, text: &str) -> Option<&WeightedPattern> {
        self.patterns
            .iter()
            .filter(|p| p.regex.is_match(text))
            .fold(None, |best: Option<&WeightedPattern>, p| match best {
                Some(b) if b.weight >= p.weight => Some(b),
                _ => Some(p),
            })
    }

    pub fn matching_names<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'static str> + 'a {
        self.patterns
            .iter()
            .filter(move |p| p.regex.is_match(text))
            .map(|p| p.name)
    }

    /// Scan a window of lines and report the best hit on every matching line
    pub fn scan(
        &self,
        lines: &[&str],
        window: Range<usize>,
        normalize: fn(&str) -> &str,
    ) -> Vec<PatternHit> {
        let end = window.end.min(lines.len());
        let start = window.start.min(end);
        (start..end)
            .filter_map(|i| {
                self.best_match(normalize(lines[i])).map(|p| PatternHit {
                    line: i,
                    name: p.name,
                    weight: p.weight,
                })
            })
            .collect()
    }
}

/// Header form of a line: markdown markers, emphasis and trailing colons removed
pub fn header_text(line: &str) -> &str {
    line.trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches(|c| c == '*' || c == '_')
        .trim()
        .trim_end_matches(|c| c == ':' || c == '.')
        .trim()
}

/// Entry form of a line: just trimmed
pub fn entry_text(line: &str) -> &str {
    line.trim()
}

/// Per-section header and entry tables
#[derive(Debug, Clone, Default)]
pub struct SectionPatterns {
    pub headers: PatternTable,
    pub entries: PatternTable,
}

impl SectionPatterns {
    fn compile(headers: &[PatternSpec], entries: &[PatternSpec]) -> Result<Self, regex::Error> {
        Ok(Self {
            headers: PatternTable::compile(headers)?,
            entries: PatternTable::compile(entries)?,
        })
    }
}

/// Every table compiled once and shared by the verifier and the detector
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    front_matter: SectionPatterns,
    table_of_contents: SectionPatterns,
    auxiliary_lists: SectionPatterns,
    index: SectionPatterns,
    back_matter: SectionPatterns,
    footnotes: SectionPatterns,
    other: SectionPatterns,
    body_start: PatternTable,
    chapter_headings: PatternTable,
    index_divider: Regex,
}

impl PatternLibrary {
    pub fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            front_matter: SectionPatterns::compile(FRONT_MATTER_MARKERS, &[])?,
            table_of_contents: SectionPatterns::compile(TOC_HEADERS, TOC_ENTRIES)?,
            auxiliary_lists: SectionPatterns::compile(
                AUXILIARY_LIST_HEADERS,
                AUXILIARY_LIST_ENTRIES,
            )?,
            index: SectionPatterns::compile(INDEX_HEADERS, INDEX_ENTRIES)?,
            back_matter: SectionPatterns::compile(BACK_MATTER_HEADERS, BACK_MATTER_ENTRIES)?,
            footnotes: SectionPatterns::compile(FOOTNOTE_HEADERS, FOOTNOTE_ENTRIES)?,
            other: SectionPatterns::default(),
            body_start: PatternTable::compile(BODY_START_MARKERS)?,
            chapter_headings: PatternTable::compile(CHAPTER_HEADINGS)?,
            index_divider: Regex::new(INDEX_DIVIDER)?,
        })
    }

    pub fn section(&self, section: SectionType) -> &SectionPatterns {
        match section {
            SectionType::FrontMatter => &self.front_matter,
            SectionType::TableOfContents => &self.table_of_contents,
            SectionType::AuxiliaryLists => &self.auxiliary_lists,
            SectionType::Index => &self.index,
            SectionType::BackMatter => &self.back_matter,
            SectionType::FootnotesEndnotes => &self.footnotes,
            SectionType::Other => &self.other,
        }
    }

    pub fn header(&self, section: SectionType, line: &str) -> Option<&WeightedPattern> {
        self.section(section).headers.best_match(header_text(line))
    }

    pub fn is_entry(&self, section: SectionType, line: &str) -> bool {
        self.section(section).entries.is_match(entry_text(line))
    }

    pub fn is_index_divider(&self, line: &str) -> bool {
        self.index_divider.is_match(entry_text(line))
    }

    pub fn body_start(&self, line: &str) -> Option<&WeightedPattern> {
        if self.is_toc_entry(line) {
            return None;
        }
        self.body_start.best_match(header_text(line))
    }

    /// Chapter/part heading that is not itself a contents entry
    pub fn is_chapter_heading(&self, line: &str) -> bool {
        self.chapter_headings.is_match(header_text(line)) && !self.is_toc_entry(line)
    }

    pub fn is_toc_entry(&self, line: &str) -> bool {
        self.table_of_contents.entries.is_match(entry_text(line))
    }

    /// Long running text with no list punctuation
    pub fn is_narrative_prose(&self, line: &str) -> bool {
        let text = entry_text(line);
        if text.chars().count() <= NARRATIVE_MIN_CHARS {
            return false;
        }
        let starts_like_list = text
            .chars()
            .next()
            .map(|c| c.is_ascii_digit() || "[(*•†‡§-–—".contains(c))
            .unwrap_or(true);
        if starts_like_list || self.is_toc_entry(line) || self.is_entry(SectionType::Index, line) {
            return false;
        }
        text.split_whitespace().count() >= NARRATIVE_MIN_WORDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> PatternLibrary {
        PatternLibrary::compile().expect("pattern tables compile")
    }

    #[test]
    fn all_tables_compile() {
        library();
    }

    #[test]
    fn header_text_strips_markdown() {
        assert_eq!(header_text("# NOTES"), "NOTES");
        assert_eq!(header_text("  **Bibliography:**  "), "Bibliography");
        assert_eq!(header_text("## Index."), "Index");
    }

    #[test]
    fn back_matter_headers_match_case_insensitively() {
        let lib = library();
        assert_eq!(lib.header(SectionType::BackMatter, "# NOTES").unwrap().name, "notes");
        assert!(lib.header(SectionType::BackMatter, "Appendix B: Data Tables").is_some());
        assert!(lib.header(SectionType::BackMatter, "Literaturverzeichnis").is_some());
        assert!(lib
            .header(SectionType::BackMatter, "Notes on the war were kept daily")
            .is_none());
    }

    #[test]
    fn best_match_prefers_heavier_pattern() {
        let lib = library();
        let hit = lib.header(SectionType::BackMatter, "Selected Bibliography").unwrap();
        assert_eq!(hit.name, "bibliography");
        assert_eq!(hit.weight, 0.90);
    }

    #[test]
    fn index_entries_and_dividers() {
        let lib = library();
        assert!(lib.is_entry(SectionType::Index, "Aardvark, 12"));
        assert!(lib.is_entry(SectionType::Index, "Adams, John, 45, 67-69"));
        assert!(lib.is_entry(SectionType::Index, "  railways, 101–104, 230"));
        assert!(lib.is_entry(SectionType::Index, "Boston. See Massachusetts"));
        assert!(!lib.is_entry(SectionType::Index, "Smith, John. A History. London, 1999."));
        assert!(lib.is_index_divider("B"));
        assert!(!lib.is_index_divider("Be"));
    }

    #[test]
    fn toc_entries_cover_leaders_and_gaps() {
        let lib = library();
        assert!(lib.is_toc_entry("Chapter 1 The Beginning ........ 1"));
        assert!(lib.is_toc_entry("Preface . . . . . ix"));
        assert!(lib.is_toc_entry("The Long Winter      57"));
        assert!(!lib.is_toc_entry("It was a long winter for all of us."));
    }

    #[test]
    fn chapter_heading_excludes_contents_entries() {
        let lib = library();
        assert!(lib.is_chapter_heading("CHAPTER ONE"));
        assert!(lib.is_chapter_heading("## Chapter 12: The Return"));
        assert!(lib.is_chapter_heading("Part II"));
        assert!(!lib.is_chapter_heading("Chapter 12: The Return ........ 211"));
        assert!(!lib.is_chapter_heading("The chapter ended abruptly."));
    }

    #[test]
    fn body_start_ignores_contents_lines() {
        let lib = library();
        assert_eq!(lib.body_start("Chapter 1").unwrap().name, "chapter-one");
        assert!(lib.body_start("Chapter 1 Beginnings ...... 3").is_none());
        assert!(lib.body_start("Chapter 10").is_none());
    }

    #[test]
    fn narrative_prose_needs_length_and_words() {
        let lib = library();
        let prose = "She walked along the quiet river for most of the afternoon, thinking about the letter and what it would mean for all of them.";
        assert!(lib.is_narrative_prose(prose));
        assert!(!lib.is_narrative_prose("Short line of text."));
        let note = "12. Smith, A History of Rivers (London, 1999), p. 45, where the author discusses the long afternoon walks along the Thames.";
        assert!(!lib.is_narrative_prose(note));
    }

    #[test]
    fn scan_reports_best_hit_per_line() {
        let lib = library();
        let lines = vec!["body", "# NOTES", "1. A note", "BIBLIOGRAPHY"];
        let hits = lib
            .section(SectionType::BackMatter)
            .headers
            .scan(&lines, 0..lines.len(), header_text);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].line, 1);
        assert_eq!(hits[1].name, "bibliography");
    }
}
