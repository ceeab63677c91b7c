// Per-section safety envelopes.
//
// These are empirically tuned safety margins, not derived values. They are
// literal constants on purpose and are never loaded from config or mutated at
// runtime. All percentages are fractions of the total document line count.

use serde::Serialize;

use crate::types::SectionType;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValidationConstraints {
    /// Earliest legal start position (start line / line count)
    pub min_start_percent: Option<f64>,
    /// Latest legal end position (end line / line count)
    pub max_end_percent: Option<f64>,
    /// Largest share of the document a single removal may delete
    pub max_removal_percent: f64,
    pub min_confidence: f64,
    /// Smallest plausible section size in lines
    pub min_lines: usize,
}

pub const FRONT_MATTER: ValidationConstraints = ValidationConstraints {
    min_start_percent: None,
    max_end_percent: Some(0.40),
    max_removal_percent: 0.40,
    min_confidence: 0.60,
    min_lines: 3,
};

pub const TABLE_OF_CONTENTS: ValidationConstraints = ValidationConstraints {
    min_start_percent: None,
    max_end_percent: Some(0.35),
    max_removal_percent: 0.20,
    min_confidence: 0.60,
    min_lines: 5,
};

pub const AUXILIARY_LISTS: ValidationConstraints = ValidationConstraints {
    min_start_percent: None,
    max_end_percent: Some(0.40),
    max_removal_percent: 0.15,
    min_confidence: 0.65,
    min_lines: 3,
};

pub const INDEX: ValidationConstraints = ValidationConstraints {
    min_start_percent: Some(0.60),
    max_end_percent: None,
    max_removal_percent: 0.25,
    min_confidence: 0.65,
    min_lines: 10,
};

pub const BACK_MATTER: ValidationConstraints = ValidationConstraints {
    min_start_percent: Some(0.50),
    max_end_percent: None,
    max_removal_percent: 0.45,
    min_confidence: 0.70,
    min_lines: 5,
};

pub const FOOTNOTES_ENDNOTES: ValidationConstraints = ValidationConstraints {
    min_start_percent: None,
    max_end_percent: None,
    max_removal_percent: 0.12,
    min_confidence: 0.70,
    min_lines: 4,
};

/// `other` has no removal policy: nothing may be removed under it
pub const OTHER: ValidationConstraints = ValidationConstraints {
    min_start_percent: None,
    max_end_percent: None,
    max_removal_percent: 0.0,
    min_confidence: 1.0,
    min_lines: usize::MAX,
};

/// Footnote blocks starting before this position get the early ceiling
pub const FOOTNOTE_EARLY_REGION_END: f64 = 0.50;

/// Early footnote blocks should only ever be small per-chapter notes
pub const FOOTNOTE_EARLY_MAX_REMOVAL: f64 = 0.05;

impl SectionType {
    pub const fn constraints(self) -> ValidationConstraints {
        match self {
            SectionType::FrontMatter => FRONT_MATTER,
            SectionType::TableOfContents => TABLE_OF_CONTENTS,
            SectionType::AuxiliaryLists => AUXILIARY_LISTS,
            SectionType::Index => INDEX,
            SectionType::BackMatter => BACK_MATTER,
            SectionType::FootnotesEndnotes => FOOTNOTES_ENDNOTES,
            SectionType::Other => OTHER,
        }
    }
}

impl ValidationConstraints {
    /// Removal ceiling for a section starting at `start_fraction` of the document.
    /// Only footnotes/endnotes have a position-dependent ceiling.
    pub fn max_removal_for(&self, section: SectionType, start_fraction: f64) -> f64 {
        if section == SectionType::FootnotesEndnotes && start_fraction < FOOTNOTE_EARLY_REGION_END {
            FOOTNOTE_EARLY_MAX_REMOVAL
        } else {
            self.max_removal_percent
        }
    }
}
