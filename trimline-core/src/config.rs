use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::sampling::DEFAULT_MAX_SAMPLE_LINES;

// Boundary constraint tables are deliberately not part of this config; they
// live as constants in `constraints.rs`.

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_max_sample_lines() -> usize {
    DEFAULT_MAX_SAMPLE_LINES
}

fn default_max_sentences() -> usize {
    6
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Which steps to run and in what order
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub proposal: ProposalConfig,
    #[serde(default)]
    pub rewrite: RewriteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Step name, e.g. "BackMatter" or "ParagraphReflow"
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl StepConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
        }
    }
}

/// Every removable section in pipeline order, then the two rewrites
pub const DEFAULT_STEPS: [&str; 8] = [
    "FrontMatter",
    "TableOfContents",
    "AuxiliaryLists",
    "Index",
    "BackMatter",
    "FootnotesEndnotes",
    "ParagraphReflow",
    "ParagraphSplit",
];

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS.iter().map(|name| StepConfig::new(name)).collect(),
        }
    }
}

impl PipelineConfig {
    pub fn enabled_steps(&self) -> impl Iterator<Item = &str> {
        self.steps
            .iter()
            .filter(|step| step.enabled)
            .map(|step| step.name.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalConfig {
    /// Ask the proposer at all; when off every section goes straight to heuristics
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Upper bound on lines sent to the proposer per section
    #[serde(default = "default_max_sample_lines")]
    pub max_sample_lines: usize,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_sample_lines: DEFAULT_MAX_SAMPLE_LINES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Paragraphs with more sentences than this get split
    #[serde(default = "default_max_sentences")]
    pub max_sentences_per_paragraph: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            max_sentences_per_paragraph: default_max_sentences(),
        }
    }
}

impl CleaningConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CleaningConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!(path = p, error = %e, "failed to load config, using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
