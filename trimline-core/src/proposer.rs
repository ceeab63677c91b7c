use std::collections::HashMap;
use thiserror::Error;

use crate::types::{BoundaryInfo, SectionType};

/// Why a proposal could not be obtained. The defense chain treats every
/// variant the same way: go straight to heuristic detection.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProposalError {
    #[error("boundary proposer unavailable: {0}")]
    Unavailable(String),
    #[error("malformed boundary proposal: {0}")]
    MalformedResponse(String),
}

/// Source of untrusted boundary proposals, usually an AI text model.
/// Timeouts and retries belong to the implementation, not the chain.
pub trait BoundaryProposer: Send + Sync {
    fn propose(&self, sample: &str, section: SectionType) -> Result<BoundaryInfo, ProposalError>;

    fn name(&self) -> &str;
}

/// Proposer that never has anything to say
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProposer;

impl BoundaryProposer for NoProposer {
    fn propose(&self, _sample: &str, _section: SectionType) -> Result<BoundaryInfo, ProposalError> {
        Err(ProposalError::Unavailable("no proposer configured".to_string()))
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Fixed proposals per section, e.g. recorded model output replayed from disk
#[derive(Debug, Clone, Default)]
pub struct StaticProposer {
    proposals: HashMap<SectionType, BoundaryInfo>,
}

impl StaticProposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, section: SectionType, boundary: BoundaryInfo) -> Self {
        self.proposals.insert(section, boundary);
        self
    }

    /// Parse `{"backMatter": {"startLine": 410, "confidence": 0.8}, ...}`
    pub fn from_json(json: &str) -> Result<Self, ProposalError> {
        let proposals: HashMap<SectionType, BoundaryInfo> = serde_json::from_str(json)
            .map_err(|e| ProposalError::MalformedResponse(e.to_string()))?;

        for (section, boundary) in &proposals {
            if !(0.0..=1.0).contains(&boundary.confidence) {
                return Err(ProposalError::MalformedResponse(format!(
                    "{} confidence {} is outside [0, 1]",
                    section, boundary.confidence
                )));
            }
        }

        Ok(Self { proposals })
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}

impl BoundaryProposer for StaticProposer {
    fn propose(&self, _sample: &str, section: SectionType) -> Result<BoundaryInfo, ProposalError> {
        self.proposals
            .get(&section)
            .cloned()
            .ok_or_else(|| ProposalError::Unavailable(format!("no proposal recorded for {}", section)))
    }

    fn name(&self) -> &str {
        "static"
    }
}
