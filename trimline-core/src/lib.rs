// Trimline Core Library
//
// Strips non-body material (front matter, contents, indexes, notes, back
// matter) from long-form document text without ever trusting an unverified
// boundary. Main interface: `CleaningPipeline` for whole runs, `DefenseChain`
// for single sections.

pub mod confidence;
pub mod config;
pub mod constraints;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod proposer;
pub mod report;
pub mod rewrite;
pub mod rules;
pub mod sampling;
pub mod text_ops;
pub mod types;

// Re-export main types and functions for easy use
pub use types::*;
pub use confidence::{CleaningPhase, ConfidenceLedger, StepConfidence};
pub use config::CleaningConfig;
pub use constraints::ValidationConstraints;
pub use error::CleaningError;
pub use pipeline::{CleaningPipeline, PipelineStep};
pub use progress::{CancellationToken, NullObserver, PipelineEvent, ProgressObserver};
pub use proposer::{BoundaryProposer, NoProposer, ProposalError, StaticProposer};
pub use report::{CleaningReport, StepRecord};
pub use rewrite::{NoRewriter, RewriteError, RewriteKind, TextRewriter};
pub use rules::{DefenseChain, PhaseOutcome, SectionResolution};
pub use text_ops::{LineTextOps, TextOps};
