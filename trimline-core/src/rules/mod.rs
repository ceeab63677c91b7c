// Boundary defense rules - delegates to semantic sub-modules:
// - patterns.rs: literal (regex, weight) tables and the shared scanner
// - position_validation.rs: Phase A, position/size/confidence envelope
// - content_verification.rs: Phase B, does the region read like its section
// - heuristic_detection.rs: Phase C, AI-independent boundary detection
// - engine.rs: DefenseChain tying the phases together

pub mod content_verification;
pub mod engine;
pub mod heuristic_detection;
pub mod patterns;
pub mod position_validation;

pub use content_verification::ContentVerifier;
pub use engine::*;
pub use heuristic_detection::HeuristicDetector;
pub use patterns::PatternLibrary;
pub use position_validation::PositionValidator;
