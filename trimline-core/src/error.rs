use thiserror::Error;

/// Errors that stop a cleaning run before it starts.
/// Boundary rejections are never errors; they resolve to preserved content.
#[derive(Debug, Error)]
pub enum CleaningError {
    #[error("document is empty, nothing to clean")]
    EmptyDocument,
    #[error("failed to compile pattern tables: {0}")]
    Patterns(#[from] regex::Error),
}
