// All cleaning logic lives in trimline-core
// This CLI is a thin wrapper around the core library

// CLI-specific modules
pub mod proposals;

// Re-export core types for convenience
pub use trimline_core::*;

// Re-export CLI utilities
pub use proposals::load_proposals;
