//! Rask - a Rake-style task runner and build orchestration engine
//!
//! Rask resolves a transitive prerequisite graph from a starting task and
//! runs each reachable task's actions exactly once, skipping file tasks whose
//! product is newer than all of their inputs. Tasks come from rask.yml
//! definition files or are registered programmatically against a [`Session`].

// Public modules
pub mod cli;
pub mod engine;
pub mod error;
pub mod loader;
pub mod session;

// Re-export commonly used types
pub use error::{RaskError, Result};
pub use session::{RunOptions, Session, DEFAULT_TARGET};

/// Current version of Rask
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
