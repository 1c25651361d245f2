//! Dependency-resolution and invocation engine
//!
//! The core of rask: the task registry, scope-aware name resolution, suffix
//! rule synthesis and the at-most-once invocation walk.

pub mod context;
pub mod invoke;
pub mod registry;
pub mod rules;
pub mod scope;
pub mod task;

// Re-export main types
pub use context::*;
pub use invoke::*;
pub use registry::*;
pub use rules::*;
pub use scope::*;
pub use task::*;
