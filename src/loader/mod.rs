//! YAML definition-file loading
//!
//! This module handles parsing of rask.yml definition files, the comment to
//! description scan, variable interpolation and the shell helper backing
//! YAML-defined actions.

pub mod command;
pub mod interpolate;
pub mod parse;
pub mod schema;

// Re-export main types
pub use command::*;
pub use interpolate::*;
pub use parse::*;
pub use schema::*;
