//! Command-line interface
//!
//! Thin glue: parses flags into run options, discovers the definition file
//! and hands everything to a session. The engine never sees argv.

pub mod app;

pub use app::run;
