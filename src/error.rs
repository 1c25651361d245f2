//! Error types for Rask

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Rask operations
pub type Result<T> = std::result::Result<T, RaskError>;

/// Main error type for Rask
#[derive(Error, Debug)]
pub enum RaskError {
    /// Task invocation errors
    #[error("Invocation error: {0}")]
    Invoke(#[from] InvokeError),

    /// Definition-file loading errors
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while resolving and invoking tasks
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Don't know how to build task '{0}'")]
    TaskNotFound(String),

    #[error("No rule chain to build '{0}'")]
    NoRule(String),

    #[error("Task '{task}' failed: {source}")]
    ActionFailed {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Prerequisite worker for '{0}' panicked")]
    WorkerPanicked(String),
}

/// Errors raised while discovering, reading or parsing definition files
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("No definition file found (searched: {0})")]
    NotFound(String),

    #[error("Failed to read '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    #[error("Failed to parse '{path}': {error}")]
    Parse { path: PathBuf, error: String },
}

/// Specialized result type for invocation operations
pub type InvokeResult<T> = std::result::Result<T, InvokeError>;

/// Specialized result type for loading operations
pub type LoadResult<T> = std::result::Result<T, LoadError>;
