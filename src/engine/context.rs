//! Per-invocation context handed to action closures
//!
//! Actions see exactly this: the invoking task's resolved name, its resolved
//! prerequisite list, and the current verbosity/dry-run flags. Nothing else
//! leaks out of the engine.

/// Context passed to every action closure
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// Resolved task name; for file tasks this is the target path
    pub name: String,

    /// Resolved prerequisites, in declaration order; file-task prerequisites
    /// contribute their target path, others their fully qualified name
    pub prerequisites: Vec<String>,

    /// Verbose flag from the run options
    pub verbose: bool,

    /// Dry-run flag from the run options
    pub dry_run: bool,
}

impl TaskContext {
    pub fn new(name: String, prerequisites: Vec<String>, verbose: bool, dry_run: bool) -> Self {
        TaskContext {
            name,
            prerequisites,
            verbose,
            dry_run,
        }
    }

    /// First prerequisite, the conventional "source" of a rule-synthesized
    /// file task
    pub fn source(&self) -> Option<&str> {
        self.prerequisites.first().map(String::as_str)
    }
}
