//! Suffix rules
//!
//! A rule maps a target suffix to a source suffix plus an action. Rules are
//! never materialized up front; the registry synthesizes a file task from one
//! the first time a lookup misses on a matching name.

use crate::engine::task::Action;

/// A registered suffix rule
#[derive(Clone)]
pub struct Rule {
    target_suffix: String,
    source_suffix: String,
    action: Action,
}

impl Rule {
    pub fn new(target_suffix: impl Into<String>, source_suffix: impl Into<String>, action: Action) -> Self {
        Rule {
            target_suffix: target_suffix.into(),
            source_suffix: source_suffix.into(),
            action,
        }
    }

    /// If `name` matches the target suffix, the source name it implies
    pub fn source_for(&self, name: &str) -> Option<String> {
        let base = name.strip_suffix(&self.target_suffix)?;
        if base.is_empty() {
            return None;
        }
        Some(format!("{}{}", base, self.source_suffix))
    }

    /// The action a synthesized file task receives; it reads the source from
    /// its context's first prerequisite
    pub fn action(&self) -> Action {
        self.action.clone()
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("target_suffix", &self.target_suffix)
            .field("source_suffix", &self.source_suffix)
            .finish()
    }
}
