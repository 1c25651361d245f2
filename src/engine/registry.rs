//! Task registry
//!
//! Owns every task keyed by fully qualified name. Definition is create-or-
//! merge: redefining a name extends its prerequisites, appends its actions
//! and lets a non-empty description override. Lookup misses fall back to
//! rule synthesis and finally to plain files on disk.
//!
//! The registry is read-mostly during invocation but multitask workers may
//! synthesize rule tasks concurrently, so the maps sit behind `RwLock`s.
//! Locks are held only for the map operation itself, never across rule
//! recursion.

use crate::engine::rules::Rule;
use crate::engine::scope::{Scope, ROOT_ALIAS};
use crate::engine::task::{Action, Task, TaskKind};
use crate::error::{InvokeError, InvokeResult};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Registry of tasks and rules
#[derive(Default)]
pub struct Registry {
    tasks: RwLock<HashMap<String, Arc<Task>>>,
    rules: RwLock<Vec<Rule>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Create-or-merge a task definition
    ///
    /// `qualified` is the full registry key. The kind and scope stick from
    /// the first definition; prerequisites, actions and description merge
    /// additively into an existing entry.
    pub fn define(
        &self,
        qualified: String,
        kind: TaskKind,
        scope: Scope,
        prereqs: Vec<String>,
        action: Option<Action>,
        description: Option<String>,
    ) -> Arc<Task> {
        let task = {
            let mut tasks = self.tasks.write().unwrap();
            tasks
                .entry(qualified.clone())
                .or_insert_with(|| Arc::new(Task::new(qualified, kind, scope)))
                .clone()
        };
        task.extend_prerequisites(prereqs);
        if let Some(action) = action {
            task.add_action(action);
        }
        task.record_description(description);
        task
    }

    /// Exact lookup by qualified name
    pub fn get(&self, qualified: &str) -> Option<Arc<Task>> {
        self.tasks.read().unwrap().get(qualified).cloned()
    }

    /// Scope-aware lookup of a referenced name
    ///
    /// Walks the scope chain innermost-first, then the global scope; the
    /// first registered task wins. The `rask:` prefix forces an absolute
    /// lookup.
    pub fn lookup(&self, name: &str, scope: &Scope) -> Option<Arc<Task>> {
        scope
            .candidates(name)
            .iter()
            .find_map(|candidate| self.get(candidate))
    }

    /// Register a suffix rule
    pub fn add_rule(&self, rule: Rule) {
        self.rules.write().unwrap().push(rule);
    }

    /// All registered tasks, sorted by qualified name
    pub fn tasks(&self) -> Vec<Arc<Task>> {
        let mut tasks: Vec<_> = self.tasks.read().unwrap().values().cloned().collect();
        tasks.sort_by(|a, b| a.name().cmp(b.name()));
        tasks
    }

    /// Resolve a referenced name to a task, synthesizing one from a rule or
    /// an existing file on disk when nothing is registered
    pub fn resolve(&self, name: &str, scope: &Scope) -> InvokeResult<Arc<Task>> {
        if let Some(task) = self.lookup(name, scope) {
            return Ok(task);
        }
        // Synthesis works on the absolute name; file paths have no scope.
        let absolute = name.strip_prefix(ROOT_ALIAS).unwrap_or(name);
        let mut visited = HashSet::new();
        visited.insert(absolute.to_string());
        match self.try_synthesize(absolute, &mut visited)? {
            Some(task) => Ok(task),
            None => Err(InvokeError::TaskNotFound(name.to_string())),
        }
    }

    /// Attempt rule synthesis for `name`, chasing rule chains recursively
    ///
    /// `visited` guards each top-level resolution: a chain that revisits a
    /// name fails with `NoRule` instead of looping. Rules are tried newest
    /// registration first, so the most recently registered match wins.
    fn try_synthesize(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
    ) -> InvokeResult<Option<Arc<Task>>> {
        let rules = self.rules.read().unwrap().clone();
        let mut matched = false;
        for rule in rules.iter().rev() {
            let Some(source) = rule.source_for(name) else {
                continue;
            };
            matched = true;
            if !visited.insert(source.clone()) {
                return Err(InvokeError::NoRule(name.to_string()));
            }
            let source_exists = self.get(&source).is_some()
                || Path::new(&source).exists()
                || self.try_synthesize(&source, visited)?.is_some();
            if !source_exists {
                continue;
            }
            let task = self.register_synthesized(name, Some(source), Some(rule.action()));
            return Ok(Some(task));
        }
        // A name with no task and no applicable rule may still be satisfied
        // by a file already on disk: it becomes an actionless file task.
        if Path::new(name).exists() {
            return Ok(Some(self.register_synthesized(name, None, None)));
        }
        if matched {
            return Err(InvokeError::NoRule(name.to_string()));
        }
        Ok(None)
    }

    /// Register a synthesized file task, populating it only on first insert
    ///
    /// Two workers can race past the same lookup miss and both reach
    /// synthesis; the check and the insert happen under one write-lock
    /// critical section, so the loser adopts the winner's task instead of
    /// appending a second source prerequisite and rule action to it.
    fn register_synthesized(
        &self,
        name: &str,
        source: Option<String>,
        action: Option<Action>,
    ) -> Arc<Task> {
        let mut tasks = self.tasks.write().unwrap();
        if let Some(existing) = tasks.get(name) {
            return existing.clone();
        }
        let task = Arc::new(Task::new(
            name.to_string(),
            TaskKind::File(name.into()),
            Scope::root(),
        ));
        task.extend_prerequisites(source);
        if let Some(action) = action {
            task.add_action(action);
        }
        tasks.insert(name.to_string(), task.clone());
        task
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tasks", &self.tasks.read().unwrap().len())
            .field("rules", &self.rules.read().unwrap().len())
            .finish()
    }
}
