//! Session: definition and run state for one rask invocation
//!
//! The session replaces any global registry: it owns the task registry, the
//! active namespace stack, the pending description buffer, the import queue
//! and the run options, and it drives load -> deferred imports -> invocation.
//! Definition is single-threaded (`&mut self`); invocation borrows the
//! session immutably so multitask workers can share it.

pub mod imports;

pub use imports::{FnLoader, Loader};

use crate::engine::{Action, Invoker, Namespace, Registry, Task, TaskKind};
use crate::error::{LoadError, Result};
use crate::loader::YamlLoader;
use imports::{ImportQueue, LoaderSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the task invoked when none is requested
pub const DEFAULT_TARGET: &str = "default";

/// Flat run configuration consumed by the engine
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Starting task; `default` when unset
    pub target: Option<String>,

    /// Walk the graph and report intent without running actions
    pub dry_run: bool,

    /// Print invocation trace lines
    pub verbose: bool,

    /// Extra directories whose definition files load before deferred
    /// imports are processed
    pub lib_dirs: Vec<PathBuf>,
}

/// Definition and invocation session
pub struct Session {
    registry: Registry,
    scope: crate::engine::Scope,
    anon_counter: usize,
    description: Option<String>,
    imports: ImportQueue,
    loaders: LoaderSet,
    options: RunOptions,
}

impl Session {
    pub fn new(options: RunOptions) -> Self {
        Session {
            registry: Registry::new(),
            scope: crate::engine::Scope::root(),
            anon_counter: 0,
            description: None,
            imports: ImportQueue::default(),
            loaders: LoaderSet::new(Arc::new(YamlLoader)),
            options,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Buffer a description for the next task definition
    ///
    /// The buffer is consumed (and cleared) by whichever definition comes
    /// next; only a non-empty description overrides an existing one.
    pub fn desc(&mut self, text: impl Into<String>) {
        self.description = Some(text.into());
    }

    /// Declare a plain task in the current scope
    pub fn define_task(&mut self, name: &str, prereqs: &[&str], action: Option<Action>) -> Arc<Task> {
        let desc = self.description.take();
        let qualified = self.scope.qualify(name);
        self.registry.define(
            qualified,
            TaskKind::Plain,
            self.scope.clone(),
            prereqs.iter().map(|s| s.to_string()).collect(),
            action,
            desc,
        )
    }

    /// Declare a file-producing task
    ///
    /// The registry key is the path qualified by the current scope, so two
    /// namespaces declaring the same literal path get independent entries;
    /// the target path stays the literal path either way.
    pub fn define_file_task(
        &mut self,
        path: &str,
        prereqs: &[&str],
        action: Option<Action>,
    ) -> Arc<Task> {
        let desc = self.description.take();
        let qualified = self.scope.qualify(path);
        self.registry.define(
            qualified,
            TaskKind::File(PathBuf::from(path)),
            self.scope.clone(),
            prereqs.iter().map(|s| s.to_string()).collect(),
            action,
            desc,
        )
    }

    /// Declare a task whose prerequisites are invoked concurrently
    pub fn define_multitask(
        &mut self,
        name: &str,
        prereqs: &[&str],
        action: Option<Action>,
    ) -> Arc<Task> {
        let desc = self.description.take();
        let qualified = self.scope.qualify(name);
        self.registry.define(
            qualified,
            TaskKind::Multi,
            self.scope.clone(),
            prereqs.iter().map(|s| s.to_string()).collect(),
            action,
            desc,
        )
    }

    /// Declare a suffix rule; synthesized tasks get `action` with the
    /// source as their first prerequisite
    pub fn define_rule(&mut self, target_suffix: &str, source_suffix: &str, action: Action) {
        self.registry
            .add_rule(crate::engine::Rule::new(target_suffix, source_suffix, action));
    }

    /// Open a named namespace for the duration of `body`
    pub fn namespace<F>(&mut self, name: &str, body: F) -> Namespace
    where
        F: FnOnce(&mut Session),
    {
        self.scope.push(name);
        let handle = Namespace::new(self.scope.clone());
        body(self);
        self.scope.pop();
        handle
    }

    /// Open an anonymous namespace; members are reachable only through the
    /// returned handle
    pub fn anonymous_namespace<F>(&mut self, body: F) -> Namespace
    where
        F: FnOnce(&mut Session),
    {
        self.anon_counter += 1;
        let segment = format!("_anon_{}", self.anon_counter);
        self.namespace(&segment, body)
    }

    /// Queue a definition file for evaluation after the current file's
    /// top-level statements finish
    pub fn import(&mut self, path: impl Into<PathBuf>) {
        self.imports.enqueue(path.into());
    }

    /// Register a loader for a file extension
    pub fn add_loader(&mut self, ext: &str, loader: Arc<dyn Loader>) {
        self.loaders.register(ext, loader);
    }

    /// Evaluate a definition file immediately through its loader
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let loader = self.loaders.for_path(path);
        loader.load(path, self)
    }

    /// Load every definition file in the configured library directories,
    /// in sorted order per directory
    pub fn load_lib_dirs(&mut self) -> Result<()> {
        let dirs = self.options.lib_dirs.clone();
        for dir in dirs {
            let mut files = Vec::new();
            for pattern in ["*.yml", "*.yaml"] {
                let pattern = dir.join(pattern).to_string_lossy().into_owned();
                let entries = glob::glob(&pattern).map_err(|e| LoadError::ReadFile {
                    path: dir.clone(),
                    error: e.to_string(),
                })?;
                for entry in entries {
                    files.push(entry.map_err(|e| LoadError::ReadFile {
                        path: dir.clone(),
                        error: e.to_string(),
                    })?);
                }
            }
            files.sort();
            for file in files {
                self.load_file(&file)?;
            }
        }
        Ok(())
    }

    /// Drain the import queue in enqueue order
    ///
    /// If the import path names a registered task it is invoked first, so a
    /// stale import source gets regenerated before its content is read.
    /// Each path gets exactly one build-then-read cycle per run.
    pub fn process_imports(&mut self) -> Result<()> {
        while let Some(path) = self.imports.next() {
            let key = path.to_string_lossy().into_owned();
            if self.registry.get(&key).is_some() {
                self.invoke(&key)?;
            }
            let loader = self.loaders.for_path(&path);
            loader.load(&path, self)?;
        }
        Ok(())
    }

    /// Invoke a task by name at the global scope
    pub fn invoke(&self, name: &str) -> Result<()> {
        Invoker::new(&self.registry, self.options.verbose, self.options.dry_run).invoke(name)?;
        Ok(())
    }

    /// Full drive sequence: main file, library directories, deferred
    /// imports, then the requested (or default) target
    pub fn run(&mut self, main_file: &Path) -> Result<()> {
        self.load_file(main_file)?;
        self.load_lib_dirs()?;
        self.process_imports()?;
        let target = self
            .options
            .target
            .clone()
            .unwrap_or_else(|| DEFAULT_TARGET.to_string());
        self.invoke(&target)
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(RunOptions::default())
    }
}
