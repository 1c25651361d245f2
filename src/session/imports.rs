//! Deferred imports and definition-file loaders
//!
//! Imports are only queued while a definition file evaluates; the session
//! drains the queue afterwards, in enqueue order. Evaluation goes through a
//! [`Loader`] picked by file extension, so hosts can teach the session new
//! definition formats the same way they register tasks.

use crate::error::Result;
use crate::session::Session;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Evaluates a definition file against a session
pub trait Loader: Send + Sync {
    fn load(&self, path: &Path, session: &mut Session) -> Result<()>;
}

/// Adapter turning a closure into a [`Loader`]
pub struct FnLoader<F>(pub F);

impl<F> Loader for FnLoader<F>
where
    F: Fn(&Path, &mut Session) -> Result<()> + Send + Sync,
{
    fn load(&self, path: &Path, session: &mut Session) -> Result<()> {
        (self.0)(path, session)
    }
}

/// Loaders registered per file extension, with a fallback default
pub(crate) struct LoaderSet {
    by_ext: HashMap<String, Arc<dyn Loader>>,
    default: Arc<dyn Loader>,
}

impl LoaderSet {
    pub fn new(default: Arc<dyn Loader>) -> Self {
        LoaderSet {
            by_ext: HashMap::new(),
            default,
        }
    }

    pub fn register(&mut self, ext: &str, loader: Arc<dyn Loader>) {
        self.by_ext.insert(ext.trim_start_matches('.').to_string(), loader);
    }

    pub fn for_path(&self, path: &Path) -> Arc<dyn Loader> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.by_ext.get(ext))
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// FIFO queue of pending imports; each path evaluates at most once per run
#[derive(Default)]
pub(crate) struct ImportQueue {
    pending: VecDeque<PathBuf>,
    evaluated: HashSet<PathBuf>,
}

impl ImportQueue {
    pub fn enqueue(&mut self, path: PathBuf) {
        self.pending.push_back(path);
    }

    /// Next path that has not been evaluated yet; marks it evaluated
    pub fn next(&mut self) -> Option<PathBuf> {
        while let Some(path) = self.pending.pop_front() {
            if self.evaluated.insert(path.clone()) {
                return Some(path);
            }
        }
        None
    }
}
