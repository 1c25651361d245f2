//! Task entities
//!
//! Tasks are created during the single-threaded definition phase and shared
//! (`Arc`) into the invocation engine, which may read them from several
//! multitask workers at once. Prerequisites, actions and the description sit
//! behind mutexes because rule synthesis registers new tasks mid-invocation;
//! the invocation cell is a small state machine behind a mutex and condvar so
//! a diamond dependency reached from two concurrent branches runs at most
//! once, and a concurrent invoker of an in-flight task waits until that
//! invocation settles.

use crate::engine::context::TaskContext;
use crate::engine::scope::Scope;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, ThreadId};
use std::time::SystemTime;

/// An action closure attached to a task
///
/// Actions are opaque host code; whatever they report is wrapped into
/// `InvokeError::ActionFailed` by the invocation engine.
pub type Action = Arc<dyn Fn(&TaskContext) -> anyhow::Result<()> + Send + Sync>;

/// Wrap a closure into an [`Action`]
pub fn action<F>(f: F) -> Action
where
    F: Fn(&TaskContext) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// What flavor of task an entry is
///
/// The kind is fixed by the first definition of a qualified name; later
/// redefinitions merge into it without changing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Ordinary task: always runs its actions, prerequisites in order
    Plain,
    /// File-producing task: actions gated on staleness of the target path
    File(PathBuf),
    /// Like `Plain`, but prerequisites are invoked concurrently
    Multi,
}

/// Invocation lifecycle of a task within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InvokeState {
    Fresh,
    Running(ThreadId),
    Done,
}

/// What [`Task::begin_invoke`] tells the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeClaim {
    /// The caller owns this invocation and must call [`Task::finish_invoke`]
    Owned,
    /// The owning thread re-entered the task it is already running (a
    /// prerequisite cycle); treat it as satisfied
    Reentered,
    /// Another invocation ran to completion (waited out if it was in flight)
    Settled,
}

/// A registered unit of work
pub struct Task {
    name: String,
    kind: TaskKind,
    scope: Scope,
    prereqs: Mutex<Vec<String>>,
    actions: Mutex<Vec<Action>>,
    description: Mutex<Option<String>>,
    invocation: Mutex<InvokeState>,
    settled: Condvar,
}

impl Task {
    pub(crate) fn new(name: String, kind: TaskKind, scope: Scope) -> Self {
        Task {
            name,
            kind,
            scope,
            prereqs: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
            description: Mutex::new(None),
            invocation: Mutex::new(InvokeState::Fresh),
            settled: Condvar::new(),
        }
    }

    /// Fully qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    /// Scope the task was defined in; prerequisite names resolve against it
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Target path for file tasks
    pub fn target_path(&self) -> Option<&Path> {
        match &self.kind {
            TaskKind::File(path) => Some(path),
            _ => None,
        }
    }

    /// Snapshot of the declared prerequisite names, in order
    pub fn prerequisites(&self) -> Vec<String> {
        self.prereqs.lock().unwrap().clone()
    }

    /// Append prerequisites (redefinition extends, never replaces)
    pub fn extend_prerequisites<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prereqs = self.prereqs.lock().unwrap();
        prereqs.extend(names.into_iter().map(Into::into));
    }

    /// Append an action (redefinition appends, never replaces)
    pub fn add_action(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }

    /// Snapshot of the action list, in definition order
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    /// Most recently recorded description, if any
    pub fn description(&self) -> Option<String> {
        self.description.lock().unwrap().clone()
    }

    /// Record a description; only a non-empty value overrides
    pub fn record_description(&self, desc: Option<String>) {
        if let Some(text) = desc {
            if !text.is_empty() {
                *self.description.lock().unwrap() = Some(text);
            }
        }
    }

    /// Claim the right to invoke this task
    ///
    /// Exactly one caller per run gets `Owned` and must pair it with
    /// [`finish_invoke`](Task::finish_invoke). A caller on another thread
    /// blocks until the owner finishes, then sees `Settled`; the owning
    /// thread re-entering mid-run gets `Reentered` without blocking, which
    /// is what keeps a prerequisite cycle a silent no-op.
    pub fn begin_invoke(&self) -> InvokeClaim {
        let mut state = self.invocation.lock().unwrap();
        loop {
            match *state {
                InvokeState::Fresh => {
                    *state = InvokeState::Running(thread::current().id());
                    return InvokeClaim::Owned;
                }
                InvokeState::Running(owner) if owner == thread::current().id() => {
                    return InvokeClaim::Reentered;
                }
                InvokeState::Running(_) => {
                    state = self.settled.wait(state).unwrap();
                }
                InvokeState::Done => return InvokeClaim::Settled,
            }
        }
    }

    /// Mark the claimed invocation complete and wake any waiters
    pub fn finish_invoke(&self) {
        *self.invocation.lock().unwrap() = InvokeState::Done;
        self.settled.notify_all();
    }

    /// Whether an invocation has begun (running or settled)
    pub fn is_invoked(&self) -> bool {
        !matches!(*self.invocation.lock().unwrap(), InvokeState::Fresh)
    }

    /// Modification time of the target file, if this is a file task whose
    /// target exists
    pub fn timestamp(&self) -> Option<SystemTime> {
        let path = self.target_path()?;
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("prereqs", &*self.prereqs.lock().unwrap())
            .field("invoked", &self.is_invoked())
            .finish()
    }
}
