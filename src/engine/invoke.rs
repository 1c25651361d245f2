//! Invocation engine
//!
//! Walks the prerequisite graph from a starting task and runs each reachable
//! task's actions at most once. A task is claimed *before* recursing into
//! prerequisites, so a same-thread prerequisite cycle resolves as a silent
//! no-op on the repeated node; a concurrent invoker of an in-flight task
//! waits until that invocation settles before treating it as satisfied.
//! Multitask prerequisites run on scoped worker threads, one per
//! prerequisite, joined before the multitask's own actions; a failed worker
//! never cancels its siblings.

use crate::engine::context::TaskContext;
use crate::engine::registry::Registry;
use crate::engine::scope::Scope;
use crate::engine::task::{InvokeClaim, Task, TaskKind};
use crate::error::{InvokeError, InvokeResult};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;

/// Drives one run's invocation over a registry
pub struct Invoker<'a> {
    registry: &'a Registry,
    verbose: bool,
    dry_run: bool,
}

impl<'a> Invoker<'a> {
    pub fn new(registry: &'a Registry, verbose: bool, dry_run: bool) -> Self {
        Invoker {
            registry,
            verbose,
            dry_run,
        }
    }

    /// Invoke a task by name, resolved at the global scope
    pub fn invoke(&self, name: &str) -> InvokeResult<()> {
        let task = self.registry.resolve(name, &Scope::root())?;
        self.invoke_task(&task)
    }

    /// Invoke a resolved task: prerequisites first, then its own actions
    ///
    /// Exactly one caller runs the task. A concurrent caller blocks until
    /// the in-flight invocation settles, so a parent never proceeds to its
    /// own actions (or staleness checks) while a shared prerequisite is
    /// still executing.
    pub fn invoke_task(&self, task: &Arc<Task>) -> InvokeResult<()> {
        match task.begin_invoke() {
            InvokeClaim::Owned => {}
            InvokeClaim::Reentered | InvokeClaim::Settled => return Ok(()),
        }
        let result = self.run_claimed(task);
        task.finish_invoke();
        result
    }

    fn run_claimed(&self, task: &Arc<Task>) -> InvokeResult<()> {
        if self.verbose {
            eprintln!("** Invoke {}", task.name());
        }
        let prereqs = task.prerequisites();
        match task.kind() {
            TaskKind::Multi => self.invoke_concurrently(task, &prereqs)?,
            _ => {
                for name in &prereqs {
                    let prereq = self.registry.resolve(name, task.scope())?;
                    self.invoke_task(&prereq)?;
                }
            }
        }
        if self.should_execute(task)? {
            self.execute(task, &prereqs)?;
        }
        Ok(())
    }

    /// Dispatch every prerequisite to its own worker and join them all;
    /// the first failure in dispatch order is surfaced once all have settled
    fn invoke_concurrently(&self, task: &Arc<Task>, prereqs: &[String]) -> InvokeResult<()> {
        let results: Vec<InvokeResult<()>> = thread::scope(|s| {
            let handles: Vec<_> = prereqs
                .iter()
                .map(|name| {
                    s.spawn(move || -> InvokeResult<()> {
                        let prereq = self.registry.resolve(name, task.scope())?;
                        self.invoke_task(&prereq)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(InvokeError::WorkerPanicked(task.name().into())))
                })
                .collect()
        });
        results.into_iter().collect()
    }

    /// File tasks run only when out of date; everything else always runs
    fn should_execute(&self, task: &Task) -> InvokeResult<bool> {
        match task.kind() {
            TaskKind::File(path) => self.out_of_date(task, path),
            _ => Ok(true),
        }
    }

    /// Staleness is computed here, never cached. The comparison is valid
    /// because every prerequisite was already invoked, so file products
    /// exist and are current.
    fn out_of_date(&self, task: &Task, target: &Path) -> InvokeResult<bool> {
        let target_mtime = match mtime(target) {
            Some(ts) => ts,
            None => return Ok(true),
        };
        for name in task.prerequisites() {
            let prereq = self.registry.resolve(&name, task.scope())?;
            match prereq.kind() {
                TaskKind::File(_) => match prereq.timestamp() {
                    Some(ts) if ts > target_mtime => return Ok(true),
                    // Prerequisite product missing: rebuild rather than trust
                    // a stale target.
                    None => return Ok(true),
                    _ => {}
                },
                // A non-file prerequisite always forces a rebuild.
                _ => return Ok(true),
            }
        }
        Ok(false)
    }

    fn execute(&self, task: &Task, prereqs: &[String]) -> InvokeResult<()> {
        if self.dry_run {
            eprintln!("** Execute (dry run) {}", display_name(task));
            return Ok(());
        }
        if self.verbose {
            eprintln!("** Execute {}", display_name(task));
        }
        let actions = task.actions();
        if actions.is_empty() {
            return Ok(());
        }
        let ctx = TaskContext::new(
            display_name(task),
            self.resolved_prereqs(task, prereqs)?,
            self.verbose,
            self.dry_run,
        );
        for action in actions {
            action(&ctx).map_err(|source| InvokeError::ActionFailed {
                task: task.name().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Resolve declared prerequisite names to what actions get to see:
    /// target paths for file tasks, qualified names otherwise
    fn resolved_prereqs(&self, task: &Task, prereqs: &[String]) -> InvokeResult<Vec<String>> {
        prereqs
            .iter()
            .map(|name| {
                let prereq = self.registry.resolve(name, task.scope())?;
                Ok(display_name(&prereq))
            })
            .collect()
    }
}

/// Name actions see: the target path for file tasks, else the qualified name
fn display_name(task: &Task) -> String {
    match task.target_path() {
        Some(path) => path.display().to_string(),
        None => task.name().to_string(),
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::task::action;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn define(
        reg: &Registry,
        name: &str,
        kind: TaskKind,
        prereqs: &[&str],
        act: Option<crate::engine::task::Action>,
    ) -> Arc<Task> {
        reg.define(
            name.to_string(),
            kind,
            Scope::root(),
            prereqs.iter().map(|s| s.to_string()).collect(),
            act,
            None,
        )
    }

    #[test]
    fn test_diamond_runs_shared_prereq_once() {
        let reg = Registry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        define(
            &reg,
            "c",
            TaskKind::Plain,
            &[],
            Some(action(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
        );
        define(&reg, "a", TaskKind::Plain, &["c"], None);
        define(&reg, "b", TaskKind::Plain, &["c"], None);
        define(&reg, "top", TaskKind::Plain, &["a", "b"], None);

        Invoker::new(&reg, false, false).invoke("top").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cycle_is_silent_noop() {
        let reg = Registry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for (name, dep) in [("x", "y"), ("y", "x")] {
            let log = log.clone();
            let tag = name.to_string();
            define(
                &reg,
                name,
                TaskKind::Plain,
                &[dep],
                Some(action(move |_| {
                    log.lock().unwrap().push(tag.clone());
                    Ok(())
                })),
            );
        }
        Invoker::new(&reg, false, false).invoke("x").unwrap();
        // y sees x already invoked and treats it as satisfied.
        assert_eq!(*log.lock().unwrap(), vec!["y", "x"]);
    }

    #[test]
    fn test_sequential_failure_aborts_walk() {
        let reg = Registry::new();
        let ran_second = Arc::new(AtomicUsize::new(0));
        define(
            &reg,
            "boom",
            TaskKind::Plain,
            &[],
            Some(action(|_| anyhow::bail!("broken"))),
        );
        let r = ran_second.clone();
        define(
            &reg,
            "after",
            TaskKind::Plain,
            &[],
            Some(action(move |_| {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
        );
        define(&reg, "top", TaskKind::Plain, &["boom", "after"], None);

        let err = Invoker::new(&reg, false, false).invoke("top").unwrap_err();
        assert!(matches!(err, InvokeError::ActionFailed { .. }));
        assert_eq!(ran_second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_action_failure_aborts_remaining_actions() {
        let reg = Registry::new();
        let ran_after = Arc::new(AtomicUsize::new(0));
        define(
            &reg,
            "t",
            TaskKind::Plain,
            &[],
            Some(action(|_| anyhow::bail!("first action fails"))),
        );
        let r = ran_after.clone();
        define(
            &reg,
            "t",
            TaskKind::Plain,
            &[],
            Some(action(move |_| {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
        );
        assert!(Invoker::new(&reg, false, false).invoke("t").is_err());
        assert_eq!(ran_after.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_multitask_siblings_settle_and_first_failure_wins() {
        let reg = Registry::new();
        let survivor_ran = Arc::new(AtomicUsize::new(0));
        define(
            &reg,
            "bad1",
            TaskKind::Plain,
            &[],
            Some(action(|_| anyhow::bail!("bad1"))),
        );
        define(
            &reg,
            "bad2",
            TaskKind::Plain,
            &[],
            Some(action(|_| anyhow::bail!("bad2"))),
        );
        let r = survivor_ran.clone();
        define(
            &reg,
            "good",
            TaskKind::Plain,
            &[],
            Some(action(move |_| {
                std::thread::sleep(std::time::Duration::from_millis(20));
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
        );
        define(&reg, "all", TaskKind::Multi, &["bad1", "good", "bad2"], None);

        let err = Invoker::new(&reg, false, false).invoke("all").unwrap_err();
        match err {
            InvokeError::ActionFailed { task, .. } => assert_eq!(task, "bad1"),
            other => panic!("unexpected error: {other}"),
        }
        // The slow sibling was allowed to finish.
        assert_eq!(survivor_ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_branches_wait_for_shared_prereq_to_settle() {
        let reg = Registry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = log.clone();
        define(
            &reg,
            "c",
            TaskKind::Plain,
            &[],
            Some(action(move |_| {
                std::thread::sleep(std::time::Duration::from_millis(40));
                l.lock().unwrap().push("c-end".to_string());
                Ok(())
            })),
        );
        for name in ["a", "b"] {
            let l = log.clone();
            let tag = format!("{name}-action");
            define(
                &reg,
                name,
                TaskKind::Plain,
                &["c"],
                Some(action(move |_| {
                    l.lock().unwrap().push(tag.clone());
                    Ok(())
                })),
            );
        }
        define(&reg, "top", TaskKind::Multi, &["a", "b"], None);

        Invoker::new(&reg, false, false).invoke("top").unwrap();
        let entries = log.lock().unwrap().clone();
        // Whichever worker loses the claim on c must still wait for it.
        assert_eq!(entries[0], "c-end");
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_file_task_skipped_when_fresh() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("out.txt");
        std::fs::write(&target, "content").unwrap();

        let reg = Registry::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        define(
            &reg,
            target.to_str().unwrap(),
            TaskKind::File(target.clone()),
            &[],
            Some(action(move |_| {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
        );
        Invoker::new(&reg, false, false)
            .invoke(target.to_str().unwrap())
            .unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_file_task_runs_when_target_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("out.txt");

        let reg = Registry::new();
        let t = target.clone();
        define(
            &reg,
            target.to_str().unwrap(),
            TaskKind::File(target.clone()),
            &[],
            Some(action(move |_| {
                std::fs::write(&t, "built")?;
                Ok(())
            })),
        );
        Invoker::new(&reg, false, false)
            .invoke(target.to_str().unwrap())
            .unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "built");
    }

    #[test]
    fn test_plain_prereq_forces_file_rebuild() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("out.txt");
        std::fs::write(&target, "old").unwrap();

        let reg = Registry::new();
        define(&reg, "always", TaskKind::Plain, &[], None);
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        define(
            &reg,
            target.to_str().unwrap(),
            TaskKind::File(target.clone()),
            &["always"],
            Some(action(move |_| {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
        );
        Invoker::new(&reg, false, false)
            .invoke(target.to_str().unwrap())
            .unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dry_run_skips_actions() {
        let reg = Registry::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        define(
            &reg,
            "t",
            TaskKind::Plain,
            &[],
            Some(action(move |_| {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
        );
        Invoker::new(&reg, false, true).invoke("t").unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
