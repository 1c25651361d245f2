//! Definition-file parsing, discovery and session application

use crate::engine::task::{action, Action};
use crate::error::{LoadError, LoadResult, Result};
use crate::loader::command::run_command;
use crate::loader::schema::{DefFile, TaskDef};
use crate::session::{Loader, Session};
use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default definition file names to search for
pub const DEFINITION_FILE_NAMES: &[&str] = &["rask.yml", "rask.yaml"];

/// Conventional library directory next to the definition file
pub const LIB_DIR_NAME: &str = "rasklib";

/// Find the definition file by searching current and parent directories
pub fn find_definition_file() -> LoadResult<PathBuf> {
    let start = env::current_dir()
        .map_err(|e| LoadError::NotFound(format!("cannot determine current directory: {}", e)))?;
    find_definition_file_from(start)
}

/// Find the definition file starting from a specific directory
pub fn find_definition_file_from(start_dir: PathBuf) -> LoadResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in DEFINITION_FILE_NAMES {
            let candidate = current_dir.join(file_name);
            searched_paths.push(candidate.display().to_string());

            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(LoadError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// The default loader: rask.yml definition files
pub struct YamlLoader;

impl Loader for YamlLoader {
    fn load(&self, path: &Path, session: &mut Session) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|e| LoadError::ReadFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let def = parse_definitions(&text, path)?;
        let comments = scan_comments(&text);
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        apply_definitions(&def, &comments, base, session);
        Ok(())
    }
}

/// Parse YAML text into a definition file; empty input is an empty file
pub fn parse_definitions(text: &str, path: &Path) -> LoadResult<DefFile> {
    let parsed: Option<DefFile> =
        serde_yaml::from_str(text).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    Ok(parsed.unwrap_or_default())
}

/// Scan raw text for comment lines sitting immediately above a task key
///
/// A `# comment` line directly above a task key (no blank line between)
/// becomes the description of that task unless its entry carries an
/// explicit `desc:` field. Only keys that are direct children of a
/// `tasks:`, `file:` or `multitask:` block count; a comment above an
/// option line (`run:`, `deps:`, ...) is dropped. Keys are qualified by
/// the enclosing namespace path, so same-named tasks in different
/// namespaces keep their own comments.
pub fn scan_comments(text: &str) -> HashMap<String, String> {
    let comment_re = Regex::new(r"^\s*#\s?(.*)$").unwrap();
    let key_re = Regex::new(r#"^\s*"?([A-Za-z0-9_./:-]+)"?\s*:"#).unwrap();

    let mut comments = HashMap::new();
    let mut pending: Option<String> = None;
    // Open mapping keys on the path to the current line, with their indent.
    let mut stack: Vec<(usize, String)> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            pending = None;
            continue;
        }
        if let Some(caps) = comment_re.captures(line) {
            pending = Some(caps[1].trim().to_string());
            continue;
        }
        let comment = pending.take();
        let Some(caps) = key_re.captures(line) else {
            continue;
        };
        let indent = line.len() - line.trim_start().len();
        while stack.last().is_some_and(|(i, _)| *i >= indent) {
            stack.pop();
        }
        let key = caps[1].to_string();
        if let Some(comment) = comment {
            if let Some(qualified) = qualify_task_key(&stack, &key) {
                comments.insert(qualified, comment);
            }
        }
        stack.push((indent, key));
    }
    comments
}

/// Qualified name for `key` if its enclosing blocks make it a task key:
/// a `tasks:`/`file:`/`multitask:` section reached only through
/// `namespaces:` sections
fn qualify_task_key(stack: &[(usize, String)], key: &str) -> Option<String> {
    let (section, outer) = stack.split_last()?;
    if !matches!(section.1.as_str(), "tasks" | "file" | "multitask") {
        return None;
    }
    let mut segments = Vec::new();
    let mut parts = outer.iter();
    while let Some((_, part)) = parts.next() {
        if part != "namespaces" {
            return None;
        }
        let (_, name) = parts.next()?;
        segments.push(name.as_str());
    }
    segments.push(key);
    Some(segments.join(crate::engine::SEPARATOR))
}

/// Register everything a definition file declares into the session
///
/// `base` is the defining file's directory; relative imports resolve
/// against it.
pub fn apply_definitions(
    def: &DefFile,
    comments: &HashMap<String, String>,
    base: &Path,
    session: &mut Session,
) {
    for (name, entry) in &def.tasks {
        let task_def = normalized(entry);
        attach_description(session, name, &task_def, comments);
        let task = session.define_task(name, &as_refs(&task_def.deps), None);
        for cmd in &task_def.run {
            task.add_action(command_action(cmd.clone()));
        }
    }

    for (path, entry) in &def.files {
        let task_def = normalized(entry);
        attach_description(session, path, &task_def, comments);
        let task = session.define_file_task(path, &as_refs(&task_def.deps), None);
        for cmd in &task_def.run {
            task.add_action(command_action(cmd.clone()));
        }
    }

    for (name, entry) in &def.multitasks {
        let task_def = normalized(entry);
        attach_description(session, name, &task_def, comments);
        let task = session.define_multitask(name, &as_refs(&task_def.deps), None);
        for cmd in &task_def.run {
            task.add_action(command_action(cmd.clone()));
        }
    }

    for rule in &def.rules {
        let cmds = rule.run.clone();
        session.define_rule(
            &rule.target,
            &rule.source,
            action(move |ctx| {
                for cmd in &cmds {
                    run_command(cmd, ctx)?;
                }
                Ok(())
            }),
        );
    }

    for (name, body) in &def.namespaces {
        // Comments are keyed by namespace-qualified name; hand the nested
        // body its own slice with the prefix stripped.
        let prefix = format!("{}{}", name, crate::engine::SEPARATOR);
        let scoped: HashMap<String, String> = comments
            .iter()
            .filter_map(|(key, text)| {
                key.strip_prefix(&prefix)
                    .map(|rest| (rest.to_string(), text.clone()))
            })
            .collect();
        session.namespace(name, |inner| {
            apply_definitions(body, &scoped, base, inner);
        });
    }

    for import in &def.imports {
        // join() keeps an already-absolute import as-is
        session.import(base.join(import));
    }
}

fn normalized(entry: &Option<TaskDef>) -> TaskDef {
    entry.clone().unwrap_or_default()
}

/// Explicit `desc:` beats an adjacent comment line
fn attach_description(
    session: &mut Session,
    name: &str,
    task_def: &TaskDef,
    comments: &HashMap<String, String>,
) {
    if let Some(desc) = &task_def.desc {
        session.desc(desc.clone());
    } else if let Some(comment) = comments.get(name) {
        session.desc(comment.clone());
    }
}

fn as_refs(deps: &[String]) -> Vec<&str> {
    deps.iter().map(String::as_str).collect()
}

fn command_action(cmd: String) -> Action {
    action(move |ctx| run_command(&cmd, ctx))
}
