//! Shell command execution for YAML-defined actions
//!
//! The engine never shells out itself; definition files get their commands
//! wrapped into action closures that call into here.

use crate::engine::TaskContext;
use crate::loader::interpolate::interpolate;
use anyhow::bail;
use std::collections::HashMap;
use std::process::{Command, Stdio};

/// Run one shell command on behalf of a task
///
/// `${name}`, `${source}` and `${deps}` interpolate from the task context
/// before the command goes to `sh -c`.
pub fn run_command(cmd: &str, ctx: &TaskContext) -> anyhow::Result<()> {
    let exec = interpolate(cmd, &context_vars(ctx));

    if ctx.verbose {
        eprintln!("[sh] {}", exec);
    }

    let status = Command::new("sh")
        .arg("-c")
        .arg(&exec)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        bail!("command failed with exit code {:?}: {}", status.code(), exec);
    }

    Ok(())
}

/// Variables a command may interpolate
pub(crate) fn context_vars(ctx: &TaskContext) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("name".to_string(), ctx.name.clone());
    if let Some(source) = ctx.source() {
        vars.insert("source".to_string(), source.to_string());
    }
    vars.insert("deps".to_string(), ctx.prerequisites.join(" "));
    vars
}
