//! Main CLI application

use crate::error::{RaskError, Result};
use crate::loader::{find_definition_file, LIB_DIR_NAME};
use crate::session::{RunOptions, Session, DEFAULT_TARGET};
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};

/// Build the clap command
fn build_command() -> Command {
    Command::new("rask")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A Rake-style task runner driven by rask.yml definition files")
        .arg(
            Arg::new("task")
                .value_name("TASK")
                .help("Task to invoke (defaults to 'default')"),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to the definition file"),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Walk the task graph and report intent without executing actions")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print invocation trace output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tasks")
                .short('T')
                .long("tasks")
                .help("List tasks with descriptions and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rasklib")
                .short('R')
                .long("rasklib")
                .value_name("DIR")
                .help("Extra directory of definition files to load (repeatable)")
                .action(ArgAction::Append),
        )
}

/// Run the CLI application
pub fn run() -> Result<()> {
    let matches = build_command().get_matches();
    run_with_matches(&matches)
}

fn run_with_matches(matches: &ArgMatches) -> Result<()> {
    let main_file = match matches.get_one::<String>("file") {
        Some(path) => PathBuf::from(path),
        None => find_definition_file()?,
    };

    // Relative paths in definitions resolve against the definition file's
    // directory, so move there before loading anything.
    let main_file = enter_definition_dir(&main_file)?;

    let mut lib_dirs: Vec<PathBuf> = matches
        .get_many::<String>("rasklib")
        .map(|dirs| dirs.map(PathBuf::from).collect())
        .unwrap_or_default();
    if Path::new(LIB_DIR_NAME).is_dir() {
        lib_dirs.push(PathBuf::from(LIB_DIR_NAME));
    }

    let options = RunOptions {
        target: matches.get_one::<String>("task").cloned(),
        dry_run: matches.get_flag("dry-run"),
        verbose: matches.get_flag("verbose"),
        lib_dirs,
    };

    let mut session = Session::new(options);
    session.load_file(&main_file)?;
    session.load_lib_dirs()?;
    session.process_imports()?;

    if matches.get_flag("tasks") {
        print_task_list(&session);
        return Ok(());
    }

    let target = session
        .options()
        .target
        .clone()
        .unwrap_or_else(|| DEFAULT_TARGET.to_string());
    session.invoke(&target)
}

/// Change into the definition file's directory; returns the file name to
/// load from there
fn enter_definition_dir(main_file: &Path) -> Result<PathBuf> {
    let dir = match main_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => return Ok(main_file.to_path_buf()),
    };
    env::set_current_dir(&dir).map_err(RaskError::Io)?;
    let name = main_file
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| main_file.to_path_buf());
    Ok(name)
}

/// Print described tasks, rake -T style
fn print_task_list(session: &Session) {
    for task in session.registry().tasks() {
        if let Some(desc) = task.description() {
            println!("rask {:<24} # {}", task.name().cyan().bold(), desc);
        }
    }
}
