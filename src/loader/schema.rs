//! YAML definition-file schema
//!
//! This module defines the data structures that represent a rask.yml
//! definition file. Namespace bodies are recursive: a namespace contains the
//! same sections as a top-level file.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// A parsed definition file (or namespace body)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DefFile {
    /// Plain tasks keyed by name
    #[serde(default)]
    pub tasks: HashMap<String, Option<TaskDef>>,

    /// File tasks keyed by target path
    #[serde(default, rename = "file")]
    pub files: HashMap<String, Option<TaskDef>>,

    /// Multitasks keyed by name
    #[serde(default, rename = "multitask")]
    pub multitasks: HashMap<String, Option<TaskDef>>,

    /// Suffix rules, in registration order (later entries win ties)
    #[serde(default)]
    pub rules: Vec<RuleDef>,

    /// Nested namespaces
    #[serde(default)]
    pub namespaces: HashMap<String, DefFile>,

    /// Definition files to evaluate after this one finishes
    #[serde(default)]
    pub imports: Vec<String>,
}

/// A task entry
///
/// A bare key (`build:` with no body) is a valid definition with no
/// prerequisites and no actions, hence the `Option<TaskDef>` map values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TaskDef {
    /// Description shown by task listings; wins over an attached comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    /// Prerequisite names; string or sequence
    #[serde(default, deserialize_with = "string_or_seq")]
    pub deps: Vec<String>,

    /// Shell commands, each becoming one action; string or sequence
    #[serde(default, deserialize_with = "string_or_seq")]
    pub run: Vec<String>,
}

/// A suffix rule entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleDef {
    /// Target suffix, e.g. `.o`
    pub target: String,

    /// Source suffix, e.g. `.c`
    pub source: String,

    /// Shell commands for the synthesized file task
    #[serde(default, deserialize_with = "string_or_seq")]
    pub run: Vec<String>,
}

/// Accept either a single string or a sequence of strings
fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(one) => vec![one],
        OneOrMany::Many(many) => many,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_file() {
        let yaml = r#"
tasks:
  build:
    deps: [compile]
    run: echo done
"#;
        let def: DefFile = serde_yaml::from_str(yaml).unwrap();
        let build = def.tasks.get("build").unwrap().as_ref().unwrap();
        assert_eq!(build.deps, vec!["compile"]);
        assert_eq!(build.run, vec!["echo done"]);
    }

    #[test]
    fn test_bare_task_key() {
        let yaml = r#"
tasks:
  default:
"#;
        let def: DefFile = serde_yaml::from_str(yaml).unwrap();
        assert!(def.tasks.get("default").unwrap().is_none());
    }

    #[test]
    fn test_string_or_seq_forms() {
        let yaml = r#"
tasks:
  one:
    deps: single
    run:
      - first
      - second
"#;
        let def: DefFile = serde_yaml::from_str(yaml).unwrap();
        let one = def.tasks.get("one").unwrap().as_ref().unwrap();
        assert_eq!(one.deps, vec!["single"]);
        assert_eq!(one.run, vec!["first", "second"]);
    }

    #[test]
    fn test_nested_namespaces() {
        let yaml = r#"
namespaces:
  very:
    namespaces:
      nested:
        tasks:
          run: {deps: ["rask:copy"]}
"#;
        let def: DefFile = serde_yaml::from_str(yaml).unwrap();
        let very = def.namespaces.get("very").unwrap();
        let nested = very.namespaces.get("nested").unwrap();
        assert!(nested.tasks.contains_key("run"));
    }

    #[test]
    fn test_rules_and_imports() {
        let yaml = r#"
rules:
  - target: .app
    source: .scpt
    run: cp ${source} ${name}
imports:
  - extra.yml
"#;
        let def: DefFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.rules.len(), 1);
        assert_eq!(def.rules[0].target, ".app");
        assert_eq!(def.imports, vec!["extra.yml"]);
    }
}
