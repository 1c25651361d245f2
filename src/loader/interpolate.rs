//! Variable interpolation for shell command strings
//!
//! Commands in definition files may reference `${var}`. Task-supplied
//! variables (`name`, `source`, `deps`) win; environment variables are the
//! fallback; unknown references are left untouched so the shell can have a
//! say.

use regex::Regex;
use std::collections::HashMap;
use std::env;

/// Interpolate `${var}` references in a command string
pub fn interpolate(s: &str, vars: &HashMap<String, String>) -> String {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

    re.replace_all(s, |caps: &regex::Captures| {
        let var_name = &caps[1];
        if let Some(value) = vars.get(var_name) {
            return value.clone();
        }
        if let Ok(value) = env::var(var_name) {
            return value;
        }
        format!("${{{}}}", var_name)
    })
    .to_string()
}
