//! Naming scopes and namespaces
//!
//! Qualified task names are namespace segments joined by `:`. A scope is the
//! stack of namespace segments active at definition time; referenced names are
//! resolved innermost-scope-first, walking outward to the global scope.

/// Separator between namespace segments in a qualified name
pub const SEPARATOR: &str = ":";

/// Reserved root alias: `rask:name` bypasses scope search and refers to the
/// global `name`.
pub const ROOT_ALIAS: &str = "rask:";

/// A stack of active namespace segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    segments: Vec<String>,
}

impl Scope {
    /// The global (empty) scope
    pub fn root() -> Self {
        Scope::default()
    }

    /// Enter a nested namespace
    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    /// Leave the innermost namespace
    pub fn pop(&mut self) {
        self.segments.pop();
    }

    /// Qualify a name defined in this scope
    pub fn qualify(&self, name: &str) -> String {
        if self.segments.is_empty() {
            return name.to_string();
        }
        let mut qualified = self.segments.join(SEPARATOR);
        qualified.push_str(SEPARATOR);
        qualified.push_str(name);
        qualified
    }

    /// Candidate qualified names for a *referenced* name, in lookup order:
    /// innermost scope concatenation first, each enclosing scope outward,
    /// global last. A `rask:` prefix yields the absolute name only.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        if let Some(absolute) = name.strip_prefix(ROOT_ALIAS) {
            return vec![absolute.to_string()];
        }
        let mut out = Vec::with_capacity(self.segments.len() + 1);
        for depth in (1..=self.segments.len()).rev() {
            let mut candidate = self.segments[..depth].join(SEPARATOR);
            candidate.push_str(SEPARATOR);
            candidate.push_str(name);
            out.push(candidate);
        }
        out.push(name.to_string());
        out
    }
}

/// Handle to a declared namespace
///
/// Returned by namespace declarations so members can be referenced later.
/// This is the only way to reach members of an anonymous namespace.
#[derive(Debug, Clone)]
pub struct Namespace {
    scope: Scope,
}

impl Namespace {
    pub(crate) fn new(scope: Scope) -> Self {
        Namespace { scope }
    }

    /// Fully qualified name of a member task
    pub fn task(&self, name: &str) -> String {
        self.scope.qualify(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify_root() {
        let scope = Scope::root();
        assert_eq!(scope.qualify("build"), "build");
    }

    #[test]
    fn test_qualify_nested() {
        let mut scope = Scope::root();
        scope.push("very");
        scope.push("nested");
        assert_eq!(scope.qualify("run"), "very:nested:run");
    }

    #[test]
    fn test_candidates_order_innermost_first() {
        let mut scope = Scope::root();
        scope.push("a");
        scope.push("b");
        assert_eq!(scope.candidates("run"), vec!["a:b:run", "a:run", "run"]);
    }

    #[test]
    fn test_candidates_root_alias_is_absolute() {
        let mut scope = Scope::root();
        scope.push("very");
        scope.push("nested");
        assert_eq!(scope.candidates("rask:copy"), vec!["copy"]);
    }

    #[test]
    fn test_candidates_partially_qualified() {
        let mut scope = Scope::root();
        scope.push("b");
        assert_eq!(scope.candidates("a:run"), vec!["b:a:run", "a:run"]);
    }

    #[test]
    fn test_namespace_handle() {
        let mut scope = Scope::root();
        scope.push("_anon_1");
        let ns = Namespace::new(scope);
        assert_eq!(ns.task("copy"), "_anon_1:copy");
    }
}
