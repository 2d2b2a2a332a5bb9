//! Variable environments.
//!
//! Keys are canonical: `%NAME%`, uppercase. A [`VariableScope`] is a chain
//! of overlays; a child scope borrows its parent and only ever adds its own
//! bindings, so loop counters bound inside a `repeat` disappear with the
//! child and never reach siblings.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Local, NaiveDate};

/// Canonical key for a variable name: `name`, `NAME` and `%name%` all map
/// to `%NAME%`.
pub fn canonical_key(name: &str) -> String {
    let bare = name.trim().trim_matches('%');
    format!("%{}%", bare.to_uppercase())
}

/// Bare variable name without delimiters, uppercased.
pub fn bare_name(name: &str) -> String {
    name.trim().trim_matches('%').to_uppercase()
}

/// Anything variables can be looked up in.
pub trait VariableSource {
    /// Look up a variable by name, in any case, with or without `%`.
    fn lookup(&self, name: &str) -> Option<&str>;
}

/// A layered, copy-on-write variable environment.
#[derive(Debug, Default)]
pub struct VariableScope<'p> {
    parent: Option<&'p VariableScope<'p>>,
    bindings: HashMap<String, String>,
}

impl VariableScope<'static> {
    /// Empty root scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Root scope from caller-supplied pairs. Keys are canonicalised.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut scope = Self::new();
        for (k, v) in pairs {
            scope.bind(k.as_ref(), v);
        }
        scope
    }

    /// Root scope seeded with the built-in variables, then overridden by the
    /// caller's own values.
    pub fn with_builtins<I, K, V>(project_name: Option<&str>, user: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut scope = Self::new();
        for (k, v) in builtin_variables(Local::now().date_naive(), project_name) {
            scope.bind(&k, v);
        }
        for (k, v) in user {
            scope.bind(k.as_ref(), v);
        }
        scope
    }
}

impl<'p> VariableScope<'p> {
    /// Derive an empty overlay on top of this scope.
    pub fn child(&'p self) -> VariableScope<'p> {
        VariableScope {
            parent: Some(self),
            bindings: HashMap::new(),
        }
    }

    /// Bind a variable in this layer only.
    pub fn bind(&mut self, name: &str, value: impl Into<String>) {
        self.bindings.insert(canonical_key(name), value.into());
    }

    /// Builder-style [`Self::bind`].
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.bind(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let key = canonical_key(name);
        self.get_canonical(&key)
    }

    fn get_canonical(&self, key: &str) -> Option<&str> {
        match self.bindings.get(key) {
            Some(value) => Some(value.as_str()),
            None => self.parent.and_then(|p| p.get_canonical(key)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All visible bindings, inner layers shadowing outer ones.
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut map = self
            .parent
            .map(|p| p.flatten())
            .unwrap_or_default();
        for (k, v) in &self.bindings {
            map.insert(k.clone(), v.clone());
        }
        map
    }
}

impl VariableSource for VariableScope<'_> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

impl VariableSource for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        lookup_in_pairs(self.iter(), name, |k| self.get(k))
    }
}

impl VariableSource for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        lookup_in_pairs(self.iter(), name, |k| self.get(k))
    }
}

fn lookup_in_pairs<'a, I, F>(mut pairs: I, name: &str, direct: F) -> Option<&'a str>
where
    I: Iterator<Item = (&'a String, &'a String)>,
    F: Fn(&str) -> Option<&'a String>,
{
    let key = canonical_key(name);
    let bare = bare_name(name);
    if let Some(v) = direct(&key).or_else(|| direct(&bare)) {
        return Some(v.as_str());
    }
    pairs
        .find(|(k, _)| bare_name(k) == bare)
        .map(|(_, v)| v.as_str())
}

/// Built-in variables for a given date.
///
/// `%PROJECT_NAME%` is only seeded when a project name is known.
pub fn builtin_variables(today: NaiveDate, project_name: Option<&str>) -> Vec<(String, String)> {
    let mut vars = vec![
        ("%DATE%".to_string(), today.format("%Y-%m-%d").to_string()),
        ("%YEAR%".to_string(), today.year().to_string()),
        ("%MONTH%".to_string(), format!("{:02}", today.month())),
        ("%DAY%".to_string(), format!("{:02}", today.day())),
    ];
    if let Some(name) = project_name {
        vars.push(("%PROJECT_NAME%".to_string(), name.to_string()));
    }
    vars
}

/// Names of the built-in variables, without delimiters.
pub const BUILTIN_NAMES: &[&str] = &["DATE", "YEAR", "MONTH", "DAY", "PROJECT_NAME"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_keys() {
        assert_eq!(canonical_key("name"), "%NAME%");
        assert_eq!(canonical_key("%Name%"), "%NAME%");
        assert_eq!(canonical_key(" PROJ "), "%PROJ%");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let scope = VariableScope::from_pairs([("%PROJ%", "demo")]);
        assert_eq!(scope.get("proj"), Some("demo"));
        assert_eq!(scope.get("%PROJ%"), Some("demo"));
        assert_eq!(scope.get("missing"), None);
    }

    #[test]
    fn child_overlay_does_not_leak_into_parent() {
        let root = VariableScope::from_pairs([("A", "1")]);
        {
            let child = root.child().with("i", "0").with("A", "shadowed");
            assert_eq!(child.get("I"), Some("0"));
            assert_eq!(child.get("A"), Some("shadowed"));
        }
        assert_eq!(root.get("I"), None);
        assert_eq!(root.get("A"), Some("1"));
    }

    #[test]
    fn user_values_override_builtins() {
        let scope = VariableScope::with_builtins(Some("demo"), [("YEAR", "1999")]);
        assert_eq!(scope.get("YEAR"), Some("1999"));
        assert_eq!(scope.get("PROJECT_NAME"), Some("demo"));
        assert!(scope.contains("DATE"));
    }

    #[test]
    fn builtins_are_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let vars: HashMap<_, _> = builtin_variables(date, None).into_iter().collect();
        assert_eq!(vars["%DATE%"], "2024-03-07");
        assert_eq!(vars["%MONTH%"], "03");
        assert_eq!(vars["%DAY%"], "07");
        assert!(!vars.contains_key("%PROJECT_NAME%"));
    }

    #[test]
    fn map_sources_accept_raw_and_delimited_keys() {
        let mut map = HashMap::new();
        map.insert("%NAME%".to_string(), "abc".to_string());
        map.insert("other".to_string(), "x".to_string());
        assert_eq!(map.lookup("name"), Some("abc"));
        assert_eq!(map.lookup("OTHER"), Some("x"));
    }

    #[test]
    fn flatten_prefers_inner_bindings() {
        let root = VariableScope::from_pairs([("A", "1"), ("B", "2")]);
        let child = root.child().with("B", "3");
        let flat = child.flatten();
        assert_eq!(flat["%A%"], "1");
        assert_eq!(flat["%B%"], "3");
    }
}
