//! Per-variable validation rules.
//!
//! User-supplied patterns are screened before compilation. The screen is a
//! static heuristic: quantified groups that themselves contain a
//! quantifier, quantified groups containing alternation, and
//! backreferences to an earlier quantified group are refused. Values are
//! additionally truncated before matching.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::variables::VariableSource;

pub const DEFAULT_MAX_PATTERN_LENGTH: usize = 1_000;
pub const DEFAULT_MAX_INPUT_LENGTH: usize = 10_000;

/// Constraints on one variable's value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(default)]
    pub required: bool,
    #[serde(default, alias = "min_length", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, alias = "max_length", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub variable_name: String,
    pub message: String,
}

/// Bounds applied while checking patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternLimits {
    pub max_pattern_length: usize,
    pub max_input_length: usize,
}

impl Default for PatternLimits {
    fn default() -> Self {
        Self {
            max_pattern_length: DEFAULT_MAX_PATTERN_LENGTH,
            max_input_length: DEFAULT_MAX_INPUT_LENGTH,
        }
    }
}

/// Check every rule against the supplied values.
///
/// Rules are visited in name order. Errors are collected, never raised.
pub fn validate_variables<V>(
    values: &V,
    rules: &BTreeMap<String, ValidationRule>,
    limits: PatternLimits,
) -> Vec<ValidationError>
where
    V: VariableSource + ?Sized,
{
    let mut errors = Vec::new();

    for (key, rule) in rules {
        let display = key.trim_matches('%').to_string();
        let mut fail = |message: String| {
            errors.push(ValidationError {
                variable_name: display.clone(),
                message,
            })
        };

        if let (Some(min), Some(max)) = (rule.min_length, rule.max_length) {
            if min > max {
                fail(format!(
                    "Invalid rule for {display}: minimum length {min} exceeds maximum {max}"
                ));
                continue;
            }
        }

        let value = values.lookup(key).unwrap_or("");
        if value.trim().is_empty() {
            if rule.required {
                fail(format!("{display} is required"));
            }
            continue;
        }

        let length = value.chars().count();
        if let Some(min) = rule.min_length.filter(|min| length < *min) {
            fail(format!("{display} must be at least {min} characters"));
        }
        if let Some(max) = rule.max_length.filter(|max| length > *max) {
            fail(format!("{display} must be at most {max} characters"));
        }

        if let Some(pattern) = rule.pattern.as_deref() {
            match compile_pattern(pattern, limits.max_pattern_length) {
                Ok(re) => {
                    if !re.is_match(truncate_chars(value, limits.max_input_length)) {
                        fail(format!("{display} does not match required pattern"));
                    }
                }
                Err(DomainError::InvalidPattern { reason, .. }) => {
                    fail(format!("Invalid regex pattern for {display}: {reason}"));
                }
                Err(other) => fail(other.to_string()),
            }
        }
    }

    errors
}

/// Screen and compile a user-supplied pattern.
pub fn compile_pattern(pattern: &str, max_length: usize) -> Result<Regex, DomainError> {
    check_pattern_safety(pattern, max_length)?;
    Regex::new(pattern).map_err(|e| DomainError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Reject over-long or catastrophic-backtracking-shaped patterns.
pub fn check_pattern_safety(pattern: &str, max_length: usize) -> Result<(), DomainError> {
    let refuse = |reason: String| DomainError::InvalidPattern {
        pattern: pattern.chars().take(80).collect(),
        reason,
    };
    if pattern.len() > max_length {
        return Err(refuse(format!(
            "pattern exceeds {max_length} characters"
        )));
    }
    if let Some(shape) = dangerous_shape(pattern) {
        return Err(refuse(format!("{shape}; rejected for security reasons")));
    }
    Ok(())
}

#[derive(Default)]
struct Group {
    has_quantifier: bool,
    has_alternation: bool,
}

/// Scan a pattern for backtracking hazards. Escapes and character classes
/// are skipped as atoms.
fn dangerous_shape(pattern: &str) -> Option<&'static str> {
    let mut chars = pattern.chars().peekable();
    let mut stack: Vec<Group> = Vec::new();
    let mut quantified_group_seen = false;

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    if next.is_ascii_digit() && next != '0' && quantified_group_seen {
                        return Some("backreference to a quantified group");
                    }
                }
            }
            '[' => skip_class(&mut chars),
            '(' => {
                if chars.peek() == Some(&'?') {
                    skip_group_prefix(&mut chars);
                }
                stack.push(Group::default());
            }
            ')' => {
                let group = stack.pop().unwrap_or_default();
                let quantified = is_unbounded_quantifier(&mut chars);
                if quantified {
                    if group.has_quantifier {
                        return Some("nested quantifiers");
                    }
                    if group.has_alternation {
                        return Some("quantified alternation");
                    }
                    quantified_group_seen = true;
                }
                if let Some(parent) = stack.last_mut() {
                    parent.has_quantifier |= group.has_quantifier || quantified;
                    parent.has_alternation |= group.has_alternation;
                }
            }
            '|' => {
                if let Some(top) = stack.last_mut() {
                    top.has_alternation = true;
                }
            }
            '*' | '+' => {
                if let Some(top) = stack.last_mut() {
                    top.has_quantifier = true;
                }
            }
            '{' => {
                let (unbounded, _) = read_braces(&mut chars);
                if unbounded {
                    if let Some(top) = stack.last_mut() {
                        top.has_quantifier = true;
                    }
                }
            }
            _ => {}
        }
    }
    None
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

fn skip_class(chars: &mut Chars<'_>) {
    // A `]` immediately after `[` or `[^` is literal.
    if chars.peek() == Some(&'^') {
        chars.next();
    }
    if chars.peek() == Some(&']') {
        chars.next();
    }
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            ']' => return,
            _ => {}
        }
    }
}

fn skip_group_prefix(chars: &mut Chars<'_>) {
    chars.next(); // '?'
    match chars.next() {
        Some(':' | '=' | '!') | None => {}
        Some('P') => {
            for c in chars.by_ref() {
                if c == '>' {
                    break;
                }
            }
        }
        Some('<') => {
            if matches!(chars.peek(), Some('=' | '!')) {
                chars.next();
            } else {
                for c in chars.by_ref() {
                    if c == '>' {
                        break;
                    }
                }
            }
        }
        Some(_) => {
            while let Some(&c) = chars.peek() {
                if c == ')' {
                    break;
                }
                chars.next();
                if c == ':' {
                    break;
                }
            }
        }
    }
}

/// Consume a quantifier following a group, reporting whether it is `*`,
/// `+` or an open-ended/large `{n,m}`.
fn is_unbounded_quantifier(chars: &mut Chars<'_>) -> bool {
    match chars.peek() {
        Some('*' | '+') => {
            chars.next();
            true
        }
        Some('{') => {
            chars.next();
            read_braces(chars).0
        }
        _ => false,
    }
}

/// Read the rest of a `{...}` counted repetition. Returns whether it can
/// repeat more than once and the raw body.
fn read_braces(chars: &mut Chars<'_>) -> (bool, String) {
    let mut body = String::new();
    for c in chars.by_ref() {
        if c == '}' {
            break;
        }
        body.push(c);
    }
    let unbounded = match body.split_once(',') {
        Some((_, "")) => true,
        Some((_, max)) => max.trim().parse::<u32>().map_or(false, |m| m > 1),
        None => body.trim().parse::<u32>().map_or(false, |n| n > 1),
    };
    (unbounded, body)
}

fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn rules(pairs: Vec<(&str, ValidationRule)>) -> BTreeMap<String, ValidationRule> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn messages(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn required_empty_value_reports_once() {
        let r = rules(vec![(
            "%NAME%",
            ValidationRule {
                required: true,
                min_length: Some(3),
                pattern: Some("^x".into()),
                ..Default::default()
            },
        )]);
        let errors = validate_variables(&values(&[("%NAME%", "  ")]), &r, PatternLimits::default());
        assert_eq!(messages(&errors), vec!["NAME is required"]);
        assert_eq!(errors[0].variable_name, "NAME");
    }

    #[test]
    fn empty_optional_value_skips_checks() {
        let r = rules(vec![(
            "NAME",
            ValidationRule {
                min_length: Some(3),
                ..Default::default()
            },
        )]);
        assert!(validate_variables(&values(&[]), &r, PatternLimits::default()).is_empty());
    }

    #[test]
    fn length_bounds_count_characters() {
        let r = rules(vec![(
            "NAME",
            ValidationRule {
                min_length: Some(2),
                max_length: Some(3),
                ..Default::default()
            },
        )]);
        let limits = PatternLimits::default();
        assert_eq!(
            messages(&validate_variables(&values(&[("NAME", "a")]), &r, limits)),
            vec!["NAME must be at least 2 characters"]
        );
        assert_eq!(
            messages(&validate_variables(&values(&[("NAME", "abcd")]), &r, limits)),
            vec!["NAME must be at most 3 characters"]
        );
        assert!(validate_variables(&values(&[("NAME", "äöü")]), &r, limits).is_empty());
    }

    #[test]
    fn value_lookup_falls_back_to_delimited_key() {
        let r = rules(vec![(
            "NAME",
            ValidationRule {
                required: true,
                ..Default::default()
            },
        )]);
        let errors = validate_variables(&values(&[("%NAME%", "ok")]), &r, PatternLimits::default());
        assert!(errors.is_empty());
    }

    #[test]
    fn pattern_mismatch_and_invalid_pattern() {
        let limits = PatternLimits::default();
        let r = rules(vec![(
            "NAME",
            ValidationRule {
                pattern: Some("^[a-z]+$".into()),
                ..Default::default()
            },
        )]);
        assert_eq!(
            messages(&validate_variables(&values(&[("NAME", "ABC")]), &r, limits)),
            vec!["NAME does not match required pattern"]
        );

        let r = rules(vec![(
            "NAME",
            ValidationRule {
                pattern: Some("[unclosed".into()),
                ..Default::default()
            },
        )]);
        let errors = validate_variables(&values(&[("NAME", "x")]), &r, limits);
        assert!(errors[0].message.starts_with("Invalid regex pattern for NAME"));
    }

    #[test]
    fn redos_patterns_are_rejected() {
        for pattern in ["(a+)+", "(a*)*", "(\\w+\\s?)*", "(a|aa)+", "(?:a|b)*", "((a+))+", "(a+){2,}", "(a)+\\1"] {
            let err = check_pattern_safety(pattern, DEFAULT_MAX_PATTERN_LENGTH).unwrap_err();
            assert!(
                err.to_string().contains("rejected for security reasons"),
                "{pattern}: {err}"
            );
        }
    }

    #[test]
    fn safe_patterns_pass_the_screen() {
        for pattern in ["^[a-z]+$", "(ab)+", "(a+)?", "[(+)]+", "\\(a+\\)+", "(?i)^[a-z-]+$", "(a){3}", "^(?P<x>a+)$"] {
            assert!(
                check_pattern_safety(pattern, DEFAULT_MAX_PATTERN_LENGTH).is_ok(),
                "{pattern} was rejected"
            );
        }
    }

    #[test]
    fn redos_rule_surfaces_as_validation_error() {
        let r = rules(vec![(
            "NAME",
            ValidationRule {
                pattern: Some("(a+)+".into()),
                ..Default::default()
            },
        )]);
        let errors = validate_variables(&values(&[("NAME", "aaaa")]), &r, PatternLimits::default());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("rejected for security reasons"));
    }

    #[test]
    fn over_long_patterns_are_rejected() {
        let pattern = "a".repeat(20);
        assert!(check_pattern_safety(&pattern, 10).is_err());
    }

    #[test]
    fn inverted_bounds_are_an_invalid_rule() {
        let r = rules(vec![(
            "NAME",
            ValidationRule {
                min_length: Some(5),
                max_length: Some(2),
                ..Default::default()
            },
        )]);
        let errors = validate_variables(&values(&[("NAME", "abc")]), &r, PatternLimits::default());
        assert!(errors[0].message.starts_with("Invalid rule for NAME"));
    }

    #[test]
    fn matching_sees_truncated_input() {
        let limits = PatternLimits {
            max_pattern_length: 100,
            max_input_length: 3,
        };
        let r = rules(vec![(
            "NAME",
            ValidationRule {
                pattern: Some("^abc$".into()),
                ..Default::default()
            },
        )]);
        assert!(validate_variables(&values(&[("NAME", "abcdef")]), &r, limits).is_empty());
    }

    #[test]
    fn rules_deserialize_from_camel_case() {
        let rule: ValidationRule =
            serde_json::from_str(r#"{"required":true,"minLength":2,"max_length":4}"#).unwrap();
        assert!(rule.required);
        assert_eq!(rule.min_length, Some(2));
        assert_eq!(rule.max_length, Some(4));
    }
}
