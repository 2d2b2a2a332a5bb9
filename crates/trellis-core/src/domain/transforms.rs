//! `%NAME%` token substitution and value transforms.
//!
//! Grammar: `%NAME%`, `%NAME:transform%`, `%NAME:t1|t2(arg)%`. Substitution
//! is a single pass over the input; replaced values are never rescanned.
//!
//! | Transform                      | Aliases     | Result                    |
//! |--------------------------------|-------------|---------------------------|
//! | `uppercase` / `lowercase`      | `upper`/`lower` | case folding          |
//! | `camelCase` / `PascalCase`     | `camel`/`pascal` | `myVar` / `MyVar`    |
//! | `kebab-case` / `snake_case`    | `kebab`/`snake` | `my-var` / `my_var`   |
//! | `plural`                       | `pluralize` | English plural heuristic  |
//! | `length`                       | `len`       | character count           |
//! | `format(pattern)`              |             | date formatting           |
//!
//! Unknown variables stay verbatim; unknown transforms are no-ops.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use cruet::case::{
    camel::to_camel_case, kebab::to_kebab_case, pascal::to_pascal_case, snake::to_snake_case,
};
use regex::{Captures, Regex};

use super::variables::VariableSource;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"%([A-Za-z_][A-Za-z0-9_]*)(?::([A-Za-z_-]+(?:\([^)%]*\))?(?:\|[A-Za-z_-]+(?:\([^)%]*\))?)*))?%",
    )
    .expect("token pattern is valid")
});

static USER_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%([A-Z][A-Z0-9_]*)(?::[^%]*)?%").expect("variable pattern is valid")
});

/// Replace every known `%NAME[:transforms]%` token in `text`.
pub fn substitute<V: VariableSource + ?Sized>(text: &str, vars: &V) -> String {
    substitute_with(text, vars, |s| Cow::Borrowed(s))
}

/// Like [`substitute`], passing each final value through `escape` before it
/// is spliced in. Used for XML members of archives.
pub fn substitute_with<V, E>(text: &str, vars: &V, escape: E) -> String
where
    V: VariableSource + ?Sized,
    E: for<'a> Fn(&'a str) -> Cow<'a, str>,
{
    if !text.contains('%') {
        return text.to_string();
    }
    TOKEN_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let whole = &caps[0];
            let Some(value) = vars.lookup(&caps[1]) else {
                return whole.to_string();
            };
            let value = match caps.get(2) {
                Some(chain) => apply_chain(value, chain.as_str()),
                None => value.to_string(),
            };
            escape(&value).into_owned()
        })
        .into_owned()
}

/// `true` when `text` contains at least one substitution token shape.
pub fn has_tokens(text: &str) -> bool {
    TOKEN_RE.is_match(text)
}

/// User-defined variable names referenced in `text`.
///
/// Only uppercase-leading identifiers count; lowercase loop counters such
/// as `%i%` are excluded.
pub fn extract_variables(text: &str) -> BTreeSet<String> {
    USER_VAR_RE
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

fn apply_chain(value: &str, chain: &str) -> String {
    split_chain(chain)
        .into_iter()
        .fold(value.to_string(), |acc, t| apply_transform(&acc, t))
}

/// Split `a|b(x|y)|c` on pipes outside parentheses.
fn split_chain(chain: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in chain.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => {
                parts.push(&chain[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&chain[start..]);
    parts
}

/// Apply one transform (with optional `(arg)`) to a value.
pub fn apply_transform(value: &str, transform: &str) -> String {
    let (name, arg) = match transform.split_once('(') {
        Some((name, rest)) => (name, Some(rest.trim_end_matches(')'))),
        None => (transform, None),
    };

    match name.to_ascii_lowercase().as_str() {
        "uppercase" | "upper" => value.to_uppercase(),
        "lowercase" | "lower" => value.to_lowercase(),
        "camelcase" | "camel" => to_camel_case(value),
        "pascalcase" | "pascal" => to_pascal_case(value),
        "kebab-case" | "kebabcase" | "kebab" => to_kebab_case(value),
        "snake_case" | "snakecase" | "snake" => to_snake_case(value),
        "plural" | "pluralize" => pluralize(value),
        "length" | "len" => value.chars().count().to_string(),
        "format" => format_date(value, arg.unwrap_or("iso")),
        _ => value.to_string(),
    }
}

/// Simple English pluralisation.
///
/// `s/x/z/ch/sh` take `es`, consonant + `y` becomes `ies`, everything else
/// takes `s`.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{word}es");
    }
    let mut chars = lower.chars().rev();
    if let (Some('y'), Some(before)) = (chars.next(), chars.next()) {
        if !"aeiou".contains(before) {
            let stem = &word[..word.len() - 1];
            return format!("{stem}ies");
        }
    }
    format!("{word}s")
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Format a date value with a `YYYY/YY/MMMM/MMM/MM/DD/D` pattern.
///
/// The value may be `today`, `now`, `YYYY-MM-DD`, `MM/DD/YYYY` or
/// `DD/MM/YYYY`. Unparsable values are returned unchanged.
pub fn format_date(value: &str, pattern: &str) -> String {
    let Some(date) = parse_date(value) else {
        return value.to_string();
    };
    let pattern = match pattern.trim().to_ascii_lowercase().as_str() {
        "iso" => "YYYY-MM-DD",
        "us" => "MM/DD/YYYY",
        "eu" => "DD/MM/YYYY",
        _ => pattern.trim(),
    };
    render_date(date, pattern)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("today") || value.eq_ignore_ascii_case("now") {
        return Some(Local::now().date_naive());
    }
    ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

fn render_date(date: NaiveDate, pattern: &str) -> String {
    use chrono::Datelike;

    let month_name = MONTH_NAMES[date.month0() as usize];
    // Longest tokens first so `MMMM` is never read as `MM` + `MM`.
    let tokens: [(&str, String); 7] = [
        ("YYYY", format!("{:04}", date.year())),
        ("MMMM", month_name.to_string()),
        ("MMM", month_name[..3].to_string()),
        ("YY", format!("{:02}", date.year().rem_euclid(100))),
        ("MM", format!("{:02}", date.month())),
        ("DD", format!("{:02}", date.day())),
        ("D", date.day().to_string()),
    ];

    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    'scan: while !rest.is_empty() {
        for (token, replacement) in &tokens {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            out.push(ch);
        }
        rest = chars.as_str();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn plain_substitution() {
        let v = vars(&[("%PROJ%", "demo")]);
        assert_eq!(substitute("Hello %PROJ%", &v), "Hello demo");
    }

    #[test]
    fn unknown_variables_stay_verbatim() {
        let v = vars(&[("%A%", "x")]);
        assert_eq!(substitute("%A%-%B%", &v), "x-%B%");
        assert_eq!(substitute("50% off", &v), "50% off");
    }

    #[test]
    fn uppercase_transform() {
        let v = vars(&[("%NAME%", "abc")]);
        assert_eq!(substitute("%NAME:uppercase%", &v), "ABC");
    }

    #[test]
    fn chained_transforms() {
        let v = vars(&[("%NAME%", "my var")]);
        assert_eq!(substitute("%NAME:pascalcase|length%", &v), "5");
        assert_eq!(substitute("%NAME:PascalCase%", &v), "MyVar");
        assert_eq!(substitute("%NAME:camelCase%", &v), "myVar");
        assert_eq!(substitute("%NAME:kebab-case%", &v), "my-var");
        assert_eq!(substitute("%NAME:snake_case%", &v), "my_var");
    }

    #[test]
    fn unknown_transform_is_a_noop() {
        let v = vars(&[("%NAME%", "abc")]);
        assert_eq!(substitute("%NAME:frobnicate%", &v), "abc");
        assert_eq!(substitute("%NAME:frobnicate|upper%", &v), "ABC");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let v = vars(&[("%A%", "%B%"), ("%B%", "boom")]);
        assert_eq!(substitute("%A%", &v), "%B%");
    }

    #[test]
    fn lowercase_loop_tokens_resolve() {
        let v = vars(&[("%I%", "2")]);
        assert_eq!(substitute("item-%i%.txt", &v), "item-2.txt");
    }

    #[test]
    fn pluralization_rules() {
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("bus"), "buses");
        assert_eq!(pluralize("church"), "churches");
        assert_eq!(pluralize("dish"), "dishes");
        assert_eq!(pluralize("city"), "cities");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize(""), "");
    }

    #[test]
    fn date_formatting() {
        assert_eq!(format_date("2024-03-07", "YYYY/MM/DD"), "2024/03/07");
        assert_eq!(format_date("2024-03-07", "D MMMM YYYY"), "7 March 2024");
        assert_eq!(format_date("2024-03-07", "MMM YY"), "Mar 24");
        assert_eq!(format_date("2024-03-07", "us"), "03/07/2024");
        assert_eq!(format_date("2024-03-07", "eu"), "07/03/2024");
        assert_eq!(format_date("not a date", "YYYY"), "not a date");
    }

    #[test]
    fn format_transform_with_argument() {
        let v = vars(&[("%DATE%", "2024-12-25")]);
        assert_eq!(substitute("%DATE:format(DD.MM.YYYY)%", &v), "25.12.2024");
    }

    #[test]
    fn chain_split_respects_parentheses() {
        assert_eq!(split_chain("upper|format(a|b)|len"), vec!["upper", "format(a|b)", "len"]);
    }

    #[test]
    fn extraction_ignores_loop_counters() {
        let found = extract_variables("%PROJ%/%i%/%NAME:upper%/%i_1%");
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["NAME", "PROJ"]);
    }

    #[test]
    fn escaping_applies_to_values_only() {
        let v = vars(&[("%A%", "<b>")]);
        let out = substitute_with("&amp; %A%", &v, |s| Cow::Owned(s.replace('<', "&lt;").replace('>', "&gt;")));
        assert_eq!(out, "&amp; &lt;b&gt;");
    }
}
