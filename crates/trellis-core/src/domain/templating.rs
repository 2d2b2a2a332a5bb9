//! Block directives for file content marked `template: true`.
//!
//! | Directive                                 | Effect                                  |
//! |-------------------------------------------|-----------------------------------------|
//! | `{{if VAR}}…{{endif}}`                    | kept when `VAR` is truthy               |
//! | `{{if VAR}}…{{else}}…{{endif}}`           | one branch or the other                 |
//! | `{{for item in VAR}}…{{endfor}}`          | once per comma-separated item of `VAR`  |
//! | `{{item}}`                                | current item, inside its loop only      |
//!
//! Any other `{{…}}` is left untouched so Handlebars or Mustache files pass
//! through. Directives run before `%VAR%` substitution.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

use super::conditions::is_truthy;
use super::transforms::substitute;
use super::variables::VariableSource;

/// Deepest allowed nesting of `if` and `for` blocks.
pub const MAX_TEMPLATE_DEPTH: usize = 20;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\{\{(?:",
        r"if\s+(?P<cond>[A-Za-z_][A-Za-z0-9_]*)\s*",
        r"|for\s+(?P<item>[a-z_][a-z0-9_]*)\s+in\s+(?P<list>[A-Za-z_][A-Za-z0-9_]*)\s*",
        r"|(?P<kw>else|endif|endfor)",
        r")\}\}",
    ))
    .expect("directive pattern is valid")
});

static TEMPLATE_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(?:if|for\s+[a-z_][a-z0-9_]*\s+in)\s+([A-Z_][A-Z0-9_]*)\s*\}\}")
        .expect("template variable pattern is valid")
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unclosed {{{{if {var}}}}} block")]
    UnclosedIf { var: String },

    #[error("Unclosed {{{{for {item} in {list}}}}} block")]
    UnclosedFor { item: String, list: String },

    #[error("Unexpected {{{{else}}}} without matching {{{{if}}}}")]
    UnexpectedElse,

    #[error("Unexpected {{{{endif}}}} without matching {{{{if}}}}")]
    UnexpectedEndif,

    #[error("Unexpected {{{{endfor}}}} without matching {{{{for}}}}")]
    UnexpectedEndfor,

    #[error("Maximum nesting depth ({max}) exceeded")]
    DepthExceeded { max: usize },
}

enum Token<'t> {
    Text(&'t str),
    If(&'t str),
    For { item: &'t str, list: &'t str },
    Else,
    EndIf,
    EndFor,
}

enum Block<'t> {
    Text(&'t str),
    If {
        var: &'t str,
        then: Vec<Block<'t>>,
        otherwise: Vec<Block<'t>>,
    },
    For {
        item: &'t str,
        list: &'t str,
        body: Vec<Block<'t>>,
    },
}

/// Directive that ends a run of blocks; `None` from [`parse`] means end of text.
enum Closer {
    Else,
    EndIf,
    EndFor,
}

impl Closer {
    fn unexpected(self) -> TemplateError {
        match self {
            Self::Else => TemplateError::UnexpectedElse,
            Self::EndIf => TemplateError::UnexpectedEndif,
            Self::EndFor => TemplateError::UnexpectedEndfor,
        }
    }
}

/// Expand the directives in `text` against `vars`.
///
/// `%VAR%` tokens are left for [`substitute`].
pub fn render_template<V: VariableSource + ?Sized>(
    text: &str,
    vars: &V,
) -> Result<String, TemplateError> {
    if !text.contains("{{") {
        return Ok(text.to_string());
    }
    let mut tokens = tokenize(text).into_iter();
    let blocks = match parse(&mut tokens, 0)? {
        (blocks, None) => blocks,
        (_, Some(closer)) => return Err(closer.unexpected()),
    };

    let mut out = String::with_capacity(text.len());
    render(&blocks, vars, &mut Vec::new(), &mut out);
    Ok(out)
}

/// Inline file content ready to write.
///
/// Directives are expanded first when `template` is set, then `%VAR%`
/// tokens are substituted. A malformed template falls back to plain
/// substitution of the raw text and the error is handed back for logging.
pub fn render_content<V: VariableSource + ?Sized>(
    content: &str,
    template: bool,
    vars: &V,
) -> (String, Option<TemplateError>) {
    if !template {
        return (substitute(content, vars), None);
    }
    match render_template(content, vars) {
        Ok(expanded) => (substitute(&expanded, vars), None),
        Err(e) => (substitute(content, vars), Some(e)),
    }
}

/// Variables named by `if`/`for` directives, bare and uppercase-only.
pub fn extract_template_variables(text: &str) -> BTreeSet<String> {
    TEMPLATE_VAR_RE
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for caps in DIRECTIVE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            tokens.push(Token::Text(&text[last..whole.start()]));
        }
        tokens.push(directive(&caps));
        last = whole.end();
    }
    if last < text.len() {
        tokens.push(Token::Text(&text[last..]));
    }
    tokens
}

fn directive<'t>(caps: &Captures<'t>) -> Token<'t> {
    if let Some(cond) = caps.name("cond") {
        return Token::If(cond.as_str());
    }
    if let (Some(item), Some(list)) = (caps.name("item"), caps.name("list")) {
        return Token::For {
            item: item.as_str(),
            list: list.as_str(),
        };
    }
    match caps.name("kw").map(|m| m.as_str()) {
        Some("else") => Token::Else,
        Some("endif") => Token::EndIf,
        _ => Token::EndFor,
    }
}

type Run<'t> = (Vec<Block<'t>>, Option<Closer>);

fn parse<'t, I>(tokens: &mut I, depth: usize) -> Result<Run<'t>, TemplateError>
where
    I: Iterator<Item = Token<'t>>,
{
    let mut blocks = Vec::new();
    while let Some(token) = tokens.next() {
        match token {
            Token::Text(text) => blocks.push(Block::Text(text)),
            Token::Else => return Ok((blocks, Some(Closer::Else))),
            Token::EndIf => return Ok((blocks, Some(Closer::EndIf))),
            Token::EndFor => return Ok((blocks, Some(Closer::EndFor))),
            Token::If(var) => blocks.push(parse_if(tokens, var, depth + 1)?),
            Token::For { item, list } => blocks.push(parse_for(tokens, item, list, depth + 1)?),
        }
    }
    Ok((blocks, None))
}

fn parse_if<'t, I>(tokens: &mut I, var: &'t str, depth: usize) -> Result<Block<'t>, TemplateError>
where
    I: Iterator<Item = Token<'t>>,
{
    check_depth(depth)?;
    let unclosed = || TemplateError::UnclosedIf {
        var: var.to_string(),
    };
    let (then, otherwise) = match parse(tokens, depth)? {
        (then, Some(Closer::EndIf)) => (then, Vec::new()),
        (then, Some(Closer::Else)) => match parse(tokens, depth)? {
            (otherwise, Some(Closer::EndIf)) => (then, otherwise),
            (_, Some(closer)) => return Err(closer.unexpected()),
            (_, None) => return Err(unclosed()),
        },
        (_, Some(closer)) => return Err(closer.unexpected()),
        (_, None) => return Err(unclosed()),
    };
    Ok(Block::If {
        var,
        then,
        otherwise,
    })
}

fn parse_for<'t, I>(
    tokens: &mut I,
    item: &'t str,
    list: &'t str,
    depth: usize,
) -> Result<Block<'t>, TemplateError>
where
    I: Iterator<Item = Token<'t>>,
{
    check_depth(depth)?;
    match parse(tokens, depth)? {
        (body, Some(Closer::EndFor)) => Ok(Block::For { item, list, body }),
        (_, Some(closer)) => Err(closer.unexpected()),
        (_, None) => Err(TemplateError::UnclosedFor {
            item: item.to_string(),
            list: list.to_string(),
        }),
    }
}

fn check_depth(depth: usize) -> Result<(), TemplateError> {
    if depth > MAX_TEMPLATE_DEPTH {
        return Err(TemplateError::DepthExceeded {
            max: MAX_TEMPLATE_DEPTH,
        });
    }
    Ok(())
}

/// `items` holds the loop bindings in scope, innermost last.
fn render<'t, V: VariableSource + ?Sized>(
    blocks: &[Block<'t>],
    vars: &V,
    items: &mut Vec<(&'t str, String)>,
    out: &mut String,
) {
    for block in blocks {
        match block {
            Block::Text(text) => out.push_str(&bind_items(text, items)),
            Block::If {
                var,
                then,
                otherwise,
            } => {
                let branch = match vars.lookup(var).is_some_and(is_truthy) {
                    true => then,
                    false => otherwise,
                };
                render(branch, vars, items, out);
            }
            Block::For { item, list, body } => {
                for value in list_items(vars.lookup(list)) {
                    items.push((*item, value.to_string()));
                    render(body, vars, items, out);
                    items.pop();
                }
            }
        }
    }
}

fn list_items(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn bind_items<'a>(text: &'a str, items: &[(&str, String)]) -> Cow<'a, str> {
    if items.is_empty() || !text.contains("{{") {
        return Cow::Borrowed(text);
    }
    let mut bound = text.to_string();
    for (name, value) in items.iter().rev() {
        bound = bound.replace(&format!("{{{{{name}}}}}"), value);
    }
    Cow::Owned(bound)
}
