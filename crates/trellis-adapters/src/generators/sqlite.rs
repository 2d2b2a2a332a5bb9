//! SQLite databases from declarative tables and raw SQL.
//!
//! Statements run in this order: `<table>` elements from the config, then
//! `<sql>` blocks from the config, then the node content as raw SQL.

use std::sync::LazyLock;

use regex::Regex;
use rusqlite::Connection;
use tracing::debug;
use trellis_core::application::ports::GenerateRequest;

use super::{GeneratorError, attribute, attributes};

static TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<table\b([^>]*?)(?:/>|>(.*?)</table>)").expect("table pattern is valid")
});
static COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<column\b([^>]*?)/?>").expect("column pattern is valid"));
static SQL_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<sql>(.*?)</sql>").expect("sql pattern is valid"));

/// Build a database in a scratch directory and return its bytes.
pub fn generate_sqlite(request: &GenerateRequest<'_>) -> Result<Vec<u8>, GeneratorError> {
    let sql = sql_statements(request.config, request.content);

    let scratch = tempfile::tempdir()?;
    let path = scratch.path().join("generated.db");
    let conn = Connection::open(&path)?;
    if !sql.trim().is_empty() {
        conn.execute_batch(&sql)?;
    }
    conn.close().map_err(|(_, e)| e)?;
    let bytes = std::fs::read(&path)?;
    debug!(bytes = bytes.len(), "sqlite database generated");
    Ok(bytes)
}

/// The full SQL script for a request.
pub fn sql_statements(config: Option<&str>, content: Option<&str>) -> String {
    let mut sql = String::new();
    if let Some(config) = config {
        for caps in TABLE.captures_iter(config) {
            let body = caps.get(2).map_or("", |m| m.as_str());
            if let Some(create) = create_table(&caps[1], body) {
                sql.push_str(&create);
                sql.push('\n');
            }
        }
        for caps in SQL_BLOCK.captures_iter(config) {
            sql.push_str(unwrap_cdata(&caps[1]).trim());
            sql.push('\n');
        }
    }
    if let Some(content) = content.map(|c| unwrap_cdata(c).trim()) {
        if !content.is_empty() {
            sql.push_str(content);
            sql.push('\n');
        }
    }
    sql
}

fn unwrap_cdata(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
        .unwrap_or(text)
}

fn create_table(table_attrs: &str, body: &str) -> Option<String> {
    let attrs = attributes(table_attrs);
    let name = attribute(&attrs, "name")?;
    let columns: Vec<String> = COLUMN
        .captures_iter(body)
        .filter_map(|caps| column_definition(&caps[1]))
        .collect();
    if columns.is_empty() {
        return None;
    }
    Some(format!(
        "CREATE TABLE {} (\n  {}\n);",
        quote_ident(name),
        columns.join(",\n  ")
    ))
}

fn column_definition(raw: &str) -> Option<String> {
    let attrs = attributes(raw);
    let name = attribute(&attrs, "name")?;
    let column_type = attribute(&attrs, "type").unwrap_or("TEXT");

    let mut def = format!("{} {}", quote_ident(name), column_type);
    if flag(raw, &attrs, "primary-key") {
        def.push_str(" PRIMARY KEY");
    }
    if flag(raw, &attrs, "unique") {
        def.push_str(" UNIQUE");
    }
    if flag(raw, &attrs, "not-null") {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = attribute(&attrs, "default") {
        def.push_str(&format!(" DEFAULT '{}'", default.replace('\'', "''")));
    }
    Some(def)
}

/// `key="true"` or a bare `key`.
fn flag(raw: &str, attrs: &[(String, String)], key: &str) -> bool {
    match attribute(attrs, key) {
        Some(value) => value.eq_ignore_ascii_case("true"),
        None => raw
            .split_whitespace()
            .any(|token| token.trim_end_matches('/') == key),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
