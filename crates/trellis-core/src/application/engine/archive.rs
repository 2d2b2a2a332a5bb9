//! Variable substitution inside downloaded container formats.
//!
//! Office documents, OpenDocument files, EPUBs and plain ZIPs are rebuilt
//! member by member. Text-bearing members get a substitution pass; every
//! other member is copied as-is with its original compression method, so
//! an uncompressed `mimetype` entry stays uncompressed.
//!
//! Word processors often split one `%NAME%` across several text runs
//! (`<w:t>%NA</w:t>…<w:t>ME%</w:t>`). Runs are merged forward until the
//! token is complete, substituted once, and the consumed runs are emptied.

use std::borrow::Cow;
use std::io::{Cursor, Read, Write};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::domain::{VariableScope, substitute, substitute_with};

/// Largest total uncompressed size accepted when rebuilding an archive.
pub const MAX_EXPANDED_BYTES: u64 = 256 * 1024 * 1024;

/// Runs merged at most when chasing a split token.
const MAX_RUN_MERGE: usize = 16;

static TEXT_RUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(<(?:w:t|a:t|t)(?:\s[^>]*)?>)([^<]*)(</(?:w:t|a:t|t)>)")
        .expect("text run pattern is valid")
});

// Text ending in an unterminated `%NAME[:transforms]` fragment.
static DANGLING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%[A-Za-z_][A-Za-z0-9_]*(?::[A-Za-z0-9_|()\-]*)?$|%$")
        .expect("dangling token pattern is valid")
});

static COMPLETE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%[A-Za-z_][A-Za-z0-9_]*(?::[^%<]*)?%").expect("token pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.docx`, `.xlsx`, `.pptx` and their macro-enabled variants.
    Ooxml,
    /// `.odt`, `.ods`, `.odp`.
    OpenDocument,
    Epub,
    Zip,
}

impl ArchiveKind {
    /// Detect by file extension.
    pub fn detect(file_name: &str) -> Option<Self> {
        let ext = extension(file_name)?;
        match ext.as_str() {
            "docx" | "docm" | "xlsx" | "xlsm" | "pptx" | "pptm" => Some(Self::Ooxml),
            "odt" | "ods" | "odp" => Some(Self::OpenDocument),
            "epub" => Some(Self::Epub),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    /// Whether a member of this archive carries user-visible text.
    fn is_text_member(self, member: &str) -> bool {
        match self {
            Self::Ooxml => {
                member.ends_with(".xml")
                    && (member.starts_with("word/")
                        || member == "xl/sharedStrings.xml"
                        || member.starts_with("xl/worksheets/")
                        || member.starts_with("ppt/slides/"))
            }
            Self::OpenDocument => matches!(member, "content.xml" | "styles.xml"),
            Self::Epub => matches!(
                extension(member).as_deref(),
                Some("xhtml" | "html" | "htm" | "xml" | "opf" | "ncx" | "css")
            ),
            Self::Zip => matches!(
                extension(member).as_deref(),
                Some(
                    "txt" | "md" | "markdown" | "json" | "yaml" | "yml" | "toml" | "xml"
                        | "html" | "htm" | "css" | "js" | "ts" | "csv" | "ini" | "cfg"
                        | "conf" | "env" | "sh" | "py" | "rs" | "go" | "java" | "svg"
                )
            ),
        }
    }
}

fn extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

fn is_markup(member: &str) -> bool {
    matches!(
        extension(member).as_deref(),
        Some("xml" | "xhtml" | "html" | "htm" | "opf" | "ncx" | "svg")
    )
}

/// Rebuild `bytes` with variables substituted in its text members.
///
/// Errors are human-readable reasons; callers fall back to the raw bytes.
pub fn process(kind: ArchiveKind, bytes: &[u8], scope: &VariableScope<'_>) -> Result<Vec<u8>, String> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not a valid archive: {}", e))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut expanded = 0u64;
    let mut touched = 0usize;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| format!("unreadable entry #{}: {}", index, e))?;
        let name = entry.name().to_string();
        let mut options = SimpleFileOptions::default().compression_method(entry.compression());
        if let Some(mode) = entry.unix_mode() {
            options = options.unix_permissions(mode);
        }

        if entry.is_dir() {
            writer
                .add_directory(name.as_str(), options)
                .map_err(|e| format!("cannot write {}: {}", name, e))?;
            continue;
        }

        expanded = expanded.saturating_add(entry.size());
        if expanded > MAX_EXPANDED_BYTES {
            return Err(format!(
                "archive expands beyond {} bytes",
                MAX_EXPANDED_BYTES
            ));
        }
        let mut data = Vec::new();
        (&mut entry)
            .take(MAX_EXPANDED_BYTES + 1)
            .read_to_end(&mut data)
            .map_err(|e| format!("cannot read {}: {}", name, e))?;

        let data = if kind.is_text_member(&name) {
            match String::from_utf8(data) {
                Ok(text) => {
                    let out = substitute_member(kind, &name, &text, scope);
                    if out != text {
                        touched += 1;
                    }
                    out.into_bytes()
                }
                Err(e) => e.into_bytes(),
            }
        } else {
            data
        };

        writer
            .start_file(name.as_str(), options)
            .map_err(|e| format!("cannot write {}: {}", name, e))?;
        writer
            .write_all(&data)
            .map_err(|e| format!("cannot write {}: {}", name, e))?;
    }

    debug!(?kind, members = archive.len(), touched, "archive rebuilt");
    let cursor = writer
        .finish()
        .map_err(|e| format!("cannot finish archive: {}", e))?;
    Ok(cursor.into_inner())
}

fn substitute_member(kind: ArchiveKind, member: &str, text: &str, scope: &VariableScope<'_>) -> String {
    if kind == ArchiveKind::Ooxml {
        return substitute_runs(text, scope);
    }
    if is_markup(member) {
        substitute_with(text, scope, escape_xml)
    } else {
        substitute(text, scope)
    }
}

fn escape_xml(value: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(value)
}

/// Substitute inside OOXML text runs, merging runs that split a token.
pub fn substitute_runs(xml: &str, scope: &VariableScope<'_>) -> String {
    let mut texts: Vec<String> = TEXT_RUN_RE
        .captures_iter(xml)
        .map(|caps| caps[2].to_string())
        .collect();
    if texts.is_empty() {
        return xml.to_string();
    }

    merge_split_tokens(&mut texts);

    let mut next = texts
        .iter()
        .map(|t| substitute_with(t.as_str(), scope, escape_xml));
    TEXT_RUN_RE
        .replace_all(xml, |caps: &Captures<'_>| {
            let text = next.next().unwrap_or_default();
            format!("{}{}{}", &caps[1], text, &caps[3])
        })
        .into_owned()
}

fn dangles(text: &str) -> bool {
    let rest = COMPLETE_TOKEN_RE.replace_all(text, "");
    DANGLING_RE.is_match(&rest)
}

fn token_count(text: &str) -> usize {
    COMPLETE_TOKEN_RE.find_iter(text).count()
}

/// Pull following runs into any run that ends mid-token. A merge is kept
/// only when it forms a token none of the pieces had on its own, so
/// literal percent signs stay where they are.
fn merge_split_tokens(texts: &mut [String]) {
    let mut i = 0;
    while i < texts.len() {
        if !dangles(&texts[i]) {
            i += 1;
            continue;
        }
        let mut merged = texts[i].clone();
        let mut end = i + 1;
        while end < texts.len() && end - i <= MAX_RUN_MERGE && dangles(&merged) {
            merged.push_str(&texts[end]);
            end += 1;
        }
        let separate: usize = texts[i..end].iter().map(|t| token_count(t)).sum();
        if token_count(&merged) <= separate {
            i += 1;
            continue;
        }
        texts[i] = merged;
        for text in &mut texts[i + 1..end] {
            text.clear();
        }
        i = end;
    }
}
