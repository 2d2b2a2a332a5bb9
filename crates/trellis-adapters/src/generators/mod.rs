//! Binary content generators.
//!
//! | Kind     | Output                         | Config                                   |
//! |----------|--------------------------------|------------------------------------------|
//! | `image`  | solid-colour PNG or JPEG       | `width` `height` `background` `format`   |
//! | `sqlite` | SQLite database file           | `<table>`/`<column>` elements, `<sql>`   |
//!
//! Config and content arrive already substituted; generators only parse.

mod image;
mod sqlite;

pub use self::image::{ImageConfig, ImageFormat, generate_image, parse_hex_color};
pub use self::sqlite::{generate_sqlite, sql_statements};

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use trellis_core::{
    application::{
        ApplicationError,
        ports::{ContentGenerator, GenerateRequest},
    },
    domain::GeneratorKind,
    error::TrellisResult,
};

/// Why a generator produced no bytes.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Failed to encode {format}: {source}")]
    Encode {
        format: &'static str,
        #[source]
        source: ::image::ImageError,
    },

    #[error("SQL execution failed: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Scratch file error: {0}")]
    Scratch(#[from] std::io::Error),
}

/// Dispatches to the built-in generator for each [`GeneratorKind`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinGenerators;

impl BuiltinGenerators {
    pub fn new() -> Self {
        Self
    }
}

impl ContentGenerator for BuiltinGenerators {
    fn generate(&self, request: &GenerateRequest<'_>) -> TrellisResult<Vec<u8>> {
        let result = match request.kind {
            GeneratorKind::Image => generate_image(request),
            GeneratorKind::Sqlite => generate_sqlite(request),
        };
        result.map_err(|e| {
            ApplicationError::GeneratorFailed {
                kind: request.kind.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z][\w-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'/>]+))"#)
        .expect("attribute pattern is valid")
});

/// `key="value"` pairs in source order; quotes are optional.
pub(crate) fn attributes(input: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(input)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps.get(2).or(caps.get(3)).or(caps.get(4))?.as_str();
            Some((key, value.to_string()))
        })
        .collect()
}

pub(crate) fn attribute<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
