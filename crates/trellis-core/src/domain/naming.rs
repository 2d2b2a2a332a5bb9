//! File and folder name safety.
//!
//! Every name is checked after substitution and before it reaches a
//! filesystem port, since variable values can inject separators or `..`.

use super::error::DomainError;

/// Longest accepted name, in bytes.
pub const MAX_NAME_LENGTH: usize = 255;

const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Validate a single path component.
pub fn validate_name(name: &str) -> Result<&str, DomainError> {
    let reject = |reason: &str| {
        Err(DomainError::InvalidName {
            name: printable(name),
            reason: reason.to_string(),
        })
    };

    if name.trim().is_empty() {
        return reject("name is empty");
    }
    if name.len() > MAX_NAME_LENGTH {
        return reject("name is longer than 255 bytes");
    }
    if name == "." || name == ".." {
        return reject("relative path components are not allowed");
    }
    if name.contains('/') || name.contains('\\') {
        return reject("path separators are not allowed");
    }
    if name.contains('\0') {
        return reject("null bytes are not allowed");
    }
    if name.chars().any(char::is_control) {
        return reject("control characters are not allowed");
    }
    if let Some(ch) = name.chars().find(|c| ILLEGAL_CHARS.contains(c)) {
        return reject(&format!("character '{ch}' is not allowed"));
    }
    let base = name.split('.').next().unwrap_or(name);
    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(base.trim_end()))
    {
        return reject("reserved device name");
    }
    if name.ends_with(' ') || name.ends_with('.') {
        return reject("names cannot end with a space or period");
    }
    Ok(name)
}

/// Render a name for messages without control characters.
fn printable(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_control() { '\u{fffd}' } else { c })
        .take(64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(name: &str) -> String {
        match validate_name(name) {
            Err(DomainError::InvalidName { reason, .. }) => reason,
            other => panic!("expected rejection for {name:?}, got {other:?}"),
        }
    }

    #[test]
    fn accepts_ordinary_names() {
        for name in ["README.md", "src", ".gitignore", "my-app_v2", "a b", "CONFIG.toml", "console"] {
            assert_eq!(validate_name(name), Ok(name), "rejected {name}");
        }
    }

    #[test]
    fn rejects_traversal_and_separators() {
        assert!(reason("../escape").contains("separators"));
        assert!(reason("a/b").contains("separators"));
        assert!(reason("a\\b").contains("separators"));
        assert!(reason("..").contains("relative"));
        assert!(reason(".").contains("relative"));
    }

    #[test]
    fn rejects_reserved_device_names() {
        assert_eq!(reason("CON"), "reserved device name");
        assert_eq!(reason("con.txt"), "reserved device name");
        assert_eq!(reason("Lpt9.log"), "reserved device name");
        assert_eq!(reason("nul.tar.gz"), "reserved device name");
    }

    #[test]
    fn rejects_trailing_space_or_period() {
        assert!(reason("trailing.").contains("period"));
        assert!(reason("trailing ").contains("space"));
    }

    #[test]
    fn rejects_long_empty_and_nul_names() {
        assert!(reason(&"a".repeat(300)).contains("255"));
        assert_eq!(validate_name(&"a".repeat(255)).map(str::len), Ok(255));
        assert!(reason("").contains("empty"));
        assert!(reason("   ").contains("empty"));
        assert!(reason("bad\0name").contains("null"));
    }

    #[test]
    fn rejects_illegal_characters() {
        for name in ["a<b", "a>b", "a:b", "a\"b", "a|b", "a?b", "a*b"] {
            assert!(reason(name).contains("not allowed"), "accepted {name}");
        }
    }

    #[test]
    fn messages_do_not_echo_control_characters() {
        match validate_name("x\0y") {
            Err(DomainError::InvalidName { name, .. }) => assert!(!name.contains('\0')),
            other => panic!("unexpected {other:?}"),
        }
    }
}
