//! Truthiness for `if`/`else` and count parsing for `repeat`.

use super::error::DomainError;

/// `false` for empty/whitespace, `0`, `false` and `no` (any case); `true`
/// for everything else.
pub fn is_truthy(value: &str) -> bool {
    let v = value.trim();
    !(v.is_empty()
        || v == "0"
        || v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no"))
}

/// Outcome of evaluating a substituted repeat count.
#[derive(Debug, Clone, PartialEq)]
pub enum RepeatCount {
    /// Run the body this many times (possibly zero).
    Times(u64),
    /// Not a non-negative integer; warn and run zero times.
    Invalid(String),
    /// Above the configured bound; an error, nothing runs.
    TooLarge(DomainError),
}

/// Parse a repeat count that has already been substituted.
pub fn parse_repeat_count(expr: &str, max: u64) -> RepeatCount {
    let trimmed = expr.trim();
    match trimmed.parse::<i64>() {
        Ok(n) if n < 0 => RepeatCount::Invalid(trimmed.to_string()),
        Ok(n) => {
            let count = n.unsigned_abs();
            if count > max {
                RepeatCount::TooLarge(DomainError::RepeatLimitExceeded { count, max })
            } else {
                RepeatCount::Times(count)
            }
        }
        // Very large literals overflow i64 but are still just "too large".
        Err(_) if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) => {
            RepeatCount::TooLarge(DomainError::RepeatLimitExceeded {
                count: u64::MAX,
                max,
            })
        }
        Err(_) => RepeatCount::Invalid(trimmed.to_string()),
    }
}

/// Validate the loop variable name of a `repeat`.
pub fn validate_loop_variable(name: &str) -> Result<&str, DomainError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(DomainError::InvalidLoopVariable {
            name: name.to_string(),
        })
    }
}
