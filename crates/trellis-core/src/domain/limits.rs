//! Resource bounds for a run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::rules::{DEFAULT_MAX_INPUT_LENGTH, DEFAULT_MAX_PATTERN_LENGTH, PatternLimits};

/// Bounds applied by the walker, downloads, previews and rule checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineLimits {
    pub max_depth: usize,
    pub max_repeat: u64,
    pub max_download_bytes: u64,
    pub download_timeout_secs: u64,
    pub max_preview_bytes: u64,
    pub max_diff_content: usize,
    pub max_diff_lines: usize,
    pub max_pattern_length: usize,
    pub max_validation_input: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_repeat: 10_000,
            max_download_bytes: 50 * 1024 * 1024,
            download_timeout_secs: 30,
            max_preview_bytes: 1024 * 1024,
            max_diff_content: 50_000,
            max_diff_lines: 1_000,
            max_pattern_length: DEFAULT_MAX_PATTERN_LENGTH,
            max_validation_input: DEFAULT_MAX_INPUT_LENGTH,
        }
    }
}

impl EngineLimits {
    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            timeout: Duration::from_secs(self.download_timeout_secs),
            max_bytes: self.max_download_bytes,
        }
    }

    pub fn pattern_limits(&self) -> PatternLimits {
        PatternLimits {
            max_pattern_length: self.max_pattern_length,
            max_input_length: self.max_validation_input,
        }
    }
}

/// Bounds passed to a [`Fetcher`](crate::application::ports::Fetcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub timeout: Duration,
    pub max_bytes: u64,
}
