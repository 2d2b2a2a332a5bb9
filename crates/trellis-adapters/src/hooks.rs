//! Post-create hook execution through the platform shell.

use std::path::Path;
use std::process::Command;

use tracing::{debug, instrument, warn};
use trellis_core::{application::ports::HookRunner, domain::HookResult};

/// Runs each hook with `sh -c` (or `cmd /C` on Windows), capturing output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellHookRunner;

impl ShellHookRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(command: &str) -> Command {
        #[cfg(target_os = "windows")]
        {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        }
        #[cfg(not(target_os = "windows"))]
        {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        }
    }
}

impl HookRunner for ShellHookRunner {
    #[instrument(skip_all, fields(command = %command, cwd = %working_dir.display()))]
    fn run(&self, command: &str, working_dir: &Path) -> HookResult {
        match Self::command(command).current_dir(working_dir).output() {
            Ok(output) => {
                let success = output.status.success();
                debug!(success, code = ?output.status.code(), "hook exited");
                HookResult {
                    command: command.to_string(),
                    success,
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                }
            }
            Err(e) => {
                warn!(error = %e, "hook could not be started");
                HookResult {
                    command: command.to_string(),
                    success: false,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: format!("Failed to execute: {}", e),
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn captures_output_and_status() {
        let dir = TempDir::new().unwrap();
        let result = ShellHookRunner::new().run("echo hello && echo oops >&2", dir.path());
        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout.trim(), "hello");
        assert_eq!(result.stderr.trim(), "oops");
    }

    #[test]
    fn runs_in_working_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let result = ShellHookRunner::new().run("ls", dir.path());
        assert!(result.stdout.contains("marker.txt"));
    }

    #[test]
    fn failure_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let result = ShellHookRunner::new().run("exit 3", dir.path());
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
    }

    #[test]
    fn missing_working_dir_fails_to_start() {
        let dir = TempDir::new().unwrap();
        let result = ShellHookRunner::new().run("true", &dir.path().join("absent"));
        assert!(!result.success);
        assert_eq!(result.exit_code, None);
        assert!(result.stderr.starts_with("Failed to execute"));
    }
}
