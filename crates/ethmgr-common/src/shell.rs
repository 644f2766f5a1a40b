//! Shell command execution utilities for the interface renamer.
//!
//! This module provides safe shell command execution with proper quoting
//! to prevent command injection, and a bounded per-command timeout so a
//! wedged `ip` invocation becomes a reportable failure instead of hanging
//! the whole run.
//!
//! # Example
//!
//! ```ignore
//! use ethmgr_common::shell::{self, IP_CMD, shellquote};
//!
//! let name = "temp0";
//! let cmd = format!("{} link set dev {} down", IP_CMD, shellquote(name));
//! let result = shell::exec(&cmd).await?;
//! ```

use std::process::Stdio;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

use crate::error::{EthMgrError, EthMgrResult};

/// Path to the `ip` command for link state queries and renames.
pub const IP_CMD: &str = "/sbin/ip";

/// Path to the `systemctl` command for service registration.
pub const SYSTEMCTL_CMD: &str = "/usr/bin/systemctl";

/// Default timeout applied to every shell command.
///
/// Link operations complete in milliseconds on a healthy system; a command
/// still running after this long is treated as failed.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(30);

/// Regex for characters that need escaping in shell double-quotes.
/// Matches: $, `, ", \, and newline
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string for safe use in shell commands.
///
/// This function wraps the string in double quotes and escapes any
/// characters that have special meaning inside double quotes:
/// - `$` (variable expansion)
/// - `` ` `` (command substitution)
/// - `"` (quote termination)
/// - `\` (escape character)
/// - newline (command termination)
///
/// # Example
///
/// ```
/// use ethmgr_common::shell::shellquote;
///
/// assert_eq!(shellquote("eth0"), "\"eth0\"");
/// assert_eq!(shellquote("with$var"), "\"with\\$var\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// Result of a shell command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    /// The combined stdout output.
    pub stdout: String,
    /// The combined stderr output.
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Executes a shell command with the default timeout.
///
/// See [`exec_with_timeout`].
pub async fn exec(cmd: &str) -> EthMgrResult<ExecResult> {
    exec_with_timeout(cmd, DEFAULT_EXEC_TIMEOUT).await
}

/// Executes a shell command asynchronously with a bounded timeout.
///
/// The command runs through `/bin/sh -c` to support shell features like
/// pipes and command chaining. If the command does not complete within
/// `timeout`, an [`EthMgrError::CommandTimeout`] is returned; callers treat
/// this like any other per-command failure.
///
/// # Returns
///
/// * `Ok(ExecResult)` - The command execution result
/// * `Err(EthMgrError)` - If the command could not be spawned or timed out
pub async fn exec_with_timeout(cmd: &str, timeout: Duration) -> EthMgrResult<ExecResult> {
    tracing::debug!(command = %cmd, "Executing shell command");

    let child = Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    let output = tokio::time::timeout(timeout, child)
        .await
        .map_err(|_| EthMgrError::CommandTimeout {
            command: cmd.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })?
        .map_err(|e| EthMgrError::ShellExec {
            command: cmd.to_string(),
            source: e,
        })?;

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    let result = ExecResult {
        exit_code,
        stdout,
        stderr,
    };

    if result.success() {
        tracing::trace!(command = %cmd, exit_code = exit_code, "Command succeeded");
    } else {
        tracing::warn!(
            command = %cmd,
            exit_code = exit_code,
            stderr = %result.stderr,
            "Command failed"
        );
    }

    Ok(result)
}

/// Executes a shell command and returns an error on non-zero exit.
///
/// # Returns
///
/// * `Ok(String)` - The stdout output on success
/// * `Err(EthMgrError)` - If the command fails or returns non-zero
pub async fn exec_or_throw(cmd: &str) -> EthMgrResult<String> {
    let result = exec(cmd).await?;
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(EthMgrError::ShellCommandFailed {
            command: cmd.to_string(),
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }
}
