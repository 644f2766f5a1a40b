//! Error types for interface renaming operations.
//!
//! This module defines the error types used throughout the ethmgr crates.
//! All errors implement `std::error::Error` via `thiserror`.
//!
//! Failures local to one interface or one configuration file are contained
//! by their callers: the run logs them and continues. Only the inability to
//! observe link state at all ([`EthMgrError::LinkQuery`]) aborts a run.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ethmgr operations.
pub type EthMgrResult<T> = Result<T, EthMgrError>;

/// Errors that can occur during interface renaming operations.
#[derive(Debug, Error)]
pub enum EthMgrError {
    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// Shell command did not complete within its timeout.
    #[error("Shell command timed out after {timeout_ms}ms: '{command}'")]
    CommandTimeout {
        /// The command that timed out.
        command: String,
        /// The timeout that expired, in milliseconds.
        timeout_ms: u64,
    },

    /// The link layer could not be queried at all.
    #[error("Link query failed: {message}")]
    LinkQuery {
        /// Error message.
        message: String,
    },

    /// A configuration file could not be opened or read.
    #[error("Failed to read configuration file '{}': {source}", .path.display())]
    ConfigRead {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// An install-mode file operation failed (binary copy or unit write).
    #[error("Install failed writing '{}': {source}", .path.display())]
    InstallWrite {
        /// The destination path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl EthMgrError {
    /// Creates a link query error.
    pub fn link_query(message: impl Into<String>) -> Self {
        Self::LinkQuery {
            message: message.into(),
        }
    }

    /// Creates a configuration read error.
    pub fn config_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::ConfigRead {
            path: path.into(),
            source,
        }
    }

    /// Creates an install write error.
    pub fn install_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::InstallWrite {
            path: path.into(),
            source,
        }
    }

    /// Returns true if this error aborts the whole run.
    ///
    /// Per-interface and per-file failures are contained by their callers;
    /// only the inability to observe link state is fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EthMgrError::LinkQuery { .. })
    }
}
