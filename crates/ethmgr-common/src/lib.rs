//! Common infrastructure for the persistent ethN interface renamer.
//!
//! This crate provides the pieces shared between the `ethmgrd` daemon and
//! anything else that needs to drive the Linux link layer from a shell:
//!
//! - [`shell`]: Safe shell command execution with proper quoting and a
//!   bounded per-command timeout
//! - [`error`]: Error types for link, configuration, and install operations
//!
//! # Architecture
//!
//! The renamer follows this pattern:
//!
//! 1. Read naming rules from `ifcfg-ethN` configuration files
//! 2. Observe live link state via `ip link show`
//! 3. Execute `ip link set` commands to move interfaces through a temporary
//!    namespace and into their final names
//! 4. Re-observe link state after every mutation rather than assuming it
//!
//! # Example
//!
//! ```ignore
//! use ethmgr_common::{
//!     shell::{self, IP_CMD, shellquote},
//!     error::EthMgrResult,
//! };
//!
//! async fn set_link_down(name: &str) -> EthMgrResult<()> {
//!     let cmd = format!("{} link set dev {} down", IP_CMD, shellquote(name));
//!     shell::exec_or_throw(&cmd).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod shell;

// Re-export commonly used items at crate root
pub use error::{EthMgrError, EthMgrResult};
