//! Persistent ethN interface naming daemon.
//!
//! This crate implements `ethmgrd`, which renames every network interface
//! on the host from kernel-assigned or predictable-scheme names to a
//! stable, administrator-chosen `ethN` naming convention. It runs once,
//! early in boot (before `network.target`), and leaves every interface
//! with a unique, deterministic name regardless of enumeration order or
//! prior naming state.
//!
//! # Responsibilities
//!
//! - Enumerate live links via `ip link show`, loopback excluded
//! - Load `ifcfg-ethN` naming rules keyed by `HWADDR`
//! - Quarantine every interface into a disjoint `tempN` namespace
//! - Apply configured names by hardware address, then fall back to the
//!   lowest free `ethN` for anything unmatched
//! - Optionally install itself as a systemd oneshot unit
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Interface and configuration record types |
//! | [`link`] | `LinkController` boundary and interface enumeration |
//! | [`config`] | `ifcfg` catalog loading and parsing |
//! | [`rename_mgr`] | The three-pass rename engine and orchestration |
//! | [`install`] | systemd unit installation |
//!
//! # Example
//!
//! ```ignore
//! use ethmgrd::{config::ConfigCatalog, link::ShellLinkController, rename_mgr::RenameMgr};
//!
//! let catalog = ConfigCatalog::load(Path::new("/etc/sysconfig/network-scripts"));
//! let mut mgr = RenameMgr::new(ShellLinkController, catalog);
//! let summary = mgr.run().await?;
//! ```

pub mod config;
pub mod install;
pub mod link;
pub mod rename_mgr;
pub mod types;

pub use config::ConfigCatalog;
pub use install::Installer;
pub use link::{LinkController, ShellLinkController};
pub use rename_mgr::{RenameMgr, RunSummary};
pub use types::{ConfigRecord, Interface};
