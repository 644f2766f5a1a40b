//! Configuration catalog: loads and indexes `ifcfg-ethN` naming rules.
//!
//! Each file in the configuration directory holding `KEY=VALUE` lines
//! becomes one [`ConfigRecord`]. Files whose name contains a colon are VLAN
//! sub-interface definitions and are never loaded. Unreadable files are
//! skipped with a warning; records missing the fields needed to act are
//! loaded inert so the operator sees them in diagnostics instead of
//! wondering where they went.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;
use tracing::{debug, warn};

use ethmgr_common::EthMgrError;

use crate::types::{normalize_hwaddr, normalize_name, ConfigRecord};

/// Directory scanned for interface configuration files.
pub const DEFAULT_CONFIG_DIR: &str = "/etc/sysconfig/network-scripts";

/// Glob pattern selecting the files that carry ethN naming rules.
pub const IFCFG_PATTERN: &str = "ifcfg-eth*";

/// Recognized `ifcfg` keys.
pub mod fields {
    /// Hardware address to match against (required for any match).
    pub const HWADDR: &str = "HWADDR";
    /// Preferred target name.
    pub const DEVICE: &str = "DEVICE";
    /// Fallback target name when `DEVICE` is absent.
    pub const NAME: &str = "NAME";
}

/// Immutable per-run index of naming rules, keyed by source file.
///
/// Iteration order over [`records`](Self::records) is sorted by path, which
/// makes the match pass deterministic regardless of directory enumeration
/// order.
#[derive(Debug, Default)]
pub struct ConfigCatalog {
    records: BTreeMap<PathBuf, ConfigRecord>,
}

impl ConfigCatalog {
    /// Loads every `ifcfg-eth*` file under `dir` into the catalog.
    ///
    /// Per-file read failures are contained: the file is skipped with a
    /// warning and the run continues, since an interface that would have
    /// matched it is still handled by fallback naming.
    pub fn load(dir: &Path) -> Self {
        let pattern = dir.join(IFCFG_PATTERN);
        let pattern = pattern.to_string_lossy();

        let mut records = BTreeMap::new();
        let paths = match glob(&pattern) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Invalid configuration glob, catalog is empty");
                return Self { records };
            }
        };

        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };

            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if file_name.contains(':') {
                // VLAN sub-interface definition, out of scope
                debug!(file = %file_name, "Skipping VLAN definition");
                continue;
            }

            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    let err = EthMgrError::config_read(&path, e);
                    warn!(error = %err, "Skipping configuration file");
                    continue;
                }
            };

            let record = build_record(path.clone(), &content);
            records.insert(path, record);
        }

        Self { records }
    }

    /// Builds a catalog from already-constructed records, keyed by their
    /// source path. Used by tests and callers that do not read a directory.
    pub fn from_records(records: impl IntoIterator<Item = ConfigRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| (r.source.clone(), r))
                .collect(),
        }
    }

    /// The loaded records, keyed and ordered by source path.
    pub fn records(&self) -> &BTreeMap<PathBuf, ConfigRecord> {
        &self.records
    }

    /// Number of loaded records (including inert ones).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records were loaded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parses `KEY=VALUE` lines into an upper-cased map.
///
/// Blank lines and `#` comments are skipped; lines without `=` are ignored.
/// Both keys and values are upper-cased here, matching the ifcfg convention
/// of case-insensitive keys; target names are lower-cased later during
/// normalization.
fn parse_ifcfg(content: &str) -> HashMap<String, String> {
    let mut kv = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            kv.insert(
                key.trim().to_uppercase(),
                value.trim().to_uppercase(),
            );
        }
    }

    kv
}

/// Builds one record from file content, warning about inert records.
fn build_record(source: PathBuf, content: &str) -> ConfigRecord {
    let kv = parse_ifcfg(content);

    let hwaddr = kv
        .get(fields::HWADDR)
        .and_then(|raw| normalize_hwaddr(raw));
    if hwaddr.is_none() {
        warn!(
            file = %source.display(),
            "Record has no usable HWADDR and will never match an interface"
        );
    }

    let desired_name = kv
        .get(fields::DEVICE)
        .or_else(|| kv.get(fields::NAME))
        .and_then(|raw| normalize_name(raw));
    if desired_name.is_none() {
        warn!(
            file = %source.display(),
            "Record has neither DEVICE nor NAME and assigns nothing"
        );
    }

    ConfigRecord {
        source,
        hwaddr,
        desired_name,
    }
}
