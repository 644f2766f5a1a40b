//! RenameMgr implementation - the core interface renaming engine.
//!
//! The engine runs three ordered passes, re-enumerating live link state
//! between them rather than trusting its own bookkeeping:
//!
//! 1. **Quarantine**: every interface is renamed into the synthetic `tempN`
//!    namespace, which is disjoint from every possible final target. After
//!    this pass no interface can hold the target name of another, so every
//!    later rename is collision-free against not-yet-renamed interfaces.
//! 2. **Match**: interfaces are matched against configuration records by
//!    hardware address and renamed to their configured `ethN` name.
//! 3. **Fallback**: anything still outside the `eth` namespace gets the
//!    lowest free `ethN` name.
//!
//! Passes are strictly sequential; the uniqueness invariant depends on all
//! interfaces reaching the temp namespace before any leaves it. A failed
//! rename never aborts the run - the interface keeps its current name and
//! is either retried by the fallback pass or reported unnamed.

use std::collections::HashSet;

use tracing::{info, warn};

use ethmgr_common::EthMgrResult;

use crate::config::ConfigCatalog;
use crate::link::{self, LinkController};
use crate::types::{temp_name, ConfigRecord, ETH_PREFIX};

/// Outcome of one full rename run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Interfaces present at the initial enumeration.
    pub total: usize,
    /// Interfaces renamed from a configuration record.
    pub matched: usize,
    /// Interfaces given a generated `ethN` name.
    pub fallback_assigned: usize,
    /// Individual rename sequences that failed.
    pub failures: usize,
    /// Final `(name, mac_address)` table from the closing enumeration.
    pub final_names: Vec<(String, String)>,
}

/// Interface renaming engine and orchestrator.
pub struct RenameMgr<C: LinkController> {
    links: C,
    catalog: ConfigCatalog,
    failures: usize,
}

impl<C: LinkController> RenameMgr<C> {
    /// Creates a new engine over a link controller and a loaded catalog.
    pub fn new(links: C, catalog: ConfigCatalog) -> Self {
        Self {
            links,
            catalog,
            failures: 0,
        }
    }

    /// Consumes the engine, returning the link controller.
    pub fn into_links(self) -> C {
        self.links
    }

    /// Executes one down -> rename -> up sequence.
    ///
    /// If the rename itself fails, the interface is brought back up under
    /// its current name so a contained failure does not leave the link
    /// down.
    async fn rename_link(&self, current: &str, target: &str) -> EthMgrResult<()> {
        self.links.set_link_down(current).await?;

        if let Err(e) = self.links.set_link_name(current, target).await {
            if let Err(up_err) = self.links.set_link_up(current).await {
                warn!(
                    interface = %current,
                    error = %up_err,
                    "Could not restore link after failed rename"
                );
            }
            return Err(e);
        }

        self.links.set_link_up(target).await
    }

    /// Phase 1: rename every interface, in enumeration order, to `tempN`.
    ///
    /// Returns the total number of interfaces enumerated.
    async fn quarantine_pass(&mut self) -> EthMgrResult<usize> {
        let interfaces = link::list_interfaces(&self.links).await?;

        for (idx, iface) in interfaces.iter().enumerate() {
            let target = temp_name(idx);
            match self.rename_link(&iface.name, &target).await {
                Ok(()) => info!("Quarantined {} as {}", iface.name, target),
                Err(e) => {
                    warn!(
                        interface = %iface.name,
                        target = %target,
                        error = %e,
                        "Quarantine rename failed, continuing"
                    );
                    self.failures += 1;
                }
            }
        }

        Ok(interfaces.len())
    }

    /// Phase 2: apply configuration records by hardware address.
    ///
    /// Returns the number of interfaces renamed from a record. At most one
    /// record is applied per interface: records are scanned in catalog
    /// order (sorted by source path) and the first actionable match wins;
    /// further matches are reported and skipped.
    async fn match_pass(&mut self) -> EthMgrResult<usize> {
        let interfaces = link::list_interfaces(&self.links).await?;
        let mut matched = 0;

        for iface in &interfaces {
            let matching: Vec<&ConfigRecord> = self
                .catalog
                .records()
                .values()
                .filter(|r| r.is_actionable() && r.matches(iface))
                .collect();

            let Some(record) = matching.first() else {
                continue;
            };
            let Some(target) = record.desired_name.as_deref() else {
                continue;
            };

            if matching.len() > 1 {
                warn!(
                    interface = %iface.name,
                    mac = %iface.mac_address,
                    "{} records match, applying only {}",
                    matching.len(),
                    record.source.display()
                );
            }

            match self.rename_link(&iface.name, target).await {
                Ok(()) => {
                    info!(
                        "Named {} -> {} (from {})",
                        iface.name,
                        target,
                        record.source.display()
                    );
                    matched += 1;
                }
                Err(e) => {
                    warn!(
                        interface = %iface.name,
                        target = %target,
                        error = %e,
                        "Configured rename failed, continuing"
                    );
                    self.failures += 1;
                }
            }
        }

        Ok(matched)
    }

    /// Phase 3: assign the lowest free `ethN` name to every interface whose
    /// current name is still outside the `eth` namespace.
    ///
    /// Returns the number of fallback names assigned. The in-use set covers
    /// both names observed at re-enumeration and names assigned earlier in
    /// this same pass.
    async fn fallback_pass(&mut self) -> EthMgrResult<usize> {
        let interfaces = link::list_interfaces(&self.links).await?;
        let mut in_use: HashSet<String> = interfaces.iter().map(|i| i.name.clone()).collect();
        let mut assigned = 0;

        for iface in &interfaces {
            if iface.name.contains(ETH_PREFIX) {
                continue;
            }

            let target = lowest_free_eth_name(&in_use);
            match self.rename_link(&iface.name, &target).await {
                Ok(()) => {
                    info!("Assigned fallback name {} to {}", target, iface.name);
                    in_use.remove(&iface.name);
                    in_use.insert(target);
                    assigned += 1;
                }
                Err(e) => {
                    warn!(
                        interface = %iface.name,
                        target = %target,
                        error = %e,
                        "Fallback rename failed, continuing"
                    );
                    self.failures += 1;
                }
            }
        }

        Ok(assigned)
    }

    /// Runs the full pipeline: quarantine, match, fallback, final report.
    ///
    /// State is re-enumerated between passes; a rename is never assumed to
    /// have taken effect without being observed. Only an enumeration
    /// failure aborts the run.
    pub async fn run(&mut self) -> EthMgrResult<RunSummary> {
        self.failures = 0;

        info!("Gathering previous name associations");
        let total = self.quarantine_pass().await?;
        info!("Renamed all interfaces to temporary device names");

        info!(
            "Applying names from HWADDR rules ({} records loaded)",
            self.catalog.len()
        );
        let matched = self.match_pass().await?;

        let unnamed = total - matched;
        info!("{} assigned, {} unnamed", matched, unnamed);

        let mut fallback_assigned = 0;
        if unnamed > 0 {
            info!("Renaming devices without a configured name to an arbitrary ethN designation");
            fallback_assigned = self.fallback_pass().await?;
        }

        info!("Final naming scheme");
        let interfaces = link::list_interfaces(&self.links).await?;
        let final_names: Vec<(String, String)> = interfaces
            .iter()
            .map(|i| (i.name.clone(), i.mac_address.clone()))
            .collect();
        for (name, mac) in &final_names {
            info!("{:>15}: {}", name, mac);
        }

        Ok(RunSummary {
            total,
            matched,
            fallback_assigned,
            failures: self.failures,
            final_names,
        })
    }
}

/// Picks the lowest `ethN`, N counted from 0, absent from `in_use`.
fn lowest_free_eth_name(in_use: &HashSet<String>) -> String {
    let mut n = 0usize;
    loop {
        let candidate = format!("{}{}", ETH_PREFIX, n);
        if !in_use.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use ethmgr_common::EthMgrError;

    use crate::types::ConfigRecord;

    #[derive(Debug, Clone)]
    struct MockIface {
        name: String,
        mac: String,
        up: bool,
    }

    /// In-memory link controller: a vector of links in kernel report
    /// order, rendered as `ip link show` text so enumeration exercises the
    /// real parser. Renames to a name already in use fail, as the kernel's
    /// would.
    struct MockLink {
        state: Mutex<Vec<MockIface>>,
        fail_targets: Mutex<HashSet<String>>,
    }

    impl MockLink {
        fn new(links: &[(&str, &str)]) -> Self {
            Self {
                state: Mutex::new(
                    links
                        .iter()
                        .map(|(name, mac)| MockIface {
                            name: name.to_string(),
                            mac: mac.to_string(),
                            up: true,
                        })
                        .collect(),
                ),
                fail_targets: Mutex::new(HashSet::new()),
            }
        }

        fn fail_renames_to(&self, target: &str) {
            self.fail_targets.lock().unwrap().insert(target.to_string());
        }

        fn names(&self) -> Vec<String> {
            self.state
                .lock()
                .unwrap()
                .iter()
                .map(|l| l.name.clone())
                .collect()
        }

        fn name_of(&self, mac: &str) -> Option<String> {
            self.state
                .lock()
                .unwrap()
                .iter()
                .find(|l| l.mac.eq_ignore_ascii_case(mac))
                .map(|l| l.name.clone())
        }

        fn busy(command: String) -> EthMgrError {
            EthMgrError::ShellCommandFailed {
                command,
                exit_code: 2,
                output: "RTNETLINK answers: File exists".to_string(),
            }
        }

        fn missing(command: String) -> EthMgrError {
            EthMgrError::ShellCommandFailed {
                command,
                exit_code: 1,
                output: "Cannot find device".to_string(),
            }
        }
    }

    #[async_trait]
    impl LinkController for MockLink {
        async fn list_links(&self) -> EthMgrResult<String> {
            let mut out = String::from(
                "1: lo: <LOOPBACK,UP,LOWER_UP> mtu 65536 qdisc noqueue state UNKNOWN mode DEFAULT group default qlen 1000\n    link/loopback 00:00:00:00:00:00 brd 00:00:00:00:00:00\n",
            );
            for (idx, l) in self.state.lock().unwrap().iter().enumerate() {
                let flags = if l.up {
                    "<BROADCAST,MULTICAST,UP,LOWER_UP>"
                } else {
                    "<BROADCAST,MULTICAST>"
                };
                out.push_str(&format!(
                    "{}: {}: {} mtu 1500 qdisc fq_codel state {} mode DEFAULT group default qlen 1000\n    link/ether {} brd ff:ff:ff:ff:ff:ff\n",
                    idx + 2,
                    l.name,
                    flags,
                    if l.up { "UP" } else { "DOWN" },
                    l.mac.to_lowercase(),
                ));
            }
            Ok(out)
        }

        async fn set_link_down(&self, name: &str) -> EthMgrResult<()> {
            let mut state = self.state.lock().unwrap();
            match state.iter_mut().find(|l| l.name == name) {
                Some(l) => {
                    l.up = false;
                    Ok(())
                }
                None => Err(Self::missing(format!("ip link set dev {} down", name))),
            }
        }

        async fn set_link_name(&self, name: &str, new_name: &str) -> EthMgrResult<()> {
            let cmd = format!("ip link set dev {} name {}", name, new_name);
            if self.fail_targets.lock().unwrap().contains(new_name) {
                return Err(Self::busy(cmd));
            }
            let mut state = self.state.lock().unwrap();
            if name != new_name && state.iter().any(|l| l.name == new_name) {
                return Err(Self::busy(cmd));
            }
            match state.iter_mut().find(|l| l.name == name) {
                Some(l) => {
                    l.name = new_name.to_string();
                    Ok(())
                }
                None => Err(Self::missing(cmd)),
            }
        }

        async fn set_link_up(&self, name: &str) -> EthMgrResult<()> {
            let mut state = self.state.lock().unwrap();
            match state.iter_mut().find(|l| l.name == name) {
                Some(l) => {
                    l.up = true;
                    Ok(())
                }
                None => Err(Self::missing(format!("ip link set dev {} up", name))),
            }
        }
    }

    fn record(source: &str, hwaddr: Option<&str>, desired: Option<&str>) -> ConfigRecord {
        ConfigRecord {
            source: PathBuf::from(source),
            hwaddr: hwaddr.map(str::to_string),
            desired_name: desired.map(str::to_string),
        }
    }

    fn catalog(records: Vec<ConfigRecord>) -> ConfigCatalog {
        ConfigCatalog::from_records(records)
    }

    #[tokio::test]
    async fn test_quarantine_assigns_disjoint_temp_names() {
        let links = MockLink::new(&[
            ("enp3s0", "AA:BB:CC:DD:EE:FF"),
            ("eth0", "11:22:33:44:55:66"),
            ("wlp2s0", "DE:AD:BE:EF:00:01"),
        ]);
        let mut mgr = RenameMgr::new(links, catalog(vec![]));

        let total = mgr.quarantine_pass().await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(mgr.links.names(), vec!["temp0", "temp1", "temp2"]);
        assert_eq!(mgr.failures, 0);
    }

    #[tokio::test]
    async fn test_match_renames_by_hwaddr() {
        let links = MockLink::new(&[("enp3s0", "AA:BB:CC:DD:EE:FF")]);
        let cat = catalog(vec![record(
            "/etc/sysconfig/network-scripts/ifcfg-eth0",
            Some("AA:BB:CC:DD:EE:FF"),
            Some("eth0"),
        )]);
        let mut mgr = RenameMgr::new(links, cat);

        let summary = mgr.run().await.unwrap();
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.fallback_assigned, 0);
        assert_eq!(summary.failures, 0);
        assert_eq!(
            mgr.links.name_of("AA:BB:CC:DD:EE:FF").unwrap(),
            "eth0"
        );
    }

    #[tokio::test]
    async fn test_fallback_takes_lowest_free_names() {
        let links = MockLink::new(&[
            ("enp3s0", "AA:BB:CC:DD:EE:FF"),
            ("enp4s0", "11:22:33:44:55:66"),
        ]);
        let mut mgr = RenameMgr::new(links, catalog(vec![]));

        let summary = mgr.run().await.unwrap();
        assert_eq!(summary.matched, 0);
        assert_eq!(summary.fallback_assigned, 2);
        assert_eq!(mgr.links.names(), vec!["eth0", "eth1"]);
    }

    #[tokio::test]
    async fn test_fallback_skips_name_taken_by_match() {
        let links = MockLink::new(&[
            ("enp3s0", "AA:BB:CC:DD:EE:FF"),
            ("enp4s0", "11:22:33:44:55:66"),
        ]);
        let cat = catalog(vec![record(
            "ifcfg-eth0",
            Some("11:22:33:44:55:66"),
            Some("eth0"),
        )]);
        let mut mgr = RenameMgr::new(links, cat);

        let summary = mgr.run().await.unwrap();
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.fallback_assigned, 1);
        assert_eq!(mgr.links.name_of("11:22:33:44:55:66").unwrap(), "eth0");
        assert_eq!(mgr.links.name_of("AA:BB:CC:DD:EE:FF").unwrap(), "eth1");
    }

    #[tokio::test]
    async fn test_names_unique_after_every_pass() {
        let links = MockLink::new(&[
            ("eth1", "AA:BB:CC:DD:EE:01"),
            ("eth0", "AA:BB:CC:DD:EE:02"),
            ("enp5s0", "AA:BB:CC:DD:EE:03"),
        ]);
        // eth0 and eth1 hold each other's target names before the run
        let cat = catalog(vec![
            record("ifcfg-eth0", Some("AA:BB:CC:DD:EE:01"), Some("eth0")),
            record("ifcfg-eth1", Some("AA:BB:CC:DD:EE:02"), Some("eth1")),
        ]);
        let mut mgr = RenameMgr::new(links, cat);

        mgr.quarantine_pass().await.unwrap();
        let after_quarantine: HashSet<_> = mgr.links.names().into_iter().collect();
        assert_eq!(after_quarantine.len(), 3);

        mgr.match_pass().await.unwrap();
        let after_match: HashSet<_> = mgr.links.names().into_iter().collect();
        assert_eq!(after_match.len(), 3);

        mgr.fallback_pass().await.unwrap();
        let names = mgr.links.names();
        let unique: HashSet<_> = names.iter().cloned().collect();
        assert_eq!(unique.len(), 3);

        // cross-held names resolved by the quarantine pass
        assert_eq!(mgr.links.name_of("AA:BB:CC:DD:EE:01").unwrap(), "eth0");
        assert_eq!(mgr.links.name_of("AA:BB:CC:DD:EE:02").unwrap(), "eth1");
    }

    #[tokio::test]
    async fn test_idempotent_across_runs() {
        let links = MockLink::new(&[
            ("enp3s0", "AA:BB:CC:DD:EE:FF"),
            ("enp4s0", "11:22:33:44:55:66"),
            ("enp5s0", "DE:AD:BE:EF:00:01"),
        ]);
        let cat = catalog(vec![record(
            "ifcfg-eth0",
            Some("11:22:33:44:55:66"),
            Some("eth0"),
        )]);

        let mut mgr = RenameMgr::new(links, cat);
        let first = mgr.run().await.unwrap();

        let links = mgr.into_links();
        let cat = catalog(vec![record(
            "ifcfg-eth0",
            Some("11:22:33:44:55:66"),
            Some("eth0"),
        )]);
        let mut mgr = RenameMgr::new(links, cat);
        let second = mgr.run().await.unwrap();

        let mut first_map: Vec<_> = first.final_names.clone();
        let mut second_map: Vec<_> = second.final_names.clone();
        first_map.sort();
        second_map.sort();
        assert_eq!(first_map, second_map);
        assert_eq!(second.failures, 0);
    }

    #[tokio::test]
    async fn test_partial_failure_contained_and_recovered() {
        let links = MockLink::new(&[
            ("enp3s0", "AA:BB:CC:DD:EE:FF"),
            ("enp4s0", "11:22:33:44:55:66"),
        ]);
        links.fail_renames_to("eth5");
        let cat = catalog(vec![
            record("ifcfg-eth0", Some("11:22:33:44:55:66"), Some("eth0")),
            record("ifcfg-eth5", Some("AA:BB:CC:DD:EE:FF"), Some("eth5")),
        ]);
        let mut mgr = RenameMgr::new(links, cat);

        let summary = mgr.run().await.unwrap();

        // The failed interface stayed in the temp namespace after phase 2
        // and was picked up by fallback naming.
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.fallback_assigned, 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(mgr.links.name_of("11:22:33:44:55:66").unwrap(), "eth0");
        assert_eq!(mgr.links.name_of("AA:BB:CC:DD:EE:FF").unwrap(), "eth1");
    }

    #[tokio::test]
    async fn test_first_match_wins_on_duplicate_records() {
        let links = MockLink::new(&[("enp3s0", "AA:BB:CC:DD:EE:FF")]);
        let cat = catalog(vec![
            record("ifcfg-eth0", Some("AA:BB:CC:DD:EE:FF"), Some("eth0")),
            record("ifcfg-eth3", Some("AA:BB:CC:DD:EE:FF"), Some("eth3")),
        ]);
        let mut mgr = RenameMgr::new(links, cat);

        let summary = mgr.run().await.unwrap();
        assert_eq!(summary.matched, 1);
        assert_eq!(mgr.links.name_of("AA:BB:CC:DD:EE:FF").unwrap(), "eth0");
    }

    #[tokio::test]
    async fn test_inert_records_are_skipped() {
        let links = MockLink::new(&[("enp3s0", "AA:BB:CC:DD:EE:FF")]);
        let cat = catalog(vec![
            // matches but assigns nothing
            record("ifcfg-eth0", Some("AA:BB:CC:DD:EE:FF"), None),
            // can never match
            record("ifcfg-eth1", None, Some("eth1")),
        ]);
        let mut mgr = RenameMgr::new(links, cat);

        let summary = mgr.run().await.unwrap();
        assert_eq!(summary.matched, 0);
        assert_eq!(summary.fallback_assigned, 1);
        assert_eq!(mgr.links.name_of("AA:BB:CC:DD:EE:FF").unwrap(), "eth0");
    }

    #[tokio::test]
    async fn test_failed_rename_restores_link_up() {
        let links = MockLink::new(&[("enp3s0", "AA:BB:CC:DD:EE:FF")]);
        links.fail_renames_to("temp0");
        let mut mgr = RenameMgr::new(links, catalog(vec![]));

        mgr.quarantine_pass().await.unwrap();
        assert_eq!(mgr.failures, 1);

        let state = mgr.links.state.lock().unwrap();
        assert_eq!(state[0].name, "enp3s0");
        assert!(state[0].up);
    }

    #[test]
    fn test_lowest_free_eth_name() {
        let mut in_use = HashSet::new();
        assert_eq!(lowest_free_eth_name(&in_use), "eth0");

        in_use.insert("eth0".to_string());
        in_use.insert("eth1".to_string());
        in_use.insert("eth3".to_string());
        assert_eq!(lowest_free_eth_name(&in_use), "eth2");
    }
}
