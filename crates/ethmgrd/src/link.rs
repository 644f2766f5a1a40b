//! Link-layer access: the `LinkController` boundary and the interface
//! enumerator.
//!
//! All mutation of kernel link state goes through the [`LinkController`]
//! trait. Production code uses [`ShellLinkController`], which shells out to
//! `/sbin/ip`; tests substitute an in-memory fake, so the rename passes can
//! be exercised deterministically without real interfaces.

use async_trait::async_trait;
use tracing::debug;

use ethmgr_common::{
    shell::{self, shellquote, IP_CMD},
    EthMgrError, EthMgrResult,
};

use crate::types::Interface;

/// Operations the renamer needs from the link-management facility.
///
/// Every call is synchronous from the caller's point of view: it resolves
/// only once the underlying command has completed, successfully or not.
/// Completion of a rename is never assumed; callers re-query via
/// [`list_interfaces`] before acting on the result.
#[async_trait]
pub trait LinkController: Send + Sync {
    /// Returns the raw per-interface text report for all links.
    ///
    /// Failure here is fatal for the run: no partial interface list is
    /// usable.
    async fn list_links(&self) -> EthMgrResult<String>;

    /// Brings the named link down.
    async fn set_link_down(&self, name: &str) -> EthMgrResult<()>;

    /// Renames the link `name` to `new_name`.
    async fn set_link_name(&self, name: &str, new_name: &str) -> EthMgrResult<()>;

    /// Brings the named link up.
    async fn set_link_up(&self, name: &str) -> EthMgrResult<()>;
}

/// Production controller: drives the kernel link layer via `/sbin/ip`.
pub struct ShellLinkController;

#[async_trait]
impl LinkController for ShellLinkController {
    async fn list_links(&self) -> EthMgrResult<String> {
        let cmd = format!("{} link show", IP_CMD);
        shell::exec_or_throw(&cmd)
            .await
            .map_err(|e| EthMgrError::link_query(e.to_string()))
    }

    async fn set_link_down(&self, name: &str) -> EthMgrResult<()> {
        let cmd = format!("{} link set dev {} down", IP_CMD, shellquote(name));
        shell::exec_or_throw(&cmd).await?;
        Ok(())
    }

    async fn set_link_name(&self, name: &str, new_name: &str) -> EthMgrResult<()> {
        let cmd = format!(
            "{} link set dev {} name {}",
            IP_CMD,
            shellquote(name),
            shellquote(new_name)
        );
        shell::exec_or_throw(&cmd).await?;
        Ok(())
    }

    async fn set_link_up(&self, name: &str) -> EthMgrResult<()> {
        let cmd = format!("{} link set dev {} up", IP_CMD, shellquote(name));
        shell::exec_or_throw(&cmd).await?;
        Ok(())
    }
}

/// Enumerates the live interface set, loopback excluded.
///
/// The result reflects link state at call time and must be re-derived after
/// every batch of renames; only `mac_address` is stable across calls.
pub async fn list_interfaces<C: LinkController + ?Sized>(
    ctrl: &C,
) -> EthMgrResult<Vec<Interface>> {
    let raw = ctrl.list_links().await?;
    let interfaces = parse_link_show(&raw);
    for iface in &interfaces {
        debug!(
            "{:>15}: {}{}",
            iface.name,
            iface.mac_address,
            if iface.link_up { " - UP" } else { "" }
        );
    }
    Ok(interfaces)
}

/// One parsed header line, waiting for its address line.
struct LinkHeader {
    name: String,
    link_up: bool,
    loopback: bool,
}

/// Parses `ip link show` output into interfaces, in kernel report order.
///
/// The report interleaves numbered header lines with indented `link/<type>`
/// address lines:
///
/// ```text
/// 2: enp3s0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc fq_codel ...
///     link/ether aa:bb:cc:dd:ee:ff brd ff:ff:ff:ff:ff:ff
/// ```
///
/// Loopback entries are dropped, carrier state comes from the `LOWER_UP`
/// flag, and addresses are stored uppercase. Lines that fit neither shape
/// are ignored.
pub fn parse_link_show(raw: &str) -> Vec<Interface> {
    let mut interfaces = Vec::new();
    let mut header: Option<LinkHeader> = None;

    for line in raw.lines() {
        if let Some(rest) = line.trim_start().strip_prefix("link/") {
            let Some(head) = header.take() else {
                continue;
            };
            let mut parts = rest.split_whitespace();
            let kind = parts.next().unwrap_or("");
            let addr = parts.next();
            if head.loopback || kind == "loopback" {
                continue;
            }
            if let Some(mac) = addr {
                interfaces.push(Interface {
                    name: head.name,
                    mac_address: mac.to_uppercase(),
                    link_up: head.link_up,
                });
            }
        } else if let Some(head) = parse_header_line(line) {
            header = Some(head);
        }
    }

    interfaces
}

/// Parses a numbered header line like `2: enp3s0: <BROADCAST,UP,LOWER_UP> ...`.
fn parse_header_line(line: &str) -> Option<LinkHeader> {
    let mut parts = line.split_whitespace();

    let index = parts.next()?;
    let index = index.strip_suffix(':')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let name = parts.next()?.trim_end_matches(':');
    // VLAN and stacked devices report as "name@parent"
    let name = name.split('@').next().unwrap_or(name);
    let flags = parts.next().unwrap_or("");

    Some(LinkHeader {
        name: name.to_string(),
        link_up: flags.contains("LOWER_UP"),
        loopback: flags.contains("LOOPBACK"),
    })
}
