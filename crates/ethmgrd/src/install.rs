//! Install mode: registers the renamer as a boot-time systemd unit.
//!
//! Installation copies the running binary to a fixed system path, writes a
//! oneshot service unit ordered `Before=network.target`, and asks systemd
//! to reload and enable it. Any failure here is fatal and halts before the
//! renaming core runs.

use std::env;
use std::fs;
use std::path::PathBuf;

use tracing::info;

use ethmgr_common::{
    shell::{self, SYSTEMCTL_CMD},
    EthMgrError, EthMgrResult,
};

/// Where the service unit is written.
pub const UNIT_PATH: &str = "/etc/systemd/system/ethmgrd.service";

/// Where the binary is installed for the unit to execute.
pub const BINARY_PATH: &str = "/usr/sbin/ethmgrd";

/// Name of the service registered with systemd.
pub const SERVICE_NAME: &str = "ethmgrd";

const UNIT_TEXT: &str = "\
[Unit]
Description=Persistently name network interfaces to the ethN convention
Before=network.target

[Service]
Type=oneshot
ExecStart=/usr/sbin/ethmgrd

[Install]
WantedBy=network.target
";

/// Installs the binary and service unit, then reloads and enables the
/// service.
pub struct Installer {
    unit_path: PathBuf,
    binary_path: PathBuf,

    /// Mock mode for testing (don't invoke systemctl).
    #[cfg(test)]
    mock_mode: bool,

    /// Captured systemctl commands in mock mode.
    #[cfg(test)]
    captured_commands: Vec<String>,
}

impl Installer {
    /// Creates an installer targeting the standard system paths.
    pub fn new() -> Self {
        Self {
            unit_path: PathBuf::from(UNIT_PATH),
            binary_path: PathBuf::from(BINARY_PATH),
            #[cfg(test)]
            mock_mode: false,
            #[cfg(test)]
            captured_commands: Vec::new(),
        }
    }

    #[cfg(test)]
    fn with_paths(unit_path: PathBuf, binary_path: PathBuf) -> Self {
        Self {
            unit_path,
            binary_path,
            mock_mode: true,
            captured_commands: Vec::new(),
        }
    }

    /// Runs the full install sequence: binary copy, unit write,
    /// `daemon-reload`, `enable`.
    pub async fn install(&mut self) -> EthMgrResult<()> {
        let source =
            env::current_exe().map_err(|e| EthMgrError::install_write(&self.binary_path, e))?;

        info!(
            "Copying {} to {}",
            source.display(),
            self.binary_path.display()
        );
        fs::copy(&source, &self.binary_path)
            .map_err(|e| EthMgrError::install_write(&self.binary_path, e))?;

        info!("Writing service unit to {}", self.unit_path.display());
        fs::write(&self.unit_path, UNIT_TEXT)
            .map_err(|e| EthMgrError::install_write(&self.unit_path, e))?;

        info!("Issuing a daemon-reload to systemd");
        self.run_systemctl("daemon-reload").await?;

        info!("Enabling the {} service", SERVICE_NAME);
        self.run_systemctl(&format!("enable {}", SERVICE_NAME))
            .await?;

        Ok(())
    }

    async fn run_systemctl(&mut self, args: &str) -> EthMgrResult<()> {
        let cmd = format!("{} {}", SYSTEMCTL_CMD, args);

        #[cfg(test)]
        if self.mock_mode {
            self.captured_commands.push(cmd);
            return Ok(());
        }

        shell::exec_or_throw(&cmd).await?;
        Ok(())
    }
}

impl Default for Installer {
    fn default() -> Self {
        Self::new()
    }
}
