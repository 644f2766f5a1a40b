//! ethmgrd daemon entry point.
//!
//! Parses the command line, initializes logging, optionally installs the
//! systemd unit, then runs the rename pipeline once.
//!
//! Exit codes: 0 on success, 1 if the rename core fails fatally (link
//! state could not be observed), 2 if installation fails.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use ethmgrd::config::{ConfigCatalog, DEFAULT_CONFIG_DIR};
use ethmgrd::install::Installer;
use ethmgrd::link::ShellLinkController;
use ethmgrd::rename_mgr::RenameMgr;

/// Persistently names network interfaces to the ethN convention.
#[derive(Parser, Debug)]
#[command(name = "ethmgrd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Install as a systemd unit that executes prior to network.target
    #[arg(short, long)]
    install: bool,

    /// Directory holding the ifcfg-ethN configuration files
    #[arg(long, default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

/// Initialize tracing/logging.
fn init_logging(level: &str) {
    let level: Level = level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting ethmgrd ---");

    if args.install {
        let mut installer = Installer::new();
        if let Err(e) = installer.install().await {
            error!("Failed to install: {}", e);
            return ExitCode::from(2);
        }
        info!("Installed; continuing with the rename run");
    }

    info!(
        "Loading configuration files in {}",
        args.config_dir.display()
    );
    let catalog = ConfigCatalog::load(&args.config_dir);
    info!("Loaded {} configuration records", catalog.len());

    let mut mgr = RenameMgr::new(ShellLinkController, catalog);
    match mgr.run().await {
        Ok(summary) => {
            info!(
                "{} interfaces: {} matched, {} fallback-assigned, {} failures",
                summary.total, summary.matched, summary.fallback_assigned, summary.failures
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("ethmgrd error: {}", e);
            ExitCode::FAILURE
        }
    }
}
