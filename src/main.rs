//! release-updater CLI entry point
//!
//! - `list` - releases available for this platform
//! - `latest` - the newest release on a channel
//! - `update` - install a release and relaunch the application

use anyhow::Result;
use clap::Parser;
use release_updater::cli;
use release_updater::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
