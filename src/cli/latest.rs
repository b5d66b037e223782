//! `release-updater latest`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{CliConfig, channel_filter};
use crate::Updater;
use crate::core::UpdaterError;
use crate::version::is_newer;

/// Show the newest release on a channel.
#[derive(Debug, Args)]
pub struct LatestCommand {
    /// Consider prereleases only
    #[arg(long, conflicts_with = "any")]
    pub prerelease: bool,

    /// Consider stable releases and prereleases
    #[arg(long)]
    pub any: bool,
}

impl LatestCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_config().await?;
        let updater = Updater::from_config(&config)?;
        let filter = channel_filter(self.prerelease, self.any, config.channel.prerelease);

        let release = updater
            .fetch_latest_release(filter)
            .await?
            .ok_or(UpdaterError::NoReleaseAvailable)?;

        println!("{} {}", release.display_name().bold(), release.version);
        println!("  tag:   {}", release.tag);
        println!("  asset: {}", release.asset_name);
        println!("  url:   {}", release.download_url);

        if let Some(current) = config.current_version() {
            if is_newer(&release.version, &current) {
                println!("{}", format!("Update available: {current} -> {}", release.version).green());
            } else {
                println!("Installed version {current} is up to date");
            }
        }
        Ok(())
    }
}
