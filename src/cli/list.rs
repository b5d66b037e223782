//! `release-updater list`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliConfig;
use crate::Updater;
use crate::resolver::Release;
use crate::version::Version;

/// List the releases installable on this platform, newest first.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Include prereleases
    #[arg(long)]
    pub all: bool,
}

impl ListCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_config().await?;
        let updater = Updater::from_config(&config)?;
        let current = config.current_version();

        let releases: Vec<Release> = updater
            .fetch_all_releases()
            .await?
            .into_iter()
            .filter(|release| self.all || !release.is_prerelease)
            .collect();

        if releases.is_empty() {
            println!("{}", "No releases available for this platform".yellow());
            return Ok(());
        }

        for release in &releases {
            println!("{}", format_release_line(release, current.as_ref()));
        }
        Ok(())
    }
}

/// `1.5.0  Desktop 1.5.0  2024-05-01  desktop-macos.zip  [prerelease] (installed)`
pub(crate) fn format_release_line(release: &Release, current: Option<&Version>) -> String {
    let mut line = format!("{:<14}", release.version.to_string().bold());
    line.push_str(&format!("  {}", release.display_name()));
    if let Some(published) = release.published_at {
        line.push_str(&format!("  {}", published.format("%Y-%m-%d")));
    }
    line.push_str(&format!("  {}", release.asset_name.dimmed()));
    if release.is_prerelease {
        line.push_str(&format!("  {}", "[prerelease]".yellow()));
    }
    if current == Some(&release.version) {
        line.push_str(&format!("  {}", "(installed)".green()));
    }
    line
}
