//! `release-updater update`
//!
//! Resolves the release to install, runs an [`Update`](crate::update::Update)
//! to it while drawing its progress, and cancels the update on Ctrl-C.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::info;

use super::{CliConfig, channel_filter};
use crate::Updater;
use crate::core::UpdaterError;
use crate::resolver::Release;
use crate::update::UpdateState;
use crate::utils::progress::UpdateProgress;
use crate::version::{Version, is_newer, parse_tag};

/// Download and install a release.
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Version to install (default: the latest release on the channel)
    #[arg(value_name = "VERSION")]
    pub version: Option<String>,

    /// Consider prereleases only
    #[arg(long, conflicts_with = "any")]
    pub prerelease: bool,

    /// Consider stable releases and prereleases
    #[arg(long)]
    pub any: bool,

    /// Install even if the release is not newer than the installed version
    #[arg(long)]
    pub force: bool,
}

impl UpdateCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_config().await?;
        let updater = Updater::from_config(&config)?;
        let current = config.current_version();

        let release = self.resolve(&updater, config.channel.prerelease).await?;

        if let Some(current) = &current {
            if !should_install(&release.version, current, self.force) {
                println!(
                    "{}",
                    format!("Already up to date ({current}, latest {})", release.version).green()
                );
                return Ok(());
            }
        }

        info!("Updating to {} ({})", release.display_name(), release.version);
        let version = release.version.clone();
        let update = updater.update_to(release);
        let follower = UpdateProgress::new(!cli.no_progress).follow(update.subscribe());
        update.start()?;

        tokio::pin!(follower);
        tokio::select! {
            _ = &mut follower => {}
            Ok(()) = tokio::signal::ctrl_c() => {
                info!("Interrupted, canceling update");
                update.cancel();
                follower.await;
            }
        }

        match update.wait().await {
            UpdateState::Completed => {
                println!("{}", format!("Updated to {version}").green());
                Ok(())
            }
            UpdateState::Canceled => Err(UpdaterError::Canceled.into()),
            UpdateState::Failed(error) => Err(UpdaterError::Update(error).into()),
            other => Err(anyhow::anyhow!("update stopped in state {other}")),
        }
    }

    async fn resolve(&self, updater: &Updater, configured: Option<bool>) -> Result<Release> {
        if let Some(requested) = &self.version {
            let version = parse_tag(requested).ok_or_else(|| UpdaterError::InvalidVersion {
                version: requested.clone(),
            })?;
            let release = updater.fetch_release(&version).await?.ok_or_else(|| {
                UpdaterError::ReleaseNotFound {
                    version: version.to_string(),
                }
            })?;
            return Ok(release);
        }

        let filter = channel_filter(self.prerelease, self.any, configured);
        Ok(updater
            .fetch_latest_release(filter)
            .await?
            .ok_or(UpdaterError::NoReleaseAvailable)?)
    }
}

/// Whether to install `candidate` over `current`.
fn should_install(candidate: &Version, current: &Version, force: bool) -> bool {
    force || is_newer(candidate, current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_install() {
        let current = Version::new(1, 4, 0);
        assert!(should_install(&Version::new(1, 5, 0), &current, false));
        assert!(!should_install(&Version::new(1, 4, 0), &current, false));
        assert!(!should_install(&Version::new(1, 3, 0), &current, false));
        assert!(should_install(&Version::new(1, 3, 0), &current, true));
    }
}
