//! Command-line interface for release-updater.
//!
//! # Available Commands
//!
//! - `list` - releases installable on this platform, newest first
//! - `latest` - the newest release on a channel
//! - `update` - download and install a release, then relaunch
//!
//! # Global Options
//!
//! - `-v, --verbose` - debug logging
//! - `-q, --quiet` - no logging and no progress indicators
//! - `--config PATH` - configuration file (also `RELEASE_UPDATER_CONFIG`)
//! - `--no-progress` - no progress indicators (also `RELEASE_UPDATER_NO_PROGRESS`)
//!
//! # Examples
//!
//! ```bash
//! release-updater list --all
//! release-updater latest --prerelease
//! release-updater update
//! release-updater update 1.4.0 --force
//! release-updater --config ./updater.toml --no-progress update --any
//! ```

mod latest;
mod list;
mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::UpdaterConfig;

pub use latest::LatestCommand;
pub use list::ListCommand;
pub use update::UpdateCommand;

/// Settings derived from the global flags, passed to every command.
///
/// Tests build one directly instead of parsing arguments.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Level for this crate's logs; `None` disables logging unless `RUST_LOG`
    /// is set.
    pub log_level: Option<String>,
    /// Hide progress indicators.
    pub no_progress: bool,
    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// `RUST_LOG` takes precedence over [`log_level`](Self::log_level).
    pub fn init_logging(&self) {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => match &self.log_level {
                Some(level) => EnvFilter::new(format!("release_updater={level}")),
                None => return,
            },
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Load the configuration file and check it.
    pub async fn load_config(&self) -> Result<UpdaterConfig> {
        let config = UpdaterConfig::load_with_optional(self.config_path.clone()).await?;
        config.validate()?;
        Ok(config)
    }
}

/// Update a desktop application from its GitHub Releases.
#[derive(Parser, Debug)]
#[command(
    name = "release-updater",
    about = "Update a desktop application from its GitHub Releases",
    version,
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress logging and progress indicators
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable progress indicators
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the releases available for this platform
    List(ListCommand),

    /// Show the newest release
    Latest(LatestCommand),

    /// Download and install a release
    Update(UpdateCommand),
}

impl Cli {
    /// Parse-independent entry point used by `main`.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress || self.quiet,
            config_path: self.config.clone(),
        }
    }

    /// Run the selected command with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::List(cmd) => cmd.execute(&config).await,
            Commands::Latest(cmd) => cmd.execute(&config).await,
            Commands::Update(cmd) => cmd.execute(&config).await,
        }
    }
}

/// Prerelease filter selected by `--prerelease`/`--any`, falling back to the
/// configured channel.
fn channel_filter(prerelease: bool, any: bool, configured: Option<bool>) -> Option<bool> {
    if any {
        None
    } else if prerelease {
        Some(true)
    } else {
        configured
    }
}
