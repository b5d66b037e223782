//! release-updater - self-update for desktop applications
//!
//! Applications published through GitHub Releases use this crate to find out
//! whether a newer version exists, download the archive built for the running
//! platform, unpack it, replace the installed application and relaunch it.
//!
//! # Architecture Overview
//!
//! - The [`catalog`] lists raw release records of a repository.
//! - The [`resolver`] turns records into installable [`Release`](resolver::Release)s:
//!   drafts, non-semver tags and releases without exactly one matching asset
//!   are dropped, the rest sorted newest first. Asset selection is pluggable
//!   through [`matcher`].
//! - An [`Update`](update::Update) drives one release through
//!   download, extraction, installation and relaunch, publishing its
//!   [`UpdateState`](update::UpdateState) on a watch channel. It can be
//!   canceled at any point and cleans up its temporary files however it ends.
//! - [`Updater`] ties a resolver to the update collaborators.
//!
//! # Core Modules
//!
//! - [`catalog`] - release records and the GitHub API client
//! - [`matcher`] - asset name matching (suffix, glob, regex, platform)
//! - [`version`] - release tag parsing
//! - [`resolver`] - installable releases and the latest one per channel
//! - [`update`] - the update lifecycle and its transfer, extract and install steps
//! - [`updater`] - the facade applications use
//! - [`config`] - the TOML configuration used by the command line tool
//! - [`core`] - error aggregation and user-facing error messages
//! - [`cli`] - the `release-updater` command line tool
//! - [`utils`] - file system, platform and progress helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use release_updater::Updater;
//! use release_updater::version::Version;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let updater = Updater::builder("acme", "desktop").build()?;
//! if let Some(release) = updater.newer_than(&Version::new(1, 4, 0)).await? {
//!     let update = updater.update_to(release);
//!     update.start()?;
//!     update.wait().await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod matcher;
pub mod resolver;
pub mod update;
pub mod updater;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use updater::{Updater, UpdaterBuilder};
