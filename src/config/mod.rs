//! Configuration for release-updater.
//!
//! A single user-level TOML file drives the command line tool. See
//! [`global`] for its location and format. Library users can skip the file
//! entirely and configure an [`Updater`](crate::Updater) through its builder.

mod global;

pub use global::{
    AssetsConfig, CONFIG_PATH_ENV, ChannelConfig, ExtractorKind, InstallConfig, NetworkConfig,
    RepositoryConfig, TOKEN_ENV, UpdaterConfig,
};
