//! User configuration file for release-updater.
//!
//! The configuration names the repository whose releases are installed, how
//! the right asset is picked, which release channel is followed and how the
//! new version is put in place.
//!
//! # Configuration File Location
//!
//! - **Unix/macOS**: `~/.release-updater/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\release-updater\config.toml`
//!
//! The location can be overridden with the `RELEASE_UPDATER_CONFIG`
//! environment variable or the `--config` command line option. A missing file
//! yields the defaults.
//!
//! # File Format
//!
//! ```toml
//! [repository]
//! owner = "acme"
//! name = "desktop"
//! # api_base_url = "https://github.example.com/api/v3"
//! # token = "ghp_xxx"   # GITHUB_TOKEN is used when unset
//!
//! [assets]
//! # At most one of suffix / glob / regex. Without any, the asset naming the
//! # current OS and architecture is picked.
//! glob = "desktop-*-macos-arm64.zip"
//!
//! [channel]
//! prerelease = false    # true: prereleases only; unset: any release
//!
//! [install]
//! current_version = "1.4.0"
//! bundle_extension = "app"
//! target = "~/Applications/Desktop.app"
//! extractor = "command"
//! unpack_command = ["ditto", "-x", "-k", "{archive}", "{dest}"]
//! relaunch = true
//! exit_after_relaunch = true
//!
//! [network]
//! timeout_secs = 300
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use release_updater::config::UpdaterConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = UpdaterConfig::load().await?;
//! config.validate()?;
//! println!("Updating {}/{}", config.repository.owner, config.repository.name);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::catalog::DEFAULT_API_URL;
use crate::core::UpdaterError;
use crate::matcher::{AssetMatcher, GlobMatcher, MatcherError, PlatformMatcher, RegexMatcher, SuffixMatcher};
use crate::version::{Version, parse_tag};

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "RELEASE_UPDATER_CONFIG";

/// Environment variable providing the catalog token when the file has none.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    pub repository: RepositoryConfig,
    pub assets: AssetsConfig,
    pub channel: ChannelConfig,
    pub install: InstallConfig,
    pub network: NetworkConfig,
}

/// `[repository]`: where releases are published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub owner: String,
    pub name: String,
    pub api_base_url: String,
    /// Bearer token for the catalog API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            name: String::new(),
            api_base_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }
}

/// `[assets]`: which release asset to download.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Archive extension the platform matcher requires (e.g. `"zip"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

/// `[channel]`: which releases count as updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// `Some(true)` prereleases only, `Some(false)` stable only, `None` any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prerelease: Option<bool>,
}

/// How downloaded archives are unpacked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// In-process zip extraction.
    #[default]
    Zip,
    /// External program from `unpack_command`.
    Command,
}

/// `[install]`: how the new version replaces the installed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Version of the installed application, for "is there anything newer".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
    pub bundle_extension: String,
    /// Installed application path; derived from the running executable when
    /// unset. `~` and environment variables are expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub extractor: ExtractorKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unpack_command: Vec<String>,
    pub relaunch: bool,
    pub exit_after_relaunch: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            current_version: None,
            bundle_extension: "app".to_string(),
            target: None,
            extractor: ExtractorKind::Zip,
            unpack_command: Vec::new(),
            relaunch: true,
            exit_after_relaunch: true,
        }
    }
}

/// `[network]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: 300,
        }
    }
}

impl UpdaterConfig {
    /// Load from the default location, or defaults if there is no file.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, otherwise from the default location.
    ///
    /// An explicitly given path must exist.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(UpdaterError::ConfigNotFound {
                        path: path.display().to_string(),
                    }
                    .into());
                }
                Self::load_from(&path).await
            }
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_from(&path).await
                } else {
                    debug!("No configuration at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write to `path`, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Default file location, honoring [`CONFIG_PATH_ENV`].
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("release-updater")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".release-updater")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Check the settings that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), UpdaterError> {
        let invalid = |message: &str| {
            Err(UpdaterError::ConfigError {
                message: message.to_string(),
            })
        };

        if self.repository.owner.trim().is_empty() || self.repository.name.trim().is_empty() {
            return invalid("[repository] owner and name must be set");
        }

        let selectors = [&self.assets.suffix, &self.assets.glob, &self.assets.regex]
            .iter()
            .filter(|s| s.is_some())
            .count();
        if selectors > 1 {
            return invalid("[assets] accepts only one of suffix, glob or regex");
        }

        if self.install.bundle_extension.trim_start_matches('.').is_empty() {
            return invalid("[install] bundle_extension must not be empty");
        }

        if self.install.extractor == ExtractorKind::Command && self.install.unpack_command.is_empty()
        {
            return invalid("[install] extractor = \"command\" requires unpack_command");
        }

        if let Some(version) = &self.install.current_version {
            if parse_tag(version).is_none() {
                return Err(UpdaterError::InvalidVersion {
                    version: version.clone(),
                });
            }
        }

        if self.network.timeout_secs == 0 {
            return invalid("[network] timeout_secs must be positive");
        }
        Ok(())
    }

    /// Build the configured asset matcher.
    pub fn matcher(&self) -> Result<Arc<dyn AssetMatcher>, MatcherError> {
        let assets = &self.assets;
        if let Some(suffix) = &assets.suffix {
            return Ok(Arc::new(SuffixMatcher::new(suffix.as_str())));
        }
        if let Some(glob) = &assets.glob {
            return Ok(Arc::new(GlobMatcher::new(glob)?));
        }
        if let Some(regex) = &assets.regex {
            return Ok(Arc::new(RegexMatcher::new(regex)?));
        }

        let platform = PlatformMatcher::current()?;
        Ok(Arc::new(match &assets.extension {
            Some(ext) => platform.with_extension(ext),
            None => platform,
        }))
    }

    /// Catalog token from the file, falling back to [`TOKEN_ENV`].
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.repository
            .token
            .clone()
            .or_else(|| std::env::var(TOKEN_ENV).ok())
            .filter(|t| !t.trim().is_empty())
    }

    /// Expanded install target, if configured.
    pub fn install_target(&self) -> Result<Option<PathBuf>, UpdaterError> {
        let Some(target) = &self.install.target else {
            return Ok(None);
        };
        let expanded = shellexpand::full(target).map_err(|e| UpdaterError::ConfigError {
            message: format!("cannot expand install target '{target}': {e}"),
        })?;
        Ok(Some(PathBuf::from(expanded.as_ref())))
    }

    /// Parsed `current_version`.
    #[must_use]
    pub fn current_version(&self) -> Option<Version> {
        self.install.current_version.as_deref().and_then(parse_tag)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout_secs)
    }

    /// Minimal valid configuration for the `acme/desktop` repository.
    #[must_use]
    pub fn example() -> Self {
        Self {
            repository: RepositoryConfig {
                owner: "acme".to_string(),
                name: "desktop".to_string(),
                ..RepositoryConfig::default()
            },
            channel: ChannelConfig {
                prerelease: Some(false),
            },
            ..Self::default()
        }
    }
}
