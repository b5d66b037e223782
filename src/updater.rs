//! The entry point applications use to update themselves.
//!
//! An [`Updater`] is bound to one repository and one set of update
//! collaborators. It answers "which releases exist" and "is there something
//! newer than what is running", and creates an [`Update`] for a chosen
//! release. Every update it creates shares the same collaborators but owns its
//! own state and transfer.
//!
//! # Examples
//!
//! ```rust,no_run
//! use release_updater::Updater;
//! use release_updater::version::Version;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let updater = Updater::builder("acme", "desktop").prerelease(Some(false)).build()?;
//!
//! let current = Version::new(1, 4, 0);
//! if let Some(release) = updater.newer_than(&current).await? {
//!     let update = updater.update_to(release);
//!     update.start()?;
//!     println!("{}", update.wait().await);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{CatalogError, GitHubCatalog, ReleaseCatalog, USER_AGENT};
use crate::config::{ExtractorKind, UpdaterConfig};
use crate::core::UpdaterError;
use crate::matcher::{AssetMatcher, PlatformMatcher};
use crate::resolver::{Release, ReleaseResolver};
use crate::update::{
    BundleInstaller, CommandExtractor, Extractor, HttpTransport, Installer, Pipeline,
    Transport, Update, ZipExtractor,
};
use crate::version::{Version, is_newer};

/// Resolves releases of one repository and starts updates to them.
#[derive(Debug, Clone)]
pub struct Updater {
    resolver: ReleaseResolver,
    pipeline: Arc<Pipeline>,
    prerelease: Option<bool>,
}

impl Updater {
    /// Start configuring an updater for `owner/repository`.
    pub fn builder(owner: impl Into<String>, repository: impl Into<String>) -> UpdaterBuilder {
        UpdaterBuilder::new(owner, repository)
    }

    /// Build an updater from a loaded configuration file.
    ///
    /// The catalog client and the transport share one HTTP client carrying
    /// the configured user agent and timeout.
    pub fn from_config(config: &UpdaterConfig) -> Result<Self, UpdaterError> {
        config.validate()?;

        let user_agent = config.network.user_agent.as_deref().unwrap_or(USER_AGENT);
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(config.timeout())
            .build()
            .map_err(CatalogError::Client)?;

        let catalog = GitHubCatalog::with_client(client.clone())
            .base_url(config.repository.api_base_url.as_str())
            .token(config.token());

        let extractor: Arc<dyn Extractor> = match config.install.extractor {
            ExtractorKind::Zip => Arc::new(ZipExtractor),
            ExtractorKind::Command => {
                Arc::new(CommandExtractor::new(config.install.unpack_command.iter()))
            }
        };

        let installer = match config.install_target()? {
            Some(target) => BundleInstaller::new(target),
            None => BundleInstaller::for_current_app()?,
        }
        .with_relaunch(config.install.relaunch)
        .exit_after_relaunch(config.install.exit_after_relaunch);

        debug!(
            "Updater for {}/{} installs into {}",
            config.repository.owner,
            config.repository.name,
            installer.target().display()
        );

        Self::builder(config.repository.owner.as_str(), config.repository.name.as_str())
            .catalog(Arc::new(catalog))
            .matcher(config.matcher()?)
            .transport(Arc::new(HttpTransport::with_client(client)))
            .extractor(extractor)
            .installer(Arc::new(installer))
            .bundle_extension(config.install.bundle_extension.as_str())
            .prerelease(config.channel.prerelease)
            .build()
    }

    #[must_use]
    pub const fn resolver(&self) -> &ReleaseResolver {
        &self.resolver
    }

    /// Prerelease filter used by [`latest_release`](Self::latest_release).
    #[must_use]
    pub const fn channel(&self) -> Option<bool> {
        self.prerelease
    }

    /// All installable releases, newest first.
    pub async fn fetch_all_releases(&self) -> Result<Vec<Release>, CatalogError> {
        self.resolver.fetch_all_releases().await
    }

    /// Latest release for an explicit prerelease filter.
    pub async fn fetch_latest_release(
        &self,
        prerelease: Option<bool>,
    ) -> Result<Option<Release>, CatalogError> {
        self.resolver.fetch_latest_release(prerelease).await
    }

    /// Latest release on the configured channel.
    pub async fn latest_release(&self) -> Result<Option<Release>, CatalogError> {
        self.fetch_latest_release(self.prerelease).await
    }

    /// The release with exactly `version`, if it is installable.
    pub async fn fetch_release(&self, version: &Version) -> Result<Option<Release>, CatalogError> {
        let releases = self.fetch_all_releases().await?;
        Ok(releases.into_iter().find(|release| &release.version == version))
    }

    /// Latest release on the configured channel, only if it is strictly newer
    /// than `current`.
    pub async fn newer_than(&self, current: &Version) -> Result<Option<Release>, CatalogError> {
        let latest = self.latest_release().await?;
        Ok(latest.filter(|release| is_newer(&release.version, current)))
    }

    /// A new, not yet started update to `release`.
    #[must_use]
    pub fn update_to(&self, release: Release) -> Update {
        Update::new(release, Arc::clone(&self.pipeline))
    }
}

/// Configures an [`Updater`]. Unset collaborators get the built-in defaults.
pub struct UpdaterBuilder {
    owner: String,
    repository: String,
    catalog: Option<Arc<dyn ReleaseCatalog>>,
    matcher: Option<Arc<dyn AssetMatcher>>,
    transport: Option<Arc<dyn Transport>>,
    extractor: Option<Arc<dyn Extractor>>,
    installer: Option<Arc<dyn Installer>>,
    bundle_extension: String,
    staging_dir: Option<PathBuf>,
    prerelease: Option<bool>,
}

impl UpdaterBuilder {
    fn new(owner: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            catalog: None,
            matcher: None,
            transport: None,
            extractor: None,
            installer: None,
            bundle_extension: "app".to_string(),
            staging_dir: None,
            prerelease: None,
        }
    }

    /// Default: [`GitHubCatalog`] against api.github.com.
    #[must_use]
    pub fn catalog(mut self, catalog: Arc<dyn ReleaseCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Default: [`PlatformMatcher::current`].
    #[must_use]
    pub fn matcher(mut self, matcher: Arc<dyn AssetMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Default: [`HttpTransport`].
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Default: [`ZipExtractor`].
    #[must_use]
    pub fn extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Default: [`BundleInstaller::for_current_app`].
    #[must_use]
    pub fn installer(mut self, installer: Arc<dyn Installer>) -> Self {
        self.installer = Some(installer);
        self
    }

    #[must_use]
    pub fn bundle_extension(mut self, extension: impl Into<String>) -> Self {
        self.bundle_extension = extension.into();
        self
    }

    /// Directory downloads are staged in. Default: the system temp directory.
    #[must_use]
    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub const fn prerelease(mut self, prerelease: Option<bool>) -> Self {
        self.prerelease = prerelease;
        self
    }

    /// Create the updater, constructing any default collaborator not set.
    pub fn build(self) -> Result<Updater, UpdaterError> {
        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => Arc::new(GitHubCatalog::new()?),
        };
        let matcher = match self.matcher {
            Some(matcher) => matcher,
            None => Arc::new(PlatformMatcher::current()?),
        };
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };
        let extractor = self.extractor.unwrap_or_else(|| Arc::new(ZipExtractor));
        let installer = match self.installer {
            Some(installer) => installer,
            None => Arc::new(BundleInstaller::for_current_app()?),
        };

        let mut pipeline =
            Pipeline::new(transport, extractor, installer).bundle_extension(self.bundle_extension);
        if let Some(dir) = self.staging_dir {
            pipeline = pipeline.staging_dir(dir);
        }

        Ok(Updater {
            resolver: ReleaseResolver::new(catalog, self.owner, self.repository, matcher),
            pipeline: Arc::new(pipeline),
            prerelease: self.prerelease,
        })
    }
}
