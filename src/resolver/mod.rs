//! Release resolution: from raw catalog records to installable releases.
//!
//! The catalog lists everything that was ever published. Only some of it can
//! be offered as an update to the running application:
//!
//! 1. drafts are skipped,
//! 2. the tag must parse as a semantic version ([`crate::version::parse_tag`]),
//! 3. exactly one asset must satisfy the [`AssetMatcher`]; two matching
//!    assets is ambiguous and the release is skipped rather than guessed.
//!
//! Survivors become [`Release`] values, sorted newest first.
//!
//! # Examples
//!
//! ```rust,no_run
//! use release_updater::catalog::GitHubCatalog;
//! use release_updater::matcher::SuffixMatcher;
//! use release_updater::resolver::ReleaseResolver;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let resolver = ReleaseResolver::new(
//!     Arc::new(GitHubCatalog::new()?),
//!     "acme",
//!     "desktop",
//!     Arc::new(SuffixMatcher::new("-macos.zip")),
//! );
//!
//! if let Some(release) = resolver.fetch_latest_release(Some(false)).await? {
//!     println!("Latest stable: {} ({})", release.version, release.name);
//! }
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::catalog::{CatalogError, ReleaseCatalog, ReleaseRecord};
use crate::matcher::AssetMatcher;
use crate::version::{Version, parse_tag};

/// A published release that can be installed on this platform.
///
/// Only produced by [`resolve_releases`], so every `Release` is a non-draft
/// with a valid version and exactly one matching asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Display name of the release.
    pub name: String,
    /// Release notes.
    pub body: String,
    /// Tag the release was published from.
    pub tag: String,
    /// Version parsed from the tag.
    pub version: Version,
    pub is_prerelease: bool,
    pub published_at: Option<DateTime<Utc>>,
    /// File name of the selected asset.
    pub asset_name: String,
    /// Download URL of the selected asset.
    pub download_url: String,
}

impl Release {
    /// Display name, falling back to the tag for unnamed releases.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() { &self.tag } else { &self.name }
    }
}

/// Filter and sort raw records into installable releases, newest first.
///
/// Releases with equal versions keep their catalog order (stable sort), but
/// callers must not depend on it.
pub fn resolve_releases(records: Vec<ReleaseRecord>, matcher: &dyn AssetMatcher) -> Vec<Release> {
    let mut releases: Vec<Release> =
        records.into_iter().filter_map(|record| resolve_record(record, matcher)).collect();

    releases.sort_by(|a, b| b.version.cmp(&a.version));
    releases
}

fn resolve_record(record: ReleaseRecord, matcher: &dyn AssetMatcher) -> Option<Release> {
    if record.draft {
        trace!("Skipping draft release {}", record.tag_name);
        return None;
    }

    let Some(version) = parse_tag(&record.tag_name) else {
        debug!("Skipping release with non-semver tag '{}'", record.tag_name);
        return None;
    };

    let mut matching = record.assets.into_iter().filter(|asset| matcher.matches(&asset.name));
    let asset = match (matching.next(), matching.next()) {
        (Some(asset), None) => asset,
        (None, _) => {
            trace!("Release {} has no asset for this platform", record.tag_name);
            return None;
        }
        (Some(_), Some(_)) => {
            debug!(
                "Skipping release {}: more than one asset matches this platform",
                record.tag_name
            );
            return None;
        }
    };

    Some(Release {
        name: record.name,
        body: record.body,
        tag: record.tag_name,
        version,
        is_prerelease: record.prerelease,
        published_at: record.published_at,
        asset_name: asset.name,
        download_url: asset.download_url,
    })
}

/// First release of a newest-first list that satisfies the prerelease filter.
///
/// `Some(true)` selects the newest prerelease, `Some(false)` the newest
/// stable release, `None` the newest release of either kind.
#[must_use]
pub fn latest_release(releases: &[Release], prerelease: Option<bool>) -> Option<&Release> {
    releases
        .iter()
        .find(|release| prerelease.is_none_or(|wanted| release.is_prerelease == wanted))
}

/// Resolves the releases of one repository against one asset matcher.
#[derive(Clone)]
pub struct ReleaseResolver {
    catalog: Arc<dyn ReleaseCatalog>,
    owner: String,
    repository: String,
    matcher: Arc<dyn AssetMatcher>,
}

impl ReleaseResolver {
    pub fn new(
        catalog: Arc<dyn ReleaseCatalog>,
        owner: impl Into<String>,
        repository: impl Into<String>,
        matcher: Arc<dyn AssetMatcher>,
    ) -> Self {
        Self {
            catalog,
            owner: owner.into(),
            repository: repository.into(),
            matcher,
        }
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// All installable releases, sorted from highest version to lowest.
    pub async fn fetch_all_releases(&self) -> Result<Vec<Release>, CatalogError> {
        let records = self.catalog.fetch_all_releases(&self.owner, &self.repository).await?;
        let total = records.len();
        let releases = resolve_releases(records, self.matcher.as_ref());
        debug!(
            "Resolved {} of {} releases for {}/{}",
            releases.len(),
            total,
            self.owner,
            self.repository
        );
        Ok(releases)
    }

    /// The latest release satisfying the prerelease filter, if any.
    ///
    /// See [`latest_release`] for the meaning of `prerelease`.
    pub async fn fetch_latest_release(
        &self,
        prerelease: Option<bool>,
    ) -> Result<Option<Release>, CatalogError> {
        let releases = self.fetch_all_releases().await?;
        Ok(latest_release(&releases, prerelease).cloned())
    }
}

impl std::fmt::Debug for ReleaseResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseResolver")
            .field("owner", &self.owner)
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}
