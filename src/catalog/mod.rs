//! Raw release catalog records and the client trait that produces them.
//!
//! The catalog is the remote listing of every published release of an
//! application. This module only describes its shape: [`ReleaseRecord`] and
//! [`AssetRecord`] mirror the JSON returned by the GitHub releases endpoint,
//! and [`ReleaseCatalog`] is the seam the [resolver](crate::resolver) consumes.
//! Filtering, version parsing and ordering happen in the resolver, never here.
//!
//! [`GitHubCatalog`] is the HTTP implementation used by the binary.

mod github;

pub use github::{DEFAULT_API_URL, GitHubCatalog, USER_AGENT};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A release exactly as the catalog reports it.
///
/// Records are transient: the resolver consumes them and keeps only the
/// [`Release`](crate::resolver::Release) values it derives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// Git tag the release was published from (e.g. `"v1.4.0"`).
    pub tag_name: String,
    /// Display name. GitHub reports `null` for unnamed releases.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Drafts are never offered as updates.
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    /// Release notes (markdown).
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<AssetRecord>,
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// File name (e.g. `"desktop-1.4.0-macos-arm64.zip"`).
    pub name: String,
    /// Direct download URL.
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Errors raised while fetching or decoding the release catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Owner or repository name cannot form a catalog URL.
    #[error("invalid repository '{owner}/{repository}'")]
    InvalidRepository {
        /// Repository owner as given
        owner: String,
        /// Repository name as given
        repository: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// The request never produced a response.
    #[error("failed to request releases from {url}")]
    Request {
        /// Catalog URL
        url: String,
        /// Transport error
        #[source]
        source: reqwest::Error,
    },

    /// The catalog answered with a non-success status.
    #[error("release catalog returned HTTP {status} for {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Catalog URL
        url: String,
        /// Response body, for diagnostics
        body: String,
    },

    /// The response body is not a JSON array of releases.
    #[error("failed to decode releases from {url}")]
    Decode {
        /// Catalog URL
        url: String,
        /// Decoding error
        #[source]
        source: serde_json::Error,
    },
}

/// Source of raw release records for a repository.
#[async_trait]
pub trait ReleaseCatalog: Send + Sync {
    /// Fetch every release of `owner/repository`, in catalog order.
    async fn fetch_all_releases(
        &self,
        owner: &str,
        repository: &str,
    ) -> Result<Vec<ReleaseRecord>, CatalogError>;
}
