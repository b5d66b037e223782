//! GitHub Releases API client.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use std::time::Duration;
use tracing::debug;

use super::{CatalogError, ReleaseCatalog, ReleaseRecord};

/// Default GitHub REST API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// User agent sent when none is configured.
pub const USER_AGENT: &str = concat!("release-updater/", env!("CARGO_PKG_VERSION"));

/// Fetches releases from `GET {base}/repos/{owner}/{repository}/releases`.
///
/// The base URL is configurable so GitHub Enterprise hosts and local mock
/// servers work the same way as api.github.com.
#[derive(Debug, Clone)]
pub struct GitHubCatalog {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubCatalog {
    /// Create a client for api.github.com with the default user agent.
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(CatalogError::Client)?;
        Ok(Self::with_client(client))
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }

    /// Point the client at another API host.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Authenticate requests with a bearer token (raises rate limits, allows
    /// private repositories).
    #[must_use]
    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    fn releases_url(&self, owner: &str, repository: &str) -> Result<String, CatalogError> {
        let valid = |part: &str| {
            !part.is_empty() && !part.contains('/') && !part.chars().any(char::is_whitespace)
        };
        if !valid(owner) || !valid(repository) {
            return Err(CatalogError::InvalidRepository {
                owner: owner.to_string(),
                repository: repository.to_string(),
            });
        }

        Ok(format!("{}/repos/{owner}/{repository}/releases", self.base_url))
    }
}

#[async_trait]
impl ReleaseCatalog for GitHubCatalog {
    async fn fetch_all_releases(
        &self,
        owner: &str,
        repository: &str,
    ) -> Result<Vec<ReleaseRecord>, CatalogError> {
        let url = self.releases_url(owner, repository)?;
        debug!("Fetching releases from {}", url);

        let mut request = self
            .client
            .get(&url)
            .query(&[("per_page", "100")])
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(|source| CatalogError::Request {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|source| CatalogError::Request {
            url: url.clone(),
            source,
        })?;

        let records: Vec<ReleaseRecord> = serde_json::from_slice(&bytes)
            .map_err(|source| CatalogError::Decode { url: url.clone(), source })?;

        debug!("Catalog returned {} releases", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_releases_url() {
        let catalog = GitHubCatalog::new().unwrap();
        assert_eq!(
            catalog.releases_url("acme", "desktop").unwrap(),
            "https://api.github.com/repos/acme/desktop/releases"
        );

        let catalog = catalog.base_url("http://127.0.0.1:8080/");
        assert_eq!(
            catalog.releases_url("acme", "desktop").unwrap(),
            "http://127.0.0.1:8080/repos/acme/desktop/releases"
        );
    }

    #[test]
    fn test_releases_url_rejects_invalid_names() {
        let catalog = GitHubCatalog::new().unwrap();
        assert!(matches!(
            catalog.releases_url("", "desktop"),
            Err(CatalogError::InvalidRepository { .. })
        ));
        assert!(catalog.releases_url("acme/evil", "desktop").is_err());
        assert!(catalog.releases_url("acme", "desk top").is_err());
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let catalog = GitHubCatalog::new().unwrap().token(Some(String::new()));
        assert!(catalog.token.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let client = Client::builder().timeout(Duration::from_millis(200)).build().unwrap();
        let catalog = GitHubCatalog::with_client(client).base_url("http://127.0.0.1:1");
        let result = catalog.fetch_all_releases("acme", "desktop").await;
        assert!(matches!(result, Err(CatalogError::Request { .. })));
    }
}
