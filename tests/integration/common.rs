//! Helpers shared by the integration tests.

use release_updater::catalog::GitHubCatalog;
use serde_json::{Value, json};
use wiremock::MockServer;

/// Catalog client pointed at `server`.
pub fn catalog_for(server: &MockServer) -> GitHubCatalog {
    GitHubCatalog::new().unwrap().base_url(server.uri())
}

/// A GitHub release object with assets served by `server` under
/// `/download/{tag}/{name}`.
pub fn release_json(server: &MockServer, tag: &str, prerelease: bool, assets: &[&str]) -> Value {
    let assets: Vec<Value> = assets
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "browser_download_url": format!("{}/download/{tag}/{name}", server.uri()),
                "size": 1024,
                "content_type": "application/zip",
            })
        })
        .collect();

    json!({
        "tag_name": tag,
        "name": format!("Desktop {}", tag.trim_start_matches('v')),
        "draft": false,
        "prerelease": prerelease,
        "body": null,
        "published_at": "2024-05-01T12:00:00Z",
        "html_url": format!("https://github.com/acme/desktop/releases/tag/{tag}"),
        "assets": assets,
    })
}
