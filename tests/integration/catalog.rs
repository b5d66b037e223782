use release_updater::catalog::{CatalogError, ReleaseCatalog};
use release_updater::matcher::SuffixMatcher;
use release_updater::resolver::ReleaseResolver;
use release_updater::version::Version;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{catalog_for, release_json};

#[tokio::test]
async fn test_fetches_releases_with_github_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/desktop/releases"))
        .and(query_param("per_page", "100"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            release_json(&server, "v1.1.0", false, &["desktop-macos.zip"]),
            release_json(&server, "v1.0.0", false, &["desktop-macos.zip"]),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let records = catalog_for(&server).fetch_all_releases("acme", "desktop").await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].tag_name, "v1.1.0");
    assert_eq!(records[0].body, "");
    assert!(records[0].published_at.is_some());
    assert!(records[0].assets[0].download_url.ends_with("/download/v1.1.0/desktop-macos.zip"));
}

#[tokio::test]
async fn test_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/desktop/releases"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let catalog = catalog_for(&server).token(Some("secret-token".to_string()));
    let records = catalog.fetch_all_releases("acme", "desktop").await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/missing/releases"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"message\":\"Not Found\"}"))
        .mount(&server)
        .await;

    let error = catalog_for(&server).fetch_all_releases("acme", "missing").await.unwrap_err();
    match error {
        CatalogError::Status { status, url, body } => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/repos/acme/missing/releases"));
            assert!(body.contains("Not Found"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/desktop/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let error = catalog_for(&server).fetch_all_releases("acme", "desktop").await.unwrap_err();
    assert!(matches!(error, CatalogError::Decode { .. }));
}

#[tokio::test]
async fn test_resolver_over_github_records() {
    let server = MockServer::start().await;
    let mut draft = release_json(&server, "v3.0.0", false, &["desktop-macos.zip"]);
    draft["draft"] = json!(true);

    Mock::given(method("GET"))
        .and(path("/repos/acme/desktop/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            draft,
            release_json(&server, "nightly", false, &["desktop-macos.zip"]),
            release_json(&server, "v1.2.0", false, &["desktop-macos.zip"]),
            release_json(&server, "v2.0.0-beta.1", true, &["desktop-macos.zip"]),
            release_json(&server, "v1.10.0", false, &["desktop-macos.zip", "desktop-linux.zip"]),
            release_json(&server, "v1.11.0", false, &["desktop-linux.zip"]),
        ])))
        .mount(&server)
        .await;

    let resolver = ReleaseResolver::new(
        Arc::new(catalog_for(&server)),
        "acme",
        "desktop",
        Arc::new(SuffixMatcher::new("-macos.zip")),
    );

    let releases = resolver.fetch_all_releases().await.unwrap();
    let tags: Vec<&str> = releases.iter().map(|r| r.tag.as_str()).collect();
    assert_eq!(tags, ["v2.0.0-beta.1", "v1.10.0", "v1.2.0"]);

    let stable = resolver.fetch_latest_release(Some(false)).await.unwrap().unwrap();
    assert_eq!(stable.version, Version::new(1, 10, 0));
    assert_eq!(stable.asset_name, "desktop-macos.zip");

    let prerelease = resolver.fetch_latest_release(Some(true)).await.unwrap().unwrap();
    assert_eq!(prerelease.tag, "v2.0.0-beta.1");
}
