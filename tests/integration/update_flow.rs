use release_updater::Updater;
use release_updater::matcher::SuffixMatcher;
use release_updater::test_utils::{init_test_logging, write_zip};
use release_updater::update::{
    BundleInstaller, DownloadError, HttpTransport, UpdateError, UpdateState, ZipExtractor,
};
use release_updater::version::Version;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{catalog_for, release_json};

const ASSET: &str = "desktop-macos.zip";

struct Fixture {
    server: MockServer,
    temp: TempDir,
    staging: TempDir,
}

impl Fixture {
    async fn new() -> Self {
        init_test_logging(None);
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/repos/acme/desktop/releases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                release_json(&server, "v1.0.0", false, &[ASSET]),
                release_json(&server, "v2.0.0", false, &[ASSET]),
            ])))
            .mount(&server)
            .await;

        Self {
            server,
            temp,
            staging: TempDir::new().unwrap(),
        }
    }

    fn target(&self) -> std::path::PathBuf {
        self.temp.path().join("Applications").join("Desktop.app")
    }

    async fn serve_archive(&self, tag: &str, files: &[(&str, &[u8])], delay: Option<Duration>) {
        let archive = self.temp.path().join(format!("{tag}.zip"));
        write_zip(&archive, files);
        let mut response = ResponseTemplate::new(200).set_body_bytes(fs::read(&archive).unwrap());
        if let Some(delay) = delay {
            response = response.set_delay(delay);
        }
        Mock::given(method("GET"))
            .and(path(format!("/download/{tag}/{ASSET}")))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    fn updater(&self) -> Updater {
        Updater::builder("acme", "desktop")
            .catalog(Arc::new(catalog_for(&self.server)))
            .matcher(Arc::new(SuffixMatcher::new(ASSET)))
            .transport(Arc::new(HttpTransport::new().unwrap()))
            .extractor(Arc::new(ZipExtractor))
            .installer(Arc::new(BundleInstaller::new(self.target()).with_relaunch(false)))
            .staging_dir(self.staging.path())
            .prerelease(Some(false))
            .build()
            .unwrap()
    }

    fn install_old_version(&self) {
        let contents = self.target().join("Contents");
        fs::create_dir_all(&contents).unwrap();
        fs::write(contents.join("version"), "1.0.0").unwrap();
        fs::write(contents.join("obsolete"), "old").unwrap();
    }
}

fn staged(fixture: &Fixture) -> Vec<String> {
    fs::read_dir(fixture.staging.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn backups(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().contains(".backup-"))
        .count()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_replaces_installed_bundle() {
    let fixture = Fixture::new().await;
    fixture.install_old_version();
    fixture
        .serve_archive(
            "v2.0.0",
            &[
                ("Desktop.app/Contents/version", b"2.0.0"),
                ("Desktop.app/Contents/MacOS/desktop", b"#!/bin/sh\n"),
                ("__MACOSX/._Desktop.app", b"resource fork"),
            ],
            None,
        )
        .await;

    let updater = fixture.updater();
    let release = updater.newer_than(&Version::new(1, 0, 0)).await.unwrap().unwrap();
    assert_eq!(release.tag, "v2.0.0");

    let update = updater.update_to(release);
    update.start().unwrap();
    let state = update.wait().await;

    assert!(matches!(state, UpdateState::Completed), "unexpected state {state}");
    let target = fixture.target();
    assert_eq!(fs::read_to_string(target.join("Contents/version")).unwrap(), "2.0.0");
    assert!(target.join("Contents/MacOS/desktop").exists());
    assert!(!target.join("Contents/obsolete").exists());
    assert_eq!(backups(target.parent().unwrap()), 0);
    assert!(staged(&fixture).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_archive_without_bundle_fails_and_keeps_install() {
    let fixture = Fixture::new().await;
    fixture.install_old_version();
    fixture
        .serve_archive("v2.0.0", &[("README.txt", b"no bundle in here")], None)
        .await;

    let updater = fixture.updater();
    let release = updater.latest_release().await.unwrap().unwrap();
    let update = updater.update_to(release);
    update.start().unwrap();
    let state = update.wait().await;

    assert!(matches!(state.error(), Some(UpdateError::UnpackFailed(_))));
    assert_eq!(fs::read_to_string(fixture.target().join("Contents/version")).unwrap(), "1.0.0");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_asset_fails_download() {
    let fixture = Fixture::new().await;
    Mock::given(method("GET"))
        .and(path(format!("/download/v2.0.0/{ASSET}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&fixture.server)
        .await;

    let updater = fixture.updater();
    let release = updater.latest_release().await.unwrap().unwrap();
    let update = updater.update_to(release);
    update.start().unwrap();
    let state = update.wait().await;

    assert!(matches!(
        state.error(),
        Some(UpdateError::DownloadFailed(DownloadError::Status { status: 404, .. }))
    ));
    assert!(!fixture.target().exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_while_downloading() {
    let fixture = Fixture::new().await;
    fixture.install_old_version();
    fixture
        .serve_archive(
            "v2.0.0",
            &[("Desktop.app/Contents/version", b"2.0.0")],
            Some(Duration::from_secs(30)),
        )
        .await;

    let updater = fixture.updater();
    let release = updater.latest_release().await.unwrap().unwrap();
    let update = updater.update_to(release);
    update.start().unwrap();
    assert!(matches!(update.state(), UpdateState::Downloading(_)));

    tokio::time::sleep(Duration::from_millis(100)).await;
    update.cancel();
    let state = tokio::time::timeout(Duration::from_secs(10), update.wait()).await.unwrap();

    assert!(state.is_canceled());
    assert_eq!(fs::read_to_string(fixture.target().join("Contents/version")).unwrap(), "1.0.0");
    assert_eq!(staged(&fixture), Vec::<String>::new());
}
