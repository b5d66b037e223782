//! Command line tests running the `release-updater` binary against a mock
//! GitHub API.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn release(server: &MockServer, tag: &str, prerelease: bool) -> serde_json::Value {
    json!({
        "tag_name": tag,
        "name": format!("Desktop {}", tag.trim_start_matches('v')),
        "draft": false,
        "prerelease": prerelease,
        "body": "",
        "published_at": "2024-05-01T12:00:00Z",
        "assets": [{
            "name": "desktop-macos.zip",
            "browser_download_url": format!("{}/download/{tag}/desktop-macos.zip", server.uri()),
        }],
    })
}

async fn catalog_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/desktop/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            release(&server, "v1.0.0", false),
            release(&server, "v1.1.0", false),
            release(&server, "v1.2.0-rc.1", true),
        ])))
        .mount(&server)
        .await;
    server
}

fn write_config(dir: &Path, server: &MockServer, current_version: &str) -> PathBuf {
    let config = dir.join("config.toml");
    let target = dir.join("Desktop.app");
    std::fs::write(
        &config,
        format!(
            r#"
[repository]
owner = "acme"
name = "desktop"
api_base_url = '{}'

[assets]
suffix = "-macos.zip"

[channel]
prerelease = false

[install]
current_version = "{current_version}"
target = '{}'
relaunch = false
"#,
            server.uri(),
            target.display()
        ),
    )
    .unwrap();
    config
}

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("release-updater").unwrap();
    cmd.env("NO_COLOR", "1")
        .env("RELEASE_UPDATER_NO_PROGRESS", "1")
        .env_remove("RUST_LOG")
        .env_remove("GITHUB_TOKEN")
        .env_remove("RELEASE_UPDATER_CONFIG");
    cmd
}

async fn run(mut cmd: Command) -> assert_cmd::assert::Assert {
    tokio::task::spawn_blocking(move || cmd.assert()).await.unwrap()
}

#[test]
fn test_help_lists_commands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("latest"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("--no-progress"));
}

#[test]
fn test_missing_config_file() {
    let temp = TempDir::new().unwrap();
    cli()
        .arg("--config")
        .arg(temp.path().join("missing.toml"))
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_invalid_config_is_reported() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "[repository]\nowner = \"acme\"\n").unwrap();

    cli()
        .arg("--config")
        .arg(&config)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("owner and name"));
}

#[test]
fn test_config_path_from_environment() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "not = [valid").unwrap();

    cli()
        .env("RELEASE_UPDATER_CONFIG", &config)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_stable_and_all() {
    let server = catalog_server().await;
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), &server, "1.0.0");

    let mut cmd = cli();
    cmd.arg("--config").arg(&config).arg("list");
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("1.1.0"))
        .stdout(predicate::str::contains("(installed)"))
        .stdout(predicate::str::contains("1.2.0-rc.1").not());

    let mut cmd = cli();
    cmd.arg("--config").arg(&config).arg("list").arg("--all");
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("1.2.0-rc.1"))
        .stdout(predicate::str::contains("[prerelease]"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_latest_respects_channel_flags() {
    let server = catalog_server().await;
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), &server, "1.0.0");

    let mut cmd = cli();
    cmd.arg("--config").arg(&config).arg("latest");
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Desktop 1.1.0"))
        .stdout(predicate::str::contains("Update available: 1.0.0 -> 1.1.0"));

    let mut cmd = cli();
    cmd.arg("--config").arg(&config).arg("latest").arg("--prerelease");
    run(cmd).await.success().stdout(predicate::str::contains("1.2.0-rc.1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_skips_when_up_to_date() {
    let server = catalog_server().await;
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), &server, "1.1.0");

    let mut cmd = cli();
    cmd.arg("--config").arg(&config).arg("update");
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Already up to date"));

    assert!(!temp.path().join("Desktop.app").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_to_unknown_version_fails() {
    let server = catalog_server().await;
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), &server, "1.0.0");

    let mut cmd = cli();
    cmd.arg("--config").arg(&config).arg("update").arg("9.9.9");
    run(cmd)
        .await
        .failure()
        .stderr(predicate::str::contains("Release 9.9.9 not found"))
        .stderr(predicate::str::contains("list --all"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_download_failure_exits_nonzero() {
    let server = catalog_server().await;
    Mock::given(method("GET"))
        .and(path("/download/v1.1.0/desktop-macos.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), &server, "1.0.0");

    let mut cmd = cli();
    cmd.arg("--config").arg(&config).arg("update");
    run(cmd)
        .await
        .failure()
        .stderr(predicate::str::contains("Update failed: download failed"))
        .stderr(predicate::str::contains("404"));
}
