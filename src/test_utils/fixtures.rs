//! Catalog record and archive fixtures.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;

use crate::catalog::{AssetRecord, ReleaseRecord};
use crate::resolver::Release;
use crate::version::parse_tag;

/// A non-draft catalog record with one asset per name.
///
/// Assets point at `https://downloads.example.com/{tag}/{name}`.
pub fn release_record(tag: &str, prerelease: bool, assets: &[&str]) -> ReleaseRecord {
    ReleaseRecord {
        tag_name: tag.to_string(),
        name: format!("Desktop {}", tag.trim_start_matches('v')),
        draft: false,
        prerelease,
        body: format!("Notes for {tag}"),
        published_at: None,
        assets: assets
            .iter()
            .map(|name| AssetRecord {
                name: (*name).to_string(),
                download_url: format!("https://downloads.example.com/{tag}/{name}"),
            })
            .collect(),
    }
}

/// A resolved release of `tag` downloading from `download_url`.
///
/// # Panics
///
/// Panics if `tag` is not a semantic version.
pub fn release(tag: &str, download_url: &str) -> Release {
    Release {
        name: format!("Desktop {}", tag.trim_start_matches('v')),
        body: String::new(),
        tag: tag.to_string(),
        version: parse_tag(tag).unwrap_or_else(|| panic!("fixture tag '{tag}' is not semver")),
        is_prerelease: false,
        published_at: None,
        asset_name: download_url.rsplit('/').next().unwrap_or_default().to_string(),
        download_url: download_url.to_string(),
    }
}

/// Write a zip archive at `path` holding `files` (`(name, contents)` pairs).
///
/// # Panics
///
/// Panics on any I/O error.
pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap_or_else(|e| panic!("create {}: {e}", path.display()));
    let mut writer = zip::ZipWriter::new(file);
    for (name, contents) in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap_or_else(|e| panic!("start {name}: {e}"));
        writer.write_all(contents).unwrap_or_else(|e| panic!("write {name}: {e}"));
    }
    writer.finish().unwrap_or_else(|e| panic!("finish {}: {e}", path.display()));
}
