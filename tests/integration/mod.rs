//! Integration test suite for release-updater
//!
//! End-to-end tests against a local HTTP server standing in for the GitHub
//! API and the asset download host.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **catalog**: GitHub catalog client and resolution of its records
//! - **download**: HTTP transport through the downloader
//! - **update_flow**: full updates from a served zip into a temporary install

mod catalog;
mod common;
mod download;
mod update_flow;
