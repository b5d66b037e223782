//! Test utilities for release-updater
//!
//! Fakes for every update collaborator, plus fixtures for catalog records and
//! zip archives. Available to unit tests and, through the `test-utils`
//! feature, to the integration suite.
//!
//! # Example
//!
//! ```rust,no_run
//! use release_updater::test_utils::{FakeExtractor, FakeTransport, RecordingInstaller};
//! use release_updater::update::Pipeline;
//! use std::sync::Arc;
//!
//! let installer = Arc::new(RecordingInstaller::new());
//! let pipeline = Pipeline::new(
//!     Arc::new(FakeTransport::serving(b"archive".to_vec())),
//!     Arc::new(FakeExtractor::with_bundles(&["Desktop.app"])),
//!     installer.clone(),
//! );
//! ```

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeExtractor, FakeTransport, Gate, RecordingInstaller, StaticCatalog};
pub use fixtures::{release, release_record, write_zip};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests stay silent.
///
/// ```bash
/// RUST_LOG=release_updater=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
