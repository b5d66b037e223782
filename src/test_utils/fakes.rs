//! In-memory stand-ins for the catalog and the update collaborators.
//!
//! Each fake records what it was asked to do. A [`Gate`] can hold a fake in
//! the middle of its step so a test can act (usually cancel) while the update
//! is suspended there.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::catalog::{CatalogError, ReleaseCatalog, ReleaseRecord};
use crate::update::{
    DownloadError, ExtractError, Extractor, InstallError, Installer, TransferEvents,
    TransferHandle, Transport,
};
use crate::utils::fs::create_unique_temp_dir;

/// Name of the file every fake bundle carries the archive bytes in.
pub const PAYLOAD_FILE: &str = "payload";

/// Holds a fake step until the test opens it.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    open: Arc<Notify>,
    entered: Arc<Notify>,
}

impl Gate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the held step continue.
    pub fn open(&self) {
        self.open.notify_one();
    }

    /// Resolves once a step has reached the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.open.notified().await;
    }
}

/// Catalog serving a fixed list of records.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    records: Vec<ReleaseRecord>,
    status: Option<u16>,
    requests: AtomicUsize,
}

impl StaticCatalog {
    #[must_use]
    pub fn new(records: Vec<ReleaseRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Catalog answering every request with HTTP `status`.
    #[must_use]
    pub fn failing(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseCatalog for StaticCatalog {
    async fn fetch_all_releases(
        &self,
        owner: &str,
        repository: &str,
    ) -> Result<Vec<ReleaseRecord>, CatalogError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.status {
            Some(status) => Err(CatalogError::Status {
                status,
                url: format!("static://{owner}/{repository}"),
                body: String::new(),
            }),
            None => Ok(self.records.clone()),
        }
    }
}

/// Transport "downloading" a fixed payload from any URL.
#[derive(Debug, Default)]
pub struct FakeTransport {
    payload: Vec<u8>,
    status: Option<u16>,
    gate: Option<Gate>,
    detached: bool,
    urls: Mutex<Vec<String>>,
}

impl FakeTransport {
    #[must_use]
    pub fn serving(payload: Vec<u8>) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    /// Transport failing every download with HTTP `status`.
    #[must_use]
    pub fn failing(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Wait at `gate` after the first progress report.
    #[must_use]
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Ignore abort requests, finishing the transfer regardless.
    #[must_use]
    pub const fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    /// URLs requested so far.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Transport for FakeTransport {
    fn begin(&self, url: &str, events: TransferEvents) -> TransferHandle {
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).push(url.to_string());

        let url = url.to_string();
        let payload = self.payload.clone();
        let status = self.status;
        let gate = self.gate.clone();

        let task = tokio::spawn(async move {
            let total = payload.len() as u64;
            events.progress(0, Some(total));
            if let Some(gate) = gate {
                gate.pass().await;
            }

            if let Some(status) = status {
                events.failed(DownloadError::Status { status, url });
                return;
            }

            let staging = events.staging_path(Some("zip"));
            match std::fs::write(&staging, &payload) {
                Ok(()) => {
                    events.progress(total / 2, Some(total));
                    events.progress(total, Some(total));
                    events.finished(&staging);
                }
                Err(e) => events.failed(DownloadError::Io(e)),
            }
        });

        if self.detached {
            TransferHandle::detached()
        } else {
            TransferHandle::new(task.abort_handle())
        }
    }
}

/// Extractor producing a directory with the configured bundles.
///
/// Each bundle is a directory holding [`PAYLOAD_FILE`] with the archive bytes.
#[derive(Debug, Default)]
pub struct FakeExtractor {
    bundles: Vec<String>,
    fail: bool,
    gate: Option<Gate>,
    archives: Mutex<Vec<PathBuf>>,
    outputs: Mutex<Vec<PathBuf>>,
}

impl FakeExtractor {
    #[must_use]
    pub fn with_bundles(bundles: &[&str]) -> Self {
        Self {
            bundles: bundles.iter().map(|b| (*b).to_string()).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Wait at `gate` after the output directory was written.
    #[must_use]
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Archives passed to `extract`.
    #[must_use]
    pub fn archives(&self) -> Vec<PathBuf> {
        self.archives.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Directories returned (or about to be returned) by `extract`.
    #[must_use]
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.outputs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self, archive: &Path) -> Result<PathBuf, ExtractError> {
        self.archives.lock().unwrap_or_else(|e| e.into_inner()).push(archive.to_path_buf());

        if self.fail {
            return Err(ExtractError::CommandFailed {
                program: "fake-unpack".to_string(),
                code: Some(1),
                stderr: "corrupt archive".to_string(),
            });
        }

        let payload = std::fs::read(archive)?;
        let output = create_unique_temp_dir("release-updater-fake-extract")?;
        self.outputs.lock().unwrap_or_else(|e| e.into_inner()).push(output.clone());

        for bundle in &self.bundles {
            let dir = output.join(bundle);
            std::fs::create_dir_all(&dir)?;
            std::fs::write(dir.join(PAYLOAD_FILE), &payload)?;
        }

        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        Ok(output)
    }
}

/// Installer recording bundles instead of touching the system.
#[derive(Debug, Default)]
pub struct RecordingInstaller {
    fail: bool,
    relaunch_fails: bool,
    gate: Option<Gate>,
    installed: Mutex<Vec<(PathBuf, Vec<u8>)>>,
    relaunches: AtomicUsize,
}

impl RecordingInstaller {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn relaunch_fails(mut self) -> Self {
        self.relaunch_fails = true;
        self
    }

    /// Wait at `gate` after recording the bundle.
    #[must_use]
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Bundles installed so far, with the payload each one carried.
    #[must_use]
    pub fn installed(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.installed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    #[must_use]
    pub fn relaunches(&self) -> usize {
        self.relaunches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Installer for RecordingInstaller {
    async fn install(&self, bundle: &Path) -> Result<(), InstallError> {
        let payload = std::fs::read(bundle.join(PAYLOAD_FILE)).unwrap_or_default();
        self.installed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((bundle.to_path_buf(), payload));

        if let Some(gate) = &self.gate {
            gate.pass().await;
        }

        if self.fail {
            return Err(InstallError::Copy {
                target: PathBuf::from("/Applications/Desktop.app"),
                source: io::Error::other("disk full"),
            });
        }
        Ok(())
    }

    fn relaunch(&self) -> Result<(), InstallError> {
        self.relaunches.fetch_add(1, Ordering::SeqCst);
        if self.relaunch_fails {
            return Err(InstallError::NotLaunchable {
                target: PathBuf::from("/Applications/Desktop.app"),
            });
        }
        Ok(())
    }
}
