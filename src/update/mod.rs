//! The update lifecycle: download, extract, install, relaunch.
//!
//! An [`Update`] drives one [`Release`] through
//! [`UpdateState`]s. It is created in `Waiting`, started once with
//! [`Update::start`], and can be canceled at any time with
//! [`Update::cancel`]. The pipeline runs as one background tokio task:
//!
//! 1. download the release asset through the [`Downloader`],
//! 2. extract the archive with the configured [`Extractor`],
//! 3. locate exactly one bundle in the extracted tree ([`locate_bundle`]),
//! 4. hand it to the [`Installer`], then request a relaunch.
//!
//! # Cancellation
//!
//! Cancellation is cooperative. `cancel()` moves the state to `Canceled`; the
//! pipeline looks at the state after every step that awaits and stops
//! without a further transition once it sees `Canceled`. A canceled update
//! never becomes `Failed`, and the in-flight transfer is aborted as well. The
//! state checks alone are enough for correctness; the abort only makes
//! cancellation faster.
//!
//! # Temporary files
//!
//! The downloaded archive and the extracted directory are held by
//! [`ScopedPath`] guards for as long as the step that produced them runs, and
//! are removed on every way out of it.
//!
//! # Observing
//!
//! [`Update::state`] returns a snapshot, [`Update::subscribe`] a
//! [`watch::Receiver`] that sees every transition, and [`Update::wait`]
//! resolves once the update is finished.
//!
//! ```rust,no_run
//! use release_updater::Updater;
//!
//! # async fn example(updater: Updater) -> anyhow::Result<()> {
//! if let Some(release) = updater.latest_release().await? {
//!     let update = updater.update_to(release);
//!     update.start()?;
//!     let state = update.wait().await;
//!     println!("{}", state.label());
//! }
//! # Ok(())
//! # }
//! ```

mod download;
mod extract;
mod install;
mod state;


pub use download::{
    DownloadError, Downloader, HttpTransport, ProgressSink, TransferEvents, TransferHandle,
    Transport,
};
pub use extract::{
    CommandExtractor, ExtractError, Extractor, UnpackError, ZipExtractor, locate_bundle,
};
pub use install::{BundleInstaller, InstallError, Installer};
pub use state::UpdateState;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::resolver::Release;
use crate::utils::fs::ScopedPath;

/// Usage errors from [`Update::start`]. They never change the state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    #[error("update has already been started")]
    AlreadyStarted,

    #[error("update was canceled")]
    WasCanceled,

    #[error("update must be started from within a tokio runtime")]
    NoRuntime,
}

/// Operational failures. The update ends in [`UpdateState::Failed`].
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("download failed")]
    DownloadFailed(#[source] DownloadError),

    #[error("unpack failed")]
    UnpackFailed(#[source] UnpackError),

    #[error("install failed")]
    InstallFailed(#[source] InstallError),
}

impl UpdateError {
    /// The message followed by every cause, joined with `": "`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

/// The collaborators every update of an application shares.
#[derive(Clone)]
pub struct Pipeline {
    transport: Arc<dyn Transport>,
    extractor: Arc<dyn Extractor>,
    installer: Arc<dyn Installer>,
    bundle_extension: String,
    staging_dir: Option<PathBuf>,
}

impl Pipeline {
    /// Pipeline looking for `.app` bundles.
    pub fn new(
        transport: Arc<dyn Transport>,
        extractor: Arc<dyn Extractor>,
        installer: Arc<dyn Installer>,
    ) -> Self {
        Self {
            transport,
            extractor,
            installer,
            bundle_extension: "app".to_string(),
            staging_dir: None,
        }
    }

    /// Extension of the bundle to find in extracted archives.
    #[must_use]
    pub fn bundle_extension(mut self, extension: impl Into<String>) -> Self {
        self.bundle_extension = extension.into();
        self
    }

    /// Directory downloads are staged in. Default: the system temp directory.
    #[must_use]
    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("bundle_extension", &self.bundle_extension)
            .field("staging_dir", &self.staging_dir)
            .finish_non_exhaustive()
    }
}

type StateSender = Arc<watch::Sender<UpdateState>>;

/// One update to one release.
pub struct Update {
    release: Release,
    state: StateSender,
    pipeline: Arc<Pipeline>,
    downloader: Arc<Downloader>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Update {
    pub fn new(release: Release, pipeline: Arc<Pipeline>) -> Self {
        let (state, _) = watch::channel(UpdateState::Waiting);
        let mut downloader = Downloader::new(Arc::clone(&pipeline.transport));
        if let Some(dir) = &pipeline.staging_dir {
            downloader = downloader.with_staging_dir(dir);
        }
        let downloader = Arc::new(downloader);
        Self {
            release,
            state: Arc::new(state),
            pipeline,
            downloader,
            task: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn release(&self) -> &Release {
        &self.release
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> UpdateState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UpdateState> {
        self.state.subscribe()
    }

    /// Begin updating. Only valid while `Waiting`.
    ///
    /// Must be called from within a tokio runtime; the pipeline is spawned
    /// onto it.
    pub fn start(&self) -> Result<(), StartError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StartError::NoRuntime)?;

        let mut outcome = Ok(());
        self.state.send_if_modified(|state| match state {
            UpdateState::Waiting => {
                *state = UpdateState::Downloading(0.0);
                true
            }
            UpdateState::Canceled => {
                outcome = Err(StartError::WasCanceled);
                false
            }
            _ => {
                outcome = Err(StartError::AlreadyStarted);
                false
            }
        });
        outcome?;

        info!(version = %self.release.version, "Starting update to {}", self.release.display_name());

        let run = Run {
            release: self.release.clone(),
            state: Arc::clone(&self.state),
            pipeline: Arc::clone(&self.pipeline),
            downloader: Arc::clone(&self.downloader),
        };
        let handle = runtime.spawn(run.execute());
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Cancel the update. Idempotent; does nothing once the update finished.
    pub fn cancel(&self) {
        let canceled = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = UpdateState::Canceled;
                true
            }
        });

        if canceled {
            info!(version = %self.release.version, "Update canceled");
            self.downloader.cancel();
        }
    }

    /// Wait until the update is finished and its task has cleaned up.
    ///
    /// Returns the current state at once for an update that was never
    /// started.
    pub async fn wait(&self) -> UpdateState {
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(task) = task else {
            // Never started, or another caller already waits on the task.
            let mut receiver = self.subscribe();
            if matches!(*receiver.borrow(), UpdateState::Waiting) {
                return self.state();
            }
            return match receiver.wait_for(UpdateState::is_terminal).await {
                Ok(state) => state.clone(),
                Err(_) => self.state(),
            };
        };

        if let Err(e) = task.await {
            warn!("Update task ended abnormally: {}", e);
        }
        self.state()
    }
}

impl std::fmt::Debug for Update {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Update")
            .field("version", &self.release.version.to_string())
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Everything the background task needs, moved into it.
struct Run {
    release: Release,
    state: StateSender,
    pipeline: Arc<Pipeline>,
    downloader: Arc<Downloader>,
}

enum Finish {
    Installed,
    Canceled,
}

impl Run {
    async fn execute(self) {
        match self.steps().await {
            Ok(Finish::Installed) => {
                if self.advance(UpdateState::Completed) {
                    info!(version = %self.release.version, "Update installed");
                    if let Err(e) = self.pipeline.installer.relaunch() {
                        warn!("Relaunch failed: {}", e);
                    }
                }
            }
            Ok(Finish::Canceled) => debug!("Update stopped after cancellation"),
            Err(error) => self.fail(error),
        }
    }

    async fn steps(&self) -> Result<Finish, UpdateError> {
        let archive = self
            .downloader
            .download(&self.release.download_url, progress_sink(Arc::clone(&self.state)))
            .await
            .map(ScopedPath::new);
        if self.is_canceled() {
            return Ok(Finish::Canceled);
        }
        let archive = archive.map_err(UpdateError::DownloadFailed)?;

        if !self.advance(UpdateState::Extracting) {
            return Ok(Finish::Canceled);
        }
        let extracted = self.pipeline.extractor.extract(archive.path()).await.map(ScopedPath::new);
        if self.is_canceled() {
            return Ok(Finish::Canceled);
        }
        let extracted = extracted.map_err(|e| UpdateError::UnpackFailed(e.into()))?;
        drop(archive);

        let bundle = locate_bundle(extracted.path(), &self.pipeline.bundle_extension)
            .map_err(UpdateError::UnpackFailed)?;
        debug!("Found bundle {}", bundle.display());

        if !self.advance(UpdateState::Installing) {
            return Ok(Finish::Canceled);
        }
        let installed = self.pipeline.installer.install(&bundle).await;
        if self.is_canceled() {
            return Ok(Finish::Canceled);
        }
        installed.map_err(UpdateError::InstallFailed)?;

        Ok(Finish::Installed)
    }

    fn is_canceled(&self) -> bool {
        self.state.borrow().is_canceled()
    }

    /// Move to `next` unless the update was canceled meanwhile.
    fn advance(&self, next: UpdateState) -> bool {
        let mut from = "";
        let advanced = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            from = state.name();
            *state = next;
            true
        });
        if advanced {
            debug!("Update state {} -> {}", from, self.state.borrow().name());
        }
        advanced
    }

    fn fail(&self, error: UpdateError) {
        let message = error.describe();
        let error = Arc::new(error);
        let failed = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = UpdateState::Failed(error);
            true
        });
        if failed {
            warn!(version = %self.release.version, "Update failed: {}", message);
        }
    }
}

/// Sink writing download fractions into the state while it is
/// `Downloading`. Regressions are ignored.
fn progress_sink(state: StateSender) -> ProgressSink {
    Arc::new(move |fraction| {
        let Some(fraction) = fraction else {
            return;
        };
        state.send_if_modified(|current| match current {
            UpdateState::Downloading(progress) if fraction > *progress => {
                *progress = fraction;
                true
            }
            _ => false,
        });
    })
}
