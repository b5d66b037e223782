//! Transfer engine: one cancellable, progress-reporting download at a time.
//!
//! A [`Transport`] is event driven. It is handed a [`TransferEvents`] and
//! reports byte counts and exactly one terminal outcome through it, from
//! whatever task or thread it likes. The [`Downloader`] turns that into a
//! single `async fn` returning the path of the downloaded file.
//!
//! The bridge is a mutex-guarded one-shot slot: the first terminal event takes
//! the sender out of the slot and resolves the download. Later events find the
//! slot empty and do nothing, so a transport can never resolve twice. Progress
//! is forwarded while holding the slot, so none reaches the sink once the
//! download resolved.
//!
//! Partial and finished files live in the downloader's staging directory,
//! the system temp directory unless [`Downloader::with_staging_dir`] says
//! otherwise.

use futures::StreamExt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

use crate::utils::fs::{ScopedPath, move_path, remove_path_quietly, unique_path_in};

/// Receives download progress: a fraction in `[0, 1]`, or `None` while the
/// total size is unknown.
pub type ProgressSink = Arc<dyn Fn(Option<f64>) + Send + Sync>;

/// Errors raised by the transfer engine.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// A download is already running on this [`Downloader`].
    #[error("a download is already in progress")]
    AlreadyInProgress,

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// Network failure while requesting or streaming the file.
    #[error("failed to download {url}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("download of {url} failed with HTTP {status}")]
    Status { status: u16, url: String },

    /// Writing or moving the downloaded file failed.
    #[error("failed to store downloaded file")]
    Io(#[from] io::Error),

    /// The transport went away without reporting an outcome.
    #[error("download was interrupted")]
    Interrupted,
}

type Outcome = Result<PathBuf, DownloadError>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Callback handle given to a [`Transport`] for one transfer.
///
/// Cheap to clone; all clones share the same one-shot slot.
#[derive(Clone)]
pub struct TransferEvents {
    inner: Arc<EventsInner>,
}

struct EventsInner {
    slot: Mutex<Option<oneshot::Sender<Outcome>>>,
    sink: ProgressSink,
    staging_dir: PathBuf,
}

impl TransferEvents {
    fn new(sender: oneshot::Sender<Outcome>, sink: ProgressSink, staging_dir: PathBuf) -> Self {
        Self {
            inner: Arc::new(EventsInner {
                slot: Mutex::new(Some(sender)),
                sink,
                staging_dir,
            }),
        }
    }

    /// A fresh path in the staging directory for the transport to write the
    /// partial file to. Nothing is created.
    #[must_use]
    pub fn staging_path(&self, extension: Option<&str>) -> PathBuf {
        unique_path_in(&self.inner.staging_dir, "release-updater-partial", extension)
    }

    /// Whether a terminal event has already been delivered.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        lock(&self.inner.slot).is_none()
    }

    /// Report `written` of `expected` bytes. Unknown or zero `expected` is
    /// reported as indeterminate.
    pub fn progress(&self, written: u64, expected: Option<u64>) {
        let slot = lock(&self.inner.slot);
        if slot.is_none() {
            return;
        }

        let fraction = match expected {
            Some(total) if total > 0 => Some((written as f64 / total as f64).clamp(0.0, 1.0)),
            _ => None,
        };
        trace!(written, ?expected, "Download progress");
        (self.inner.sink)(fraction);
        drop(slot);
    }

    /// Report success. The file at `location` is moved to a private, uniquely
    /// named temporary path, which becomes the download result.
    pub fn finished(&self, location: &Path) {
        let Some(sender) = lock(&self.inner.slot).take() else {
            debug!("Ignoring completion after the download was resolved");
            return;
        };

        let extension = location.extension().and_then(|ext| ext.to_str());
        let destination =
            unique_path_in(&self.inner.staging_dir, "release-updater-download", extension);
        let outcome = move_path(location, &destination)
            .map(|()| destination.clone())
            .map_err(DownloadError::Io);

        if sender.send(outcome).is_err() {
            // Nobody is waiting any more; do not leak the file.
            remove_path_quietly(&destination);
        }
    }

    /// Report failure.
    pub fn failed(&self, error: DownloadError) {
        match lock(&self.inner.slot).take() {
            Some(sender) => {
                let _ = sender.send(Err(error));
            }
            None => debug!("Ignoring failure after the download was resolved: {}", error),
        }
    }
}

impl std::fmt::Debug for TransferEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferEvents").field("resolved", &self.is_resolved()).finish()
    }
}

/// Lets the [`Downloader`] interrupt a running transfer.
#[derive(Debug, Default)]
pub struct TransferHandle {
    abort: Option<AbortHandle>,
}

impl TransferHandle {
    /// Handle that aborts the given task.
    #[must_use]
    pub const fn new(abort: AbortHandle) -> Self {
        Self { abort: Some(abort) }
    }

    /// Handle for a transport that cannot be interrupted.
    #[must_use]
    pub const fn detached() -> Self {
        Self { abort: None }
    }

    fn abort(&self) {
        if let Some(handle) = &self.abort {
            handle.abort();
        }
    }
}

/// Callback-driven transport for a single file.
///
/// `begin` must return promptly. The transfer reports through `events` and
/// must deliver exactly one of [`TransferEvents::finished`] or
/// [`TransferEvents::failed`], unless it is aborted through the returned
/// handle.
pub trait Transport: Send + Sync {
    fn begin(&self, url: &str, events: TransferEvents) -> TransferHandle;
}

/// Streams files over HTTP(S) with reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_timeout(Duration::from_secs(300))
    }

    /// Transport whose requests time out after `timeout` in total.
    pub fn with_timeout(timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(crate::catalog::USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(DownloadError::Client)?;
        Ok(Self::with_client(client))
    }

    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn begin(&self, url: &str, events: TransferEvents) -> TransferHandle {
        let client = self.client.clone();
        let url = url.to_string();

        let task = tokio::spawn(async move {
            let partial = ScopedPath::new(events.staging_path(url_extension(&url)));
            match stream_to_file(&client, &url, partial.path(), &events).await {
                Ok(()) => events.finished(partial.path()),
                Err(error) => events.failed(error),
            }
        });

        TransferHandle::new(task.abort_handle())
    }
}

/// Extension of the last path segment of `url`, query and fragment ignored.
fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    Path::new(name).extension()?.to_str()
}

async fn stream_to_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    events: &TransferEvents,
) -> Result<(), DownloadError> {
    let response = client.get(url).send().await.map_err(|source| DownloadError::Http {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let expected = response.content_length();
    debug!(url, ?expected, "Downloading");
    events.progress(0, expected);

    let mut file = tokio::fs::File::create(path).await?;
    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| DownloadError::Http {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        events.progress(written, expected);
    }

    file.flush().await?;
    debug!(url, written, "Download finished");
    Ok(())
}

/// Runs one download at a time over a [`Transport`].
pub struct Downloader {
    transport: Arc<dyn Transport>,
    staging_dir: PathBuf,
    in_flight: AtomicBool,
    current: Mutex<Option<TransferHandle>>,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Downloader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            staging_dir: std::env::temp_dir(),
            in_flight: AtomicBool::new(false),
            current: Mutex::new(None),
        }
    }

    /// Keep partial and finished downloads under `dir`, which must exist.
    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Whether a download is currently running.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Download `url` to a private temporary file and return its path.
    ///
    /// The caller owns the returned file. Fails immediately with
    /// [`DownloadError::AlreadyInProgress`] while another download on this
    /// instance has not resolved.
    pub async fn download(&self, url: &str, sink: ProgressSink) -> Result<PathBuf, DownloadError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DownloadError::AlreadyInProgress);
        }
        let _in_flight = InFlight(&self.in_flight);

        let (sender, receiver) = oneshot::channel();
        let events = TransferEvents::new(sender, sink, self.staging_dir.clone());
        let handle = self.transport.begin(url, events);
        *lock(&self.current) = Some(handle);

        let outcome = receiver.await.unwrap_or(Err(DownloadError::Interrupted));
        lock(&self.current).take();
        outcome
    }

    /// Abort the running transfer, if any. The pending
    /// [`download`](Self::download) then resolves with an error.
    pub fn cancel(&self) {
        if let Some(handle) = lock(&self.current).take() {
            debug!("Aborting in-flight download");
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader").field("in_flight", &self.is_in_flight()).finish()
    }
}
