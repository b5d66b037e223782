//! Archive extraction and bundle lookup.
//!
//! An [`Extractor`] unpacks a downloaded archive into a fresh temporary
//! directory and returns that directory. Two implementations ship:
//!
//! - [`ZipExtractor`] unpacks `.zip` archives in process with the `zip` crate
//! - [`CommandExtractor`] runs an external unpack utility (`ditto`, `tar`,
//!   `unzip` ...) and treats any non-zero exit status as failure
//!
//! [`locate_bundle`] then finds the single installable bundle inside the
//! extracted tree.

use async_trait::async_trait;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::utils::fs::{create_unique_temp_dir, remove_path_quietly};

const TEMP_PREFIX: &str = "release-updater-extract";

/// Errors raised while unpacking an archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to prepare extraction directory")]
    Io(#[from] io::Error),

    #[error("failed to read archive {}", .archive.display())]
    Archive {
        archive: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("unpack command is empty")]
    EmptyCommand,

    #[error("unpack program '{program}' not found")]
    ProgramNotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to run '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {}: {stderr}", .code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("extraction task failed")]
    Task(#[from] tokio::task::JoinError),
}

/// The archive could not be unpacked into exactly one bundle.
#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("extractor failed")]
    Extractor(#[from] ExtractError),

    #[error("no .{extension} bundle found in {}", .directory.display())]
    NoBundle { directory: PathBuf, extension: String },

    #[error("{count} .{extension} bundles found in {}, expected one", .directory.display())]
    MultipleBundles {
        directory: PathBuf,
        extension: String,
        count: usize,
    },

    #[error("failed to read extracted directory {}", .directory.display())]
    Io {
        directory: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Unpacks a downloaded archive.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract `archive` and return the directory holding its contents.
    ///
    /// The returned directory is new and owned by the caller. On error no
    /// directory is left behind.
    async fn extract(&self, archive: &Path) -> Result<PathBuf, ExtractError>;
}

/// In-process `.zip` extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

#[async_trait]
impl Extractor for ZipExtractor {
    async fn extract(&self, archive: &Path) -> Result<PathBuf, ExtractError> {
        let archive = archive.to_path_buf();
        tokio::task::spawn_blocking(move || unzip(&archive)).await?
    }
}

fn unzip(archive: &Path) -> Result<PathBuf, ExtractError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|source| ExtractError::Archive {
        archive: archive.to_path_buf(),
        source,
    })?;

    let destination = create_unique_temp_dir(TEMP_PREFIX)?;
    debug!(entries = zip.len(), "Unzipping {} into {}", archive.display(), destination.display());

    if let Err(source) = zip.extract(&destination) {
        remove_path_quietly(&destination);
        return Err(ExtractError::Archive {
            archive: archive.to_path_buf(),
            source,
        });
    }
    Ok(destination)
}

/// Extraction through an external program.
///
/// Arguments may contain the placeholders `{archive}` and `{dest}`, replaced
/// with the archive path and the fresh output directory.
///
/// ```rust
/// use release_updater::update::CommandExtractor;
///
/// let ditto = CommandExtractor::new(["ditto", "-x", "-k", "{archive}", "{dest}"]);
/// assert_eq!(ditto.program(), Some("ditto"));
/// ```
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    argv: Vec<String>,
}

impl CommandExtractor {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    fn arguments(&self, archive: &Path, destination: &Path) -> Vec<String> {
        let archive = archive.to_string_lossy();
        let destination = destination.to_string_lossy();
        self.argv
            .iter()
            .skip(1)
            .map(|arg| arg.replace("{archive}", &archive).replace("{dest}", &destination))
            .collect()
    }
}

#[async_trait]
impl Extractor for CommandExtractor {
    async fn extract(&self, archive: &Path) -> Result<PathBuf, ExtractError> {
        let program = self.program().ok_or(ExtractError::EmptyCommand)?.to_string();
        let resolved = which::which(&program).map_err(|source| ExtractError::ProgramNotFound {
            program: program.clone(),
            source,
        })?;

        let destination = create_unique_temp_dir(TEMP_PREFIX)?;
        let args = self.arguments(archive, &destination);
        debug!("Running {} {}", resolved.display(), args.join(" "));

        let output = match Command::new(&resolved).args(&args).output().await {
            Ok(output) => output,
            Err(source) => {
                remove_path_quietly(&destination);
                return Err(ExtractError::Spawn { program, source });
            }
        };

        if !output.status.success() {
            remove_path_quietly(&destination);
            return Err(ExtractError::CommandFailed {
                program,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(destination)
    }
}

/// Find the single top-level entry of `directory` with the given extension.
///
/// Hidden entries and the `__MACOSX` resource-fork folder that macOS archivers
/// add are ignored. The extension comparison ignores ASCII case.
pub fn locate_bundle(directory: &Path, extension: &str) -> Result<PathBuf, UnpackError> {
    let extension = extension.trim_start_matches('.');
    let io_error = |source: io::Error| UnpackError::Io {
        directory: directory.to_path_buf(),
        source,
    };

    let mut bundles = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') || name == "__MACOSX" {
            trace!("Ignoring {}", name);
            continue;
        }

        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            bundles.push(path);
        }
    }

    match bundles.len() {
        1 => Ok(bundles.remove(0)),
        0 => Err(UnpackError::NoBundle {
            directory: directory.to_path_buf(),
            extension: extension.to_string(),
        }),
        count => Err(UnpackError::MultipleBundles {
            directory: directory.to_path_buf(),
            extension: extension.to_string(),
            count,
        }),
    }
}
