//! File system helpers for update staging.
//!
//! Every temporary artifact created while updating (downloaded archives,
//! extraction directories, install backups) gets a unique name under the
//! system temp directory and is owned by a [`ScopedPath`] that removes it when
//! the owning step ends, however it ends.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Build a unique path in the system temp directory.
///
/// Nothing is created on disk. The name is `{prefix}-{uuid}` with an optional
/// extension.
#[must_use]
pub fn unique_temp_path(prefix: &str, extension: Option<&str>) -> PathBuf {
    unique_path_in(&std::env::temp_dir(), prefix, extension)
}

/// Like [`unique_temp_path`], but under `dir`.
#[must_use]
pub fn unique_path_in(dir: &Path, prefix: &str, extension: Option<&str>) -> PathBuf {
    let mut name = format!("{}-{}", prefix, uuid::Uuid::new_v4());
    if let Some(ext) = extension {
        name.push('.');
        name.push_str(ext);
    }
    dir.join(name)
}

/// Create a fresh, uniquely named directory in the system temp directory.
pub fn create_unique_temp_dir(prefix: &str) -> io::Result<PathBuf> {
    let path = unique_temp_path(prefix, None);
    fs::create_dir_all(&path)?;
    Ok(path)
}

/// Remove a file or directory tree, ignoring every failure.
///
/// Missing paths are fine. Failures are logged at debug level only, since a
/// cleanup problem must never replace the outcome of the operation that
/// triggered it.
pub fn remove_path_quietly(path: &Path) {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) => debug!("Ignoring failure to remove {}: {}", path.display(), e),
    }
}

/// Owns a temporary path and removes it on drop.
///
/// The same guard is used for files and directories.
#[derive(Debug)]
pub struct ScopedPath {
    path: PathBuf,
}

impl ScopedPath {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRef<Path> for ScopedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedPath {
    fn drop(&mut self) {
        remove_path_quietly(&self.path);
    }
}

/// Move `src` to `dst`, copying across file systems when a rename is not
/// possible.
pub fn move_path(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(
                "Rename {} -> {} failed ({}), falling back to copy",
                src.display(),
                dst.display(),
                rename_err
            );
            copy_path(src, dst)?;
            remove_path_quietly(src);
            Ok(())
        }
    }
}

/// Copy a file or a directory tree to `dst`.
///
/// Directory copies keep symbolic links as links (application bundles rely on
/// them) and preserve file permissions of regular files.
pub fn copy_path(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(src)?;
    if meta.is_dir() {
        copy_dir(src, dst)
    } else if meta.file_type().is_symlink() {
        copy_symlink(src, dst)
    } else {
        fs::copy(src, dst).map(|_| ())
    }
}

fn copy_dir(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let link = fs::read_link(src)?;
    std::os::unix::fs::symlink(link, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    // Windows needs privileges for symlinks; copy the target instead.
    fs::copy(src, dst).map(|_| ())
}
