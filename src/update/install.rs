//! Installing an extracted bundle over the running application.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::utils::fs::{copy_path, remove_path_quietly};
use crate::utils::platform;

/// Errors raised while installing or relaunching.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("bundle {} does not exist", .bundle.display())]
    MissingBundle { bundle: PathBuf },

    #[error("cannot determine the installed application")]
    CurrentExe(#[source] io::Error),

    #[error("failed to move {} aside before installing", .target.display())]
    Backup {
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy the new version to {}", .target.display())]
    Copy {
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} cannot be launched", .target.display())]
    NotLaunchable { target: PathBuf },

    #[error("failed to relaunch {}", .target.display())]
    Relaunch {
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("install task failed")]
    Task(#[from] tokio::task::JoinError),
}

/// Replaces the installed application and starts the new one.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Replace the installed application with the bundle at `bundle`.
    async fn install(&self, bundle: &Path) -> Result<(), InstallError>;

    /// Start the freshly installed application.
    fn relaunch(&self) -> Result<(), InstallError>;
}

/// Installs by copying the bundle over a target path.
///
/// The previous installation is moved to a hidden sibling first. If the copy
/// fails the sibling is moved back; after a successful copy it is deleted.
/// There is no way back once `install` has returned `Ok`.
#[derive(Debug, Clone)]
pub struct BundleInstaller {
    target: PathBuf,
    relaunch: bool,
    exit_after_relaunch: bool,
}

impl BundleInstaller {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            relaunch: true,
            exit_after_relaunch: false,
        }
    }

    /// Installer targeting the running application: the enclosing `.app`
    /// bundle on macOS, the executable itself elsewhere.
    pub fn for_current_app() -> Result<Self, InstallError> {
        let exe = std::env::current_exe().map_err(InstallError::CurrentExe)?;
        Ok(Self::new(installed_app_path(&exe, platform::is_macos())))
    }

    #[must_use]
    pub const fn with_relaunch(mut self, relaunch: bool) -> Self {
        self.relaunch = relaunch;
        self
    }

    /// Terminate this process once the new one has been spawned.
    #[must_use]
    pub const fn exit_after_relaunch(mut self, exit: bool) -> Self {
        self.exit_after_relaunch = exit;
        self
    }

    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }
}

pub(crate) fn installed_app_path(exe: &Path, macos: bool) -> PathBuf {
    if macos {
        let bundle = exe.ancestors().find(|dir| {
            dir.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext == "app")
        });
        if let Some(bundle) = bundle {
            return bundle.to_path_buf();
        }
    }
    exe.to_path_buf()
}

fn backup_path(target: &Path) -> PathBuf {
    let name = target.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    target.with_file_name(format!(".{}.backup-{}", name, uuid::Uuid::new_v4()))
}

fn replace(bundle: &Path, target: &Path) -> Result<(), InstallError> {
    if !bundle.exists() {
        return Err(InstallError::MissingBundle {
            bundle: bundle.to_path_buf(),
        });
    }

    let backup = if target.exists() {
        let backup = backup_path(target);
        std::fs::rename(target, &backup).map_err(|source| InstallError::Backup {
            target: target.to_path_buf(),
            source,
        })?;
        debug!("Moved {} to {}", target.display(), backup.display());
        Some(backup)
    } else {
        None
    };

    if let Err(source) = copy_path(bundle, target) {
        remove_path_quietly(target);
        if let Some(backup) = &backup {
            if let Err(e) = std::fs::rename(backup, target) {
                warn!("Could not restore {} from {}: {}", target.display(), backup.display(), e);
            }
        }
        return Err(InstallError::Copy {
            target: target.to_path_buf(),
            source,
        });
    }

    if let Some(backup) = &backup {
        remove_path_quietly(backup);
    }
    Ok(())
}

#[async_trait]
impl Installer for BundleInstaller {
    async fn install(&self, bundle: &Path) -> Result<(), InstallError> {
        let bundle = bundle.to_path_buf();
        let target = self.target.clone();
        info!("Installing {} to {}", bundle.display(), target.display());
        tokio::task::spawn_blocking(move || replace(&bundle, &target)).await?
    }

    fn relaunch(&self) -> Result<(), InstallError> {
        if !self.relaunch {
            debug!("Relaunch disabled");
            return Ok(());
        }

        let mut command = if platform::is_macos() && self.target.is_dir() {
            let mut open = Command::new("open");
            open.arg("-n").arg(&self.target);
            open
        } else if self.target.is_file() {
            Command::new(&self.target)
        } else {
            return Err(InstallError::NotLaunchable {
                target: self.target.clone(),
            });
        };

        command.spawn().map_err(|source| InstallError::Relaunch {
            target: self.target.clone(),
            source,
        })?;
        info!("Relaunched {}", self.target.display());

        if self.exit_after_relaunch {
            std::process::exit(0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_bundle(root: &Path, name: &str, marker: &str) -> PathBuf {
        let bundle = root.join(name);
        fs::create_dir_all(bundle.join("Contents")).unwrap();
        fs::write(bundle.join("Contents/version"), marker).unwrap();
        bundle
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.contains(".backup-"))
            .collect()
    }

    #[tokio::test]
    async fn test_install_replaces_existing_bundle() {
        let temp = TempDir::new().unwrap();
        let apps = temp.path().join("Applications");
        let target = make_bundle(&apps, "Desktop.app", "1.0.0");
        fs::write(target.join("Contents/obsolete"), "old").unwrap();
        let bundle = make_bundle(temp.path(), "Desktop.app", "2.0.0");

        let installer = BundleInstaller::new(&target);
        installer.install(&bundle).await.unwrap();

        assert_eq!(fs::read_to_string(target.join("Contents/version")).unwrap(), "2.0.0");
        assert!(!target.join("Contents/obsolete").exists());
        assert!(leftovers(&apps).is_empty());
        // The source bundle is left for the caller to clean up.
        assert!(bundle.exists());
    }

    #[tokio::test]
    async fn test_install_to_missing_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("Desktop.app");
        let bundle = make_bundle(&temp.path().join("extract"), "Desktop.app", "2.0.0");

        BundleInstaller::new(&target).install(&bundle).await.unwrap();
        assert_eq!(fs::read_to_string(target.join("Contents/version")).unwrap(), "2.0.0");
    }

    #[tokio::test]
    async fn test_missing_bundle_keeps_installation() {
        let temp = TempDir::new().unwrap();
        let target = make_bundle(temp.path(), "Desktop.app", "1.0.0");

        let result = BundleInstaller::new(&target).install(&temp.path().join("Nope.app")).await;
        assert!(matches!(result, Err(InstallError::MissingBundle { .. })));
        assert_eq!(fs::read_to_string(target.join("Contents/version")).unwrap(), "1.0.0");
    }

    #[test]
    fn test_installed_app_path() {
        let exe = Path::new("/Applications/Desktop.app/Contents/MacOS/desktop");
        assert_eq!(installed_app_path(exe, true), PathBuf::from("/Applications/Desktop.app"));
        assert_eq!(installed_app_path(exe, false), exe);

        let bare = Path::new("/usr/local/bin/desktop");
        assert_eq!(installed_app_path(bare, true), bare);
    }

    #[test]
    fn test_relaunch_disabled_and_not_launchable() {
        let temp = TempDir::new().unwrap();
        let installer = BundleInstaller::new(temp.path().join("missing")).with_relaunch(false);
        assert!(installer.relaunch().is_ok());

        let installer = BundleInstaller::new(temp.path().join("missing"));
        assert!(matches!(installer.relaunch(), Err(InstallError::NotLaunchable { .. })));
    }
}
