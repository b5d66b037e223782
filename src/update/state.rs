//! Lifecycle states of a single update.

use std::fmt;
use std::sync::Arc;

use super::UpdateError;

/// Where an [`Update`](super::Update) is in its lifecycle.
///
/// ```text
/// Waiting --start--> Downloading(0.0) --> Extracting --> Installing --> Completed
///    \________________ cancel() __________________________/
///                          \--> Canceled
/// any step --failure--> Failed(error)
/// ```
///
/// `Completed`, `Canceled` and `Failed` are terminal.
#[derive(Debug, Clone)]
pub enum UpdateState {
    /// Created, not started yet.
    Waiting,
    /// Transfer in flight; fraction of the archive received, in `[0, 1]`.
    Downloading(f64),
    /// Unpacking the downloaded archive.
    Extracting,
    /// Replacing the installed application.
    Installing,
    /// Install finished; relaunch has been requested.
    Completed,
    /// Canceled by the owner. No further transition happens.
    Canceled,
    /// An operational step failed.
    Failed(Arc<UpdateError>),
}

impl UpdateState {
    /// True for `Completed`, `Canceled` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Failed(_))
    }

    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Download fraction while `Downloading`.
    #[must_use]
    pub const fn progress(&self) -> Option<f64> {
        match self {
            Self::Downloading(progress) => Some(*progress),
            _ => None,
        }
    }

    /// The failure, if the update failed.
    #[must_use]
    pub fn error(&self) -> Option<&UpdateError> {
        match self {
            Self::Failed(error) => Some(error.as_ref()),
            _ => None,
        }
    }

    /// Short status line shown next to the progress indicator.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Waiting => "Waiting...".to_string(),
            Self::Downloading(_) => "Downloading...".to_string(),
            Self::Extracting => "Unzipping...".to_string(),
            Self::Installing => "Installing...".to_string(),
            Self::Completed => "Completed".to_string(),
            Self::Canceled => "Canceled".to_string(),
            Self::Failed(error) => error.describe(),
        }
    }

    /// Variant name without payload, for logs.
    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Downloading(_) => "downloading",
            Self::Extracting => "extracting",
            Self::Installing => "installing",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloading(progress) => write!(f, "downloading ({:.0}%)", progress * 100.0),
            Self::Failed(error) => write!(f, "failed: {error}"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::UnpackError;
    use std::path::PathBuf;

    #[test]
    fn test_terminal_states() {
        assert!(!UpdateState::Waiting.is_terminal());
        assert!(!UpdateState::Downloading(0.5).is_terminal());
        assert!(!UpdateState::Extracting.is_terminal());
        assert!(!UpdateState::Installing.is_terminal());
        assert!(UpdateState::Completed.is_terminal());
        assert!(UpdateState::Canceled.is_terminal());

        let failed = UpdateState::Failed(Arc::new(UpdateError::UnpackFailed(
            UnpackError::NoBundle {
                directory: PathBuf::from("/tmp/x"),
                extension: "app".to_string(),
            },
        )));
        assert!(failed.is_terminal());
        assert!(failed.error().is_some());
    }

    #[test]
    fn test_labels() {
        assert_eq!(UpdateState::Downloading(0.1).label(), "Downloading...");
        assert_eq!(UpdateState::Extracting.label(), "Unzipping...");
        assert_eq!(UpdateState::Installing.label(), "Installing...");
        assert_eq!(UpdateState::Completed.label(), "Completed");
        assert_eq!(UpdateState::Canceled.label(), "Canceled");
    }

    #[test]
    fn test_display_and_progress() {
        assert_eq!(UpdateState::Downloading(0.25).to_string(), "downloading (25%)");
        assert_eq!(UpdateState::Downloading(0.25).progress(), Some(0.25));
        assert_eq!(UpdateState::Installing.progress(), None);
    }
}
