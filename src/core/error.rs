//! Error handling for release-updater
//!
//! Every component reports its own `thiserror` enum
//! ([`CatalogError`], [`MatcherError`], [`DownloadError`], [`InstallError`],
//! [`UpdateError`], [`StartError`]). [`UpdaterError`] gathers them for the
//! command line tool, and [`ErrorContext`] adds the details and suggestions
//! shown to users.
//!
//! # Error Display
//!
//! [`ErrorContext::display`] prints to stderr:
//! - the error in red and bold
//! - details in yellow
//! - a suggestion in green
//!
//! # Examples
//!
//! ```rust,no_run
//! use release_updater::core::{ErrorContext, UpdaterError};
//!
//! let context = ErrorContext::new(UpdaterError::NoReleaseAvailable)
//!     .with_suggestion("Publish a release with an asset for this platform")
//!     .with_details("Drafts and releases without a semantic version tag are ignored");
//!
//! context.display();
//! ```
//!
//! Converting any error from the CLI:
//!
//! ```rust,no_run
//! use release_updater::core::user_friendly_error;
//!
//! let error = anyhow::anyhow!("Something went wrong");
//! user_friendly_error(error).display();
//! ```

use colored::Colorize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::matcher::MatcherError;
use crate::update::{
    DownloadError, ExtractError, InstallError, StartError, UnpackError, UpdateError,
};

/// Top-level error for release-updater operations.
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// Invalid configuration value.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong
        message: String,
    },

    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was given
        path: String,
    },

    /// A version string is not a semantic version.
    #[error("Invalid version: {version}")]
    InvalidVersion {
        /// Version as given
        version: String,
    },

    /// The catalog had no release usable on this platform.
    #[error("No release available for this platform")]
    NoReleaseAvailable,

    /// A specific requested version is not among the resolved releases.
    #[error("Release {version} not found")]
    ReleaseNotFound {
        /// Requested version
        version: String,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Matcher(#[from] MatcherError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Start(#[from] StartError),

    /// The update ran and ended in `Failed`.
    #[error("Update failed: {}", .0.describe())]
    Update(Arc<UpdateError>),

    /// The update was canceled before it completed.
    #[error("Update canceled")]
    Canceled,

    /// Anything else, with its cause chain already rendered.
    #[error("{message}")]
    Other {
        /// Full message
        message: String,
    },
}

/// An [`UpdaterError`] with user-facing details and a suggestion.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdaterError,
    /// How to fix it, if known
    pub suggestion: Option<String>,
    /// Background on what happened
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: UpdaterError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion, displayed in green.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details, displayed in yellow.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details and suggestion to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Render `error` followed by its numbered causes.
fn with_chain<'a>(message: String, causes: impl Iterator<Item = &'a (dyn std::error::Error + 'static)>) -> String {
    let mut message = message;
    for (i, cause) in causes.enumerate() {
        if i == 0 {
            message.push_str("\n\nCaused by:");
        }
        message.push_str(&format!("\n  {}: {}", i + 1, cause));
    }
    message
}

/// Convert any error into an [`ErrorContext`] with a helpful suggestion.
///
/// Known error types get tailored suggestions; everything else keeps its full
/// cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<UpdaterError>() {
        Ok(updater_error) => return create_error_context(updater_error),
        Err(error) => error,
    };

    let error = match error.downcast::<CatalogError>() {
        Ok(catalog_error) => return create_error_context(UpdaterError::Catalog(catalog_error)),
        Err(error) => error,
    };

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(UpdaterError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the configuration file");
    }

    let permission_denied = error.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|e| e.kind() == std::io::ErrorKind::PermissionDenied)
    });

    let context = ErrorContext::new(UpdaterError::Other {
        message: with_chain(error.to_string(), error.chain().skip(1)),
    });
    if permission_denied {
        context.with_suggestion(
            "Check that the installed application is writable by the current user",
        )
    } else {
        context
    }
}

/// Attach suggestions to a known [`UpdaterError`].
fn create_error_context(error: UpdaterError) -> ErrorContext {
    match &error {
        UpdaterError::ConfigNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Create the file or drop --config to use the default location"),
        UpdaterError::ConfigError { .. } => ErrorContext::new(error).with_suggestion(
            "Fix the configuration file (default: ~/.release-updater/config.toml)",
        ),
        UpdaterError::InvalidVersion { .. } => ErrorContext::new(error)
            .with_suggestion("Use a semantic version such as 1.4.0 or v1.4.0"),
        UpdaterError::NoReleaseAvailable => ErrorContext::new(error)
            .with_suggestion("Check the [assets] settings, or use --any to include prereleases")
            .with_details(
                "Drafts, releases without a semantic version tag and releases with zero or \
                 several matching assets are ignored",
            ),
        UpdaterError::ReleaseNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'release-updater list --all' to see the available versions"),
        UpdaterError::Catalog(catalog) => {
            let suggestion = match catalog {
                CatalogError::Status { status: 401 | 403, .. } => Some(
                    "Set [repository] token or GITHUB_TOKEN; anonymous requests are rate limited",
                ),
                CatalogError::Status { status: 404, .. } => {
                    Some("Check [repository] owner and name, and that the token can read it")
                }
                CatalogError::Request { .. } => Some("Check your network connection"),
                CatalogError::InvalidRepository { .. } => {
                    Some("Owner and repository names must not contain '/' or whitespace")
                }
                _ => None,
            };
            let details = with_chain(String::new(), std::iter::successors(
                std::error::Error::source(catalog),
                |e| e.source(),
            ));
            let mut context = ErrorContext::new(error);
            if let Some(suggestion) = suggestion {
                context = context.with_suggestion(suggestion);
            }
            if !details.is_empty() {
                context = context.with_details(details.trim_start().to_string());
            }
            context
        }
        UpdaterError::Matcher(MatcherError::UnknownPlatform { .. }) => ErrorContext::new(error)
            .with_suggestion("Set [assets] suffix, glob or regex for this platform"),
        UpdaterError::Extract(ExtractError::ProgramNotFound { .. }) => ErrorContext::new(error)
            .with_suggestion("Install the unpack program or set [install] extractor = \"zip\""),
        UpdaterError::Update(update) => {
            let suggestion = match update.as_ref() {
                UpdateError::DownloadFailed(_) => "Check your network connection and try again",
                UpdateError::UnpackFailed(UnpackError::Extractor(_)) => {
                    "Check [install] extractor and unpack_command"
                }
                UpdateError::UnpackFailed(_) => {
                    "Check [install] bundle_extension against the archive contents"
                }
                UpdateError::InstallFailed(_) => {
                    "Check that the install target is writable by the current user"
                }
            };
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_display() {
        let context = ErrorContext::new(UpdaterError::NoReleaseAvailable)
            .with_details("nothing matched")
            .with_suggestion("publish one");
        let text = context.to_string();
        assert!(text.starts_with("No release available for this platform"));
        assert!(text.contains("Details: nothing matched"));
        assert!(text.contains("Suggestion: publish one"));
    }

    #[test]
    fn test_user_friendly_updater_error() {
        let error = anyhow::Error::new(UpdaterError::ReleaseNotFound {
            version: "9.9.9".to_string(),
        });
        let context = user_friendly_error(error);
        assert!(matches!(context.error, UpdaterError::ReleaseNotFound { .. }));
        assert!(context.suggestion.unwrap().contains("list --all"));
    }

    #[test]
    fn test_user_friendly_catalog_status() {
        let error = anyhow::Error::new(CatalogError::Status {
            status: 403,
            url: "https://api.github.com/repos/acme/desktop/releases".to_string(),
            body: String::new(),
        });
        let context = user_friendly_error(error);
        assert!(matches!(context.error, UpdaterError::Catalog(_)));
        assert!(context.suggestion.unwrap().contains("GITHUB_TOKEN"));
    }

    #[test]
    fn test_user_friendly_update_failure() {
        let update = UpdateError::UnpackFailed(UnpackError::NoBundle {
            directory: "/tmp/x".into(),
            extension: "app".to_string(),
        });
        let context = user_friendly_error(UpdaterError::Update(Arc::new(update)).into());
        assert!(context.error.to_string().starts_with("Update failed: unpack failed: no .app bundle"));
        assert!(context.suggestion.unwrap().contains("bundle_extension"));

        let update = UpdateError::UnpackFailed(UnpackError::Extractor(ExtractError::EmptyCommand));
        let context = user_friendly_error(UpdaterError::Update(Arc::new(update)).into());
        assert!(
            context
                .error
                .to_string()
                .contains("unpack failed: extractor failed: unpack command is empty")
        );
        assert!(context.suggestion.unwrap().contains("unpack_command"));
    }

    #[test]
    fn test_user_friendly_generic_keeps_chain() {
        let error = anyhow::anyhow!("root cause").context("while updating");
        let context = user_friendly_error(error);
        let text = context.error.to_string();
        assert!(text.starts_with("while updating"));
        assert!(text.contains("Caused by:"));
        assert!(text.contains("1: root cause"));
    }
}
