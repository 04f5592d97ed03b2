//! Process-level error type for the `revwatch` binary.

use thiserror::Error;

use crate::github::GitHubError;
use crate::notify::NotifyError;
use crate::watch::StateError;

/// Errors that stop the process during bootstrap.
///
/// Nothing inside a poll pass is fatal; these cover configuration,
/// credentials, author resolution and loading the state file.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration error: {message}")]
    Configuration {
        /// Loader error detail.
        message: String,
    },

    /// The authenticated user's login could not be determined.
    #[error("failed to resolve the authenticated GitHub user: {0}")]
    AuthorResolution(GitHubError),

    /// GitHub client setup or configuration failed.
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    /// The notifier backend is invalid.
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// The state file could not be loaded.
    #[error(transparent)]
    State(#[from] StateError),
}
