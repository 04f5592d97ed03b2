//! Error types exposed by the GitHub data source layer.

use thiserror::Error;

/// Errors surfaced while resolving entities or communicating with GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GitHubError {
    /// The provided URL could not be parsed.
    #[error("pull request URL is invalid: {0}")]
    InvalidUrl(String),

    /// The pull request path is incomplete.
    #[error("pull request URL must match /owner/repo/pull/<number>, got {path}")]
    MissingPathSegments {
        /// Path component of the offending URL.
        path: String,
    },

    /// The pull request number is not a valid integer.
    #[error("pull request number must be a positive integer")]
    InvalidPullRequestNumber,

    /// The authentication token was missing.
    #[error("personal access token is required (use --token, REVWATCH_TOKEN or GITHUB_TOKEN)")]
    MissingToken,

    /// The authentication token was rejected by GitHub.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// GitHub error message returned with the 401/403 response.
        message: String,
    },

    /// GitHub returned a non-authentication API error.
    #[error("GitHub API error: {message}")]
    Api {
        /// Response body from GitHub describing the failure.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("unexpected GitHub response: {message}")]
    Decode {
        /// Deserialisation failure detail.
        message: String,
    },

    /// Networking failed while calling GitHub.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// The call did not finish within the configured request timeout.
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// Name of the operation that timed out.
        operation: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },
}
