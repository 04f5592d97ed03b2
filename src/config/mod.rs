//! Application configuration loaded from CLI, environment, and files.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.revwatch.toml` in current directory, home
//!    directory, or `revwatch.toml` in the XDG config directory
//! 3. **Environment variables** – `REVWATCH_*`, plus `GITHUB_TOKEN` as a
//!    token fallback
//! 4. **Command-line arguments** – `--interval-seconds`/`-i`, `--author`/`-a`
//!    and friends
//!
//! # Configuration File
//!
//! ```toml
//! token = "ghp_example"
//! interval_seconds = 120
//! assigned_query = "is:open is:pr user-review-requested:@me draft:false"
//! author = "octocat"
//! cache_file = "/home/octocat/.local/state/revwatch/state.json"
//! notifier = "notify-send"
//! ```

use std::env;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::github::{GitHubError, MAX_PAGE_SIZE, PersonalAccessToken, resolve_api_base};
use crate::notify::{NotifierBackend, NotifyError};
use crate::watch::{
    DEFAULT_ASSIGNED_QUERY, DEFAULT_MAX_RESULTS, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT,
    MAX_POLL_INTERVAL, MonitorConfig,
};

const DEFAULT_GITHUB_HOST: &str = "github.com";
const APP_DIR: &str = "revwatch";
const STATE_FILE: &str = "state.json";

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use ortho_config::OrthoConfig;
/// use revwatch::RevwatchConfig;
///
/// let config = RevwatchConfig::load().expect("failed to load configuration");
/// config.validate().expect("invalid configuration");
/// let token = config.resolve_token().expect("token required");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "REVWATCH",
    discovery(
        dotfile_name = ".revwatch.toml",
        config_file_name = "revwatch.toml",
        app_name = "revwatch"
    )
)]
pub struct RevwatchConfig {
    /// Personal access token for GitHub API authentication.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `REVWATCH_TOKEN` or `GITHUB_TOKEN`
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// GitHub host, either `github.com` or a GitHub Enterprise host.
    #[ortho_config()]
    pub github_host: String,

    /// Seconds between poll passes. Defaults to three minutes.
    #[ortho_config(cli_short = 'i')]
    pub interval_seconds: u64,

    /// Search query selecting pull requests awaiting your review.
    #[ortho_config(cli_short = 'q')]
    pub assigned_query: String,

    /// Login whose authored pull requests are tracked.
    ///
    /// Defaults to the authenticated user.
    #[ortho_config(cli_short = 'a')]
    pub author: Option<String>,

    /// Path of the state file.
    ///
    /// Defaults to `$XDG_STATE_HOME/revwatch/state.json`, falling back to
    /// `$HOME/.local/state/revwatch/state.json`.
    #[ortho_config(cli_short = 'c')]
    pub cache_file: Option<String>,

    /// Result cap for each listing call, between 1 and 100.
    #[ortho_config(cli_short = 'm')]
    pub max_results: u8,

    /// Notification backend: `osascript`, `notify-send` or `log`.
    ///
    /// Defaults to the platform's native notifier.
    #[ortho_config(cli_short = 'n')]
    pub notifier: Option<String>,

    /// Seconds allowed for each GitHub call or notification.
    #[ortho_config()]
    pub request_timeout_seconds: u64,

    /// Writes one JSON telemetry line per poll pass to stderr.
    #[ortho_config()]
    pub telemetry: bool,
}

impl Default for RevwatchConfig {
    fn default() -> Self {
        Self {
            token: None,
            github_host: DEFAULT_GITHUB_HOST.to_owned(),
            interval_seconds: DEFAULT_POLL_INTERVAL.as_secs(),
            assigned_query: DEFAULT_ASSIGNED_QUERY.to_owned(),
            author: None,
            cache_file: None,
            max_results: DEFAULT_MAX_RESULTS,
            notifier: None,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            telemetry: false,
        }
    }
}

impl RevwatchConfig {
    /// Resolves the token from configuration or the `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::MissingToken`] when no source provides a
    /// non-blank value.
    pub fn resolve_token(&self) -> Result<PersonalAccessToken, GitHubError> {
        let value = self
            .token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .or_else(|| env::var("GITHUB_TOKEN").ok())
            .ok_or(GitHubError::MissingToken)?;
        PersonalAccessToken::new(value)
    }

    /// REST API base URL for the configured host.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::InvalidUrl`] when the host cannot be parsed.
    pub fn api_base(&self) -> Result<Url, GitHubError> {
        resolve_api_base(&self.github_host)
    }

    /// Configured author login, ignoring blank values.
    #[must_use]
    pub fn configured_author(&self) -> Option<&str> {
        self.author
            .as_deref()
            .map(str::trim)
            .filter(|author| !author.is_empty())
    }

    /// Notification backend, falling back to the platform default.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::UnknownBackend`] for unrecognised names.
    pub fn notifier_backend(&self) -> Result<NotifierBackend, NotifyError> {
        match self.notifier.as_deref().map(str::trim) {
            None | Some("") => Ok(NotifierBackend::platform_default()),
            Some(name) => name.parse(),
        }
    }

    /// Path of the state file, from configuration or the environment.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::Configuration`] when no path is configured and
    /// neither `XDG_STATE_HOME` nor `HOME` is set.
    pub fn resolve_cache_path(&self) -> Result<Utf8PathBuf, GitHubError> {
        let xdg = env::var("XDG_STATE_HOME")
            .ok()
            .filter(|value| !value.is_empty());
        let home = env::var("HOME").ok().filter(|value| !value.is_empty());

        resolve_cache_path_from(self.cache_file.as_deref(), xdg.as_deref(), home.as_deref())
    }

    /// Checks value ranges that the loader cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::Configuration`] describing the first invalid
    /// setting.
    pub fn validate(&self) -> Result<(), GitHubError> {
        if self.interval_seconds == 0 {
            return Err(configuration_error("interval_seconds must be at least 1"));
        }
        if self.interval_seconds > MAX_POLL_INTERVAL.as_secs() {
            return Err(configuration_error(&format!(
                "interval_seconds must be at most {}, got {}",
                MAX_POLL_INTERVAL.as_secs(),
                self.interval_seconds
            )));
        }
        if self.max_results == 0 || self.max_results > MAX_PAGE_SIZE {
            return Err(configuration_error(&format!(
                "max_results must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.max_results
            )));
        }
        if self.request_timeout_seconds == 0 {
            return Err(configuration_error(
                "request_timeout_seconds must be at least 1",
            ));
        }
        if self.assigned_query.trim().is_empty() {
            return Err(configuration_error("assigned_query must not be empty"));
        }
        self.notifier_backend()
            .map(|_| ())
            .map_err(|error| configuration_error(&error.to_string()))
    }

    /// Builds the poll loop settings for `author`.
    #[must_use]
    pub fn monitor_config(&self, author: String) -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_secs(self.interval_seconds),
            assigned_query: self.assigned_query.trim().to_owned(),
            author,
            max_results: self.max_results.clamp(1, MAX_PAGE_SIZE),
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
        }
    }
}

fn configuration_error(message: &str) -> GitHubError {
    GitHubError::Configuration {
        message: message.to_owned(),
    }
}

/// Resolves the state file path from optional configuration and
/// environment values.
pub(crate) fn resolve_cache_path_from(
    configured: Option<&str>,
    xdg_state_home: Option<&str>,
    home: Option<&str>,
) -> Result<Utf8PathBuf, GitHubError> {
    if let Some(path) = configured.map(str::trim).filter(|path| !path.is_empty()) {
        return Ok(Utf8PathBuf::from(path));
    }

    if let Some(state_home) = xdg_state_home {
        return Ok(Utf8PathBuf::from(state_home).join(APP_DIR).join(STATE_FILE));
    }

    if let Some(home_dir) = home {
        return Ok(Utf8PathBuf::from(home_dir)
            .join(".local")
            .join("state")
            .join(APP_DIR)
            .join(STATE_FILE));
    }

    Err(configuration_error(
        "unable to resolve state file: neither XDG_STATE_HOME nor HOME is set",
    ))
}

#[cfg(test)]
mod tests;
