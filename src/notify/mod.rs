//! Notification delivery.
//!
//! The poll loop hands every generated [`Notification`] to a
//! [`NotificationSink`]. Delivery failures are reported back but never stop
//! watermark bookkeeping.

mod desktop;
mod logging;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use desktop::{NotifySendSink, OsascriptSink};
pub use logging::LogSink;

/// Maximum title length shown by desktop notifiers.
pub const TITLE_LIMIT: usize = 128;
/// Maximum subtitle length shown by desktop notifiers.
pub const SUBTITLE_LIMIT: usize = 256;
/// Maximum body length shown by desktop notifiers.
pub const BODY_LIMIT: usize = 512;

/// A single user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Headline, usually the pull request title.
    pub title: String,
    /// Secondary line identifying the repository or pull request.
    pub subtitle: String,
    /// Event summary.
    pub body: String,
    /// Web link to the activity, when known.
    ///
    /// `notify-send` and the log sink show it; `osascript` notifications
    /// cannot carry a link and drop it.
    pub link: Option<String>,
}

impl Notification {
    /// Returns a copy with every field truncated to the desktop limits.
    #[must_use]
    pub fn truncated(&self) -> Self {
        Self {
            title: truncate_for_notification(&self.title, TITLE_LIMIT),
            subtitle: truncate_for_notification(&self.subtitle, SUBTITLE_LIMIT),
            body: truncate_for_notification(&self.body, BODY_LIMIT),
            link: self.link.clone(),
        }
    }
}

/// Errors raised while displaying a notification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// The notifier program could not be started.
    #[error("failed to start {program}: {message}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Operating system error detail.
        message: String,
    },

    /// The notifier program exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        /// Program that failed.
        program: String,
        /// Exit status description.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The configured backend name is unknown.
    #[error("unknown notifier backend '{0}' (expected osascript, notify-send or log)")]
    UnknownBackend(String),
}

/// Sink that displays notifications to the user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Displays a notification.
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Available notification backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierBackend {
    /// macOS Notification Center through `osascript`.
    Osascript,
    /// freedesktop notifications through `notify-send`.
    NotifySend,
    /// Writes notifications to the log only.
    Log,
}

impl NotifierBackend {
    /// Backend used when none is configured for the current platform.
    #[must_use]
    pub const fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::Osascript
        } else if cfg!(target_os = "linux") {
            Self::NotifySend
        } else {
            Self::Log
        }
    }

    /// Builds the sink for this backend.
    #[must_use]
    pub fn into_sink(self) -> Arc<dyn NotificationSink> {
        match self {
            Self::Osascript => Arc::new(OsascriptSink::default()),
            Self::NotifySend => Arc::new(NotifySendSink::default()),
            Self::Log => Arc::new(LogSink),
        }
    }

    /// Configuration name of the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Osascript => "osascript",
            Self::NotifySend => "notify-send",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for NotifierBackend {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for NotifierBackend {
    type Err = NotifyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "osascript" | "macos" => Ok(Self::Osascript),
            "notify-send" | "notify_send" | "linux" => Ok(Self::NotifySend),
            "log" | "stdout" => Ok(Self::Log),
            other => Err(NotifyError::UnknownBackend(other.to_owned())),
        }
    }
}

/// Trims `input` and cuts it to `max` characters, appending `…` when cut.
///
/// A `max` of zero disables truncation.
#[must_use]
pub fn truncate_for_notification(input: &str, max: usize) -> String {
    let trimmed = input.trim();
    if max == 0 || trimmed.chars().count() <= max {
        return trimmed.to_owned();
    }

    let head: String = trimmed.chars().take(max).collect();
    format!("{}…", head.trim_end())
}
