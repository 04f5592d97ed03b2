//! Desktop notification sinks backed by external notifier programs.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{Notification, NotificationSink, NotifyError};

const APP_NAME: &str = "revwatch";

/// Displays notifications in macOS Notification Center via `osascript`.
#[derive(Debug, Clone)]
pub struct OsascriptSink {
    program: String,
}

impl OsascriptSink {
    /// Uses `program` instead of `osascript`.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for OsascriptSink {
    fn default() -> Self {
        Self::with_program("osascript")
    }
}

#[async_trait]
impl NotificationSink for OsascriptSink {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let args = osascript_args(&notification.truncated());
        run_notifier(&self.program, &args).await
    }
}

/// Displays freedesktop notifications via `notify-send`.
#[derive(Debug, Clone)]
pub struct NotifySendSink {
    program: String,
}

impl NotifySendSink {
    /// Uses `program` instead of `notify-send`.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for NotifySendSink {
    fn default() -> Self {
        Self::with_program("notify-send")
    }
}

#[async_trait]
impl NotificationSink for NotifySendSink {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let args = notify_send_args(&notification.truncated());
        run_notifier(&self.program, &args).await
    }
}

/// Quotes `value` as an AppleScript string literal.
fn applescript_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn osascript_args(notification: &Notification) -> Vec<String> {
    let mut script = format!(
        "display notification {} with title {}",
        applescript_string(&notification.body),
        applescript_string(&notification.title)
    );
    if !notification.subtitle.is_empty() {
        script.push_str(" subtitle ");
        script.push_str(&applescript_string(&notification.subtitle));
    }
    vec!["-e".to_owned(), script]
}

fn notify_send_args(notification: &Notification) -> Vec<String> {
    let lines: Vec<&str> = [
        Some(notification.subtitle.as_str()),
        Some(notification.body.as_str()),
        notification.link.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|line| !line.is_empty())
    .collect();
    let body = lines.join("\n");
    vec![
        format!("--app-name={APP_NAME}"),
        notification.title.clone(),
        body,
    ]
}

async fn run_notifier(program: &str, args: &[String]) -> Result<(), NotifyError> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|error| NotifyError::Spawn {
            program: program.to_owned(),
            message: error.to_string(),
        })?;

    if output.status.success() {
        return Ok(());
    }

    Err(NotifyError::CommandFailed {
        program: program.to_owned(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    })
}
