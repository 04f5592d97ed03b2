//! Sink that reports notifications through `tracing` only.

use async_trait::async_trait;

use super::{Notification, NotificationSink, NotifyError};

/// Writes each notification as an `info` event. Useful on headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            title = %notification.title,
            subtitle = %notification.subtitle,
            link = notification.link.as_deref().unwrap_or(""),
            "{}",
            notification.body
        );
        Ok(())
    }
}
