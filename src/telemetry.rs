//! Poll telemetry events and sinks.
//!
//! `revwatch` never transmits telemetry. Events are either dropped or
//! written to stderr as JSON lines for local inspection of poll behaviour.

use std::io;

use serde::{Deserialize, Serialize};

/// A structured telemetry event emitted by the poll loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Summary of one completed poll pass.
    PollPassCompleted {
        /// Whether notifications were enabled for this pass.
        initialized: bool,
        /// Assigned pull requests returned by the search.
        assigned_seen: usize,
        /// Notifications raised by the assigned flow.
        assigned_notified: usize,
        /// Authored pull requests returned by the listing.
        authored_seen: usize,
        /// Notifications raised by the authored flow.
        authored_notified: usize,
        /// Notifications the sink failed to display.
        notification_failures: usize,
        /// Failed data source calls across both flows.
        fetch_errors: usize,
        /// Whether the state file was written.
        persisted: bool,
        /// Wall-clock duration of the pass in milliseconds.
        duration_ms: u64,
    },
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Telemetry sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Records telemetry events to stderr as JSON lines (JSONL).
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        let _ignored = writeln_stderr(&serialised);
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}

/// Telemetry sinks for tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::sync::{Mutex, PoisonError};

    use super::{TelemetryEvent, TelemetrySink};

    /// Keeps every recorded event in memory.
    #[derive(Debug, Default)]
    pub struct RecordingTelemetrySink {
        events: Mutex<Vec<TelemetryEvent>>,
    }

    impl RecordingTelemetrySink {
        /// Events recorded so far, in order.
        #[must_use]
        pub fn events(&self) -> Vec<TelemetryEvent> {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl TelemetrySink for RecordingTelemetrySink {
        fn record(&self, event: TelemetryEvent) {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event);
        }
    }
}
