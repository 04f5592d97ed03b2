//! Review activity watching.
//!
//! - [`state`] holds the persisted watermarks.
//! - [`detector`] decides which observed activity is new.
//! - [`monitor`] drives the periodic poll and ties the pieces together.

pub mod detector;
pub mod monitor;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use detector::{
    AssignedDecision, AuthoredDecision, assigned_notification, decide_assigned, decide_authored,
    summarize_text, title_case,
};
pub use monitor::{
    Cancelled, DEFAULT_ASSIGNED_QUERY, DEFAULT_MAX_RESULTS, DEFAULT_POLL_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT, FlowReport, MAX_POLL_INTERVAL, Monitor, MonitorConfig, PassReport,
    PollPhase,
};
pub use state::{AuthoredWatermark, StateError, StateStore, WatchState};
