//! `revwatch` watches GitHub for review activity and raises desktop
//! notifications.
//!
//! The crate polls two flows on an interval: pull requests awaiting the
//! user's review, and comments or reviews on pull requests the user
//! authored. Per pull request watermarks are persisted to a JSON state file
//! so each event notifies exactly once, across restarts included.
//!
//! - [`github`] fetches snapshots through Octocrab.
//! - [`watch`] holds the state store, the change detector and the poll loop.
//! - [`notify`] displays notifications.
//! - [`config`] loads layered configuration.

pub mod config;
pub mod error;
pub mod github;
pub mod notify;
pub mod telemetry;
pub mod watch;

pub use config::RevwatchConfig;
pub use error::AppError;
pub use github::{GitHubError, OctocrabActivitySource, PersonalAccessToken, ReviewActivitySource};
pub use notify::{NotificationSink, NotifierBackend};
pub use watch::{Monitor, MonitorConfig, PassReport, StateStore};
