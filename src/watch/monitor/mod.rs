//! Poll orchestration.
//!
//! [`Monitor`] runs one pass immediately and then one pass per interval tick.
//! A pass walks `PollingAssigned → PollingAuthored → Persisting`, feeding
//! every fetched pull request through the change detector, dispatching the
//! resulting notifications and recording the advanced watermarks. Every
//! external call is raced against the cancellation token and bounded by the
//! request timeout.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::github::{GitHubError, PullRequestKey, PullRequestSummary, ReviewActivitySource};
use crate::notify::{Notification, NotificationSink};
use crate::telemetry::{NoopTelemetrySink, TelemetryEvent, TelemetrySink};

use super::detector::{assigned_notification, decide_assigned, decide_authored};
use super::state::StateStore;

/// Search used for the assigned flow when none is configured.
pub const DEFAULT_ASSIGNED_QUERY: &str =
    "is:open is:pr archived:false user-review-requested:@me draft:false";
/// Default result cap per listing call.
pub const DEFAULT_MAX_RESULTS: u8 = 30;
/// Default time between poll passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(180);
/// Default bound on a single external call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest accepted time between poll passes.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Settings consumed by the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Time between the start of consecutive passes.
    pub poll_interval: Duration,
    /// Search query for pull requests awaiting the user's review.
    pub assigned_query: String,
    /// Login whose authored pull requests are tracked. Empty disables the
    /// authored flow.
    pub author: String,
    /// Result cap for each listing call.
    pub max_results: u8,
    /// Bound on each data source call and notification dispatch.
    pub request_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            assigned_query: DEFAULT_ASSIGNED_QUERY.to_owned(),
            author: String::new(),
            max_results: DEFAULT_MAX_RESULTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Phase of the poll state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Waiting for the next tick.
    Idle,
    /// Processing pull requests awaiting review.
    PollingAssigned,
    /// Processing pull requests authored by the user.
    PollingAuthored,
    /// Saving the state file.
    Persisting,
}

impl fmt::Display for PollPhase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Idle => "idle",
            Self::PollingAssigned => "polling assigned",
            Self::PollingAuthored => "polling authored",
            Self::Persisting => "persisting",
        })
    }
}

/// The pass was abandoned because cancellation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("poll pass cancelled")]
pub struct Cancelled;

/// Counters for one flow within a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowReport {
    /// Pull requests returned by the listing call.
    pub seen: usize,
    /// Notifications handed to the sink.
    pub notified: usize,
    /// Notifications the sink failed to display.
    pub notification_failures: usize,
    /// Pull requests skipped because their key could not be resolved.
    pub skipped: usize,
    /// Failed per-entity lookups (details, comments or reviews).
    pub lookup_failures: usize,
    /// Whether the listing call itself failed.
    pub listing_failed: bool,
}

impl FlowReport {
    /// Failed data source calls in this flow.
    #[must_use]
    pub fn fetch_errors(&self) -> usize {
        self.lookup_failures + usize::from(self.listing_failed)
    }
}

/// Outcome of one completed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Whether notifications were enabled for this pass.
    pub initialized: bool,
    /// Assigned flow counters.
    pub assigned: FlowReport,
    /// Authored flow counters.
    pub authored: FlowReport,
    /// Whether the state file was written successfully.
    pub persisted: bool,
}

impl PassReport {
    /// Notifications handed to the sink across both flows.
    #[must_use]
    pub const fn notified(&self) -> usize {
        self.assigned.notified + self.authored.notified
    }

    fn telemetry_event(&self, elapsed: Duration) -> TelemetryEvent {
        TelemetryEvent::PollPassCompleted {
            initialized: self.initialized,
            assigned_seen: self.assigned.seen,
            assigned_notified: self.assigned.notified,
            authored_seen: self.authored.seen,
            authored_notified: self.authored.notified,
            notification_failures: self.assigned.notification_failures
                + self.authored.notification_failures,
            fetch_errors: self.assigned.fetch_errors() + self.authored.fetch_errors(),
            persisted: self.persisted,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

enum Interrupted {
    Cancelled,
    TimedOut,
}

/// Races `future` against cancellation and a timeout.
async fn bounded<T>(
    cancel: &CancellationToken,
    timeout: Duration,
    future: impl Future<Output = T>,
) -> Result<T, Interrupted> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Interrupted::Cancelled),
        outcome = tokio::time::timeout(timeout, future) => {
            outcome.map_err(|_| Interrupted::TimedOut)
        }
    }
}

/// Periodic review activity poller.
pub struct Monitor {
    config: MonitorConfig,
    source: Arc<dyn ReviewActivitySource>,
    sink: Arc<dyn NotificationSink>,
    store: Arc<StateStore>,
    telemetry: Arc<dyn TelemetrySink>,
    phase: Mutex<PollPhase>,
}

impl Monitor {
    /// Creates a monitor over the given collaborators.
    #[must_use]
    pub fn new(
        config: MonitorConfig,
        source: Arc<dyn ReviewActivitySource>,
        sink: Arc<dyn NotificationSink>,
        store: Arc<StateStore>,
    ) -> Self {
        Self {
            config,
            source,
            sink,
            store,
            telemetry: Arc::new(NoopTelemetrySink),
            phase: Mutex::new(PollPhase::Idle),
        }
    }

    /// Records a telemetry event per completed pass into `telemetry`.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Current phase of the state machine.
    #[must_use]
    pub fn phase(&self) -> PollPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, phase: PollPhase) {
        tracing::debug!(%phase, "poll phase");
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    /// Polls immediately and then on every interval tick until `cancel`
    /// fires. Ticks missed during a long pass are delayed, not burst.
    pub async fn run(&self, cancel: &CancellationToken) {
        let period = self
            .config
            .poll_interval
            .clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);
        tracing::info!(
            interval_seconds = period.as_secs(),
            author = %self.config.author,
            "watching for review activity"
        );

        if self.poll_once(cancel).await.is_ok() {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if self.poll_once(cancel).await.is_err() {
                    break;
                }
            }
        }

        self.enter(PollPhase::Idle);
        tracing::info!("poll loop stopped");
    }

    /// Runs a single pass over both flows and persists the result.
    ///
    /// The first pass on an uninitialised store only records watermarks and
    /// marks the store initialised before saving.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when `cancel` fires mid-pass; nothing is saved
    /// in that case.
    pub async fn poll_once(&self, cancel: &CancellationToken) -> Result<PassReport, Cancelled> {
        let started = Instant::now();
        let initialized = self.store.is_initialized();

        let outcome = self.poll_flows(cancel, initialized).await;
        let (assigned, authored) = match outcome {
            Ok(flows) => flows,
            Err(cancelled) => {
                self.enter(PollPhase::Idle);
                tracing::info!("poll pass cancelled; state not saved");
                return Err(cancelled);
            }
        };

        self.enter(PollPhase::Persisting);
        if !initialized {
            self.store.mark_initialized();
        }
        let persisted = match self.store.save() {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(path = %self.store.path(), "failed to save state: {error}");
                false
            }
        };
        self.enter(PollPhase::Idle);

        let report = PassReport {
            initialized,
            assigned,
            authored,
            persisted,
        };
        self.telemetry.record(report.telemetry_event(started.elapsed()));
        tracing::info!(
            assigned = report.assigned.seen,
            authored = report.authored.seen,
            notified = report.notified(),
            persisted,
            "poll pass complete"
        );
        Ok(report)
    }

    async fn poll_flows(
        &self,
        cancel: &CancellationToken,
        initialized: bool,
    ) -> Result<(FlowReport, FlowReport), Cancelled> {
        self.enter(PollPhase::PollingAssigned);
        let assigned = self.poll_assigned(cancel, initialized).await?;
        self.enter(PollPhase::PollingAuthored);
        let authored = self.poll_authored(cancel, initialized).await?;
        Ok((assigned, authored))
    }

    async fn poll_assigned(
        &self,
        cancel: &CancellationToken,
        initialized: bool,
    ) -> Result<FlowReport, Cancelled> {
        let mut report = FlowReport::default();
        let listing = self
            .fetch(
                cancel,
                "search assigned pull requests",
                self.source
                    .search_assigned(&self.config.assigned_query, self.config.max_results),
            )
            .await?;
        let pull_requests = match listing {
            Ok(pull_requests) => pull_requests,
            Err(error) => {
                tracing::warn!(flow = "assigned", "listing failed: {error}");
                report.listing_failed = true;
                return Ok(report);
            }
        };
        report.seen = pull_requests.len();

        for pull_request in &pull_requests {
            let Some(key) = resolve_key(pull_request) else {
                report.skipped += 1;
                continue;
            };

            let decision = decide_assigned(
                initialized,
                self.store.assigned_watermark(&key),
                pull_request.updated_at,
            );

            if decision.notify {
                let lookup = self
                    .fetch(
                        cancel,
                        "pull request details",
                        self.source.pull_request_details(&key),
                    )
                    .await?;
                match lookup {
                    Ok(details) => {
                        let notification = assigned_notification(&key, pull_request, &details);
                        self.dispatch(cancel, &key, &notification, &mut report)
                            .await?;
                    }
                    Err(error) => {
                        tracing::warn!(
                            repo = %key.repository(),
                            number = key.number().get(),
                            "failed to load pull request details: {error}"
                        );
                        report.lookup_failures += 1;
                    }
                }
            } else if !initialized {
                tracing::debug!(%key, "baseline recorded without notifying");
            }

            self.store.record_assigned(&key, decision.watermark);
        }

        Ok(report)
    }

    async fn poll_authored(
        &self,
        cancel: &CancellationToken,
        initialized: bool,
    ) -> Result<FlowReport, Cancelled> {
        let mut report = FlowReport::default();
        if self.config.author.trim().is_empty() {
            tracing::debug!("no author configured; authored flow skipped");
            return Ok(report);
        }

        let listing = self
            .fetch(
                cancel,
                "list authored pull requests",
                self.source
                    .list_authored(&self.config.author, self.config.max_results),
            )
            .await?;
        let pull_requests = match listing {
            Ok(pull_requests) => pull_requests,
            Err(error) => {
                tracing::warn!(flow = "authored", "listing failed: {error}");
                report.listing_failed = true;
                return Ok(report);
            }
        };
        report.seen = pull_requests.len();

        for pull_request in &pull_requests {
            let Some(key) = resolve_key(pull_request) else {
                report.skipped += 1;
                continue;
            };
            let watermark = self.store.authored_watermark(&key);

            let comments = self
                .fetch(
                    cancel,
                    "issue comments",
                    self.source
                        .comments_since(&key, watermark.last_issue_comment),
                )
                .await?
                .unwrap_or_else(|error| {
                    tracing::warn!(
                        repo = %key.repository(),
                        number = key.number().get(),
                        "issue comments fetch failed: {error}"
                    );
                    report.lookup_failures += 1;
                    Vec::new()
                });

            let reviews = self
                .fetch(cancel, "pull request reviews", self.source.reviews(&key))
                .await?
                .unwrap_or_else(|error| {
                    tracing::warn!(
                        repo = %key.repository(),
                        number = key.number().get(),
                        "pull request reviews fetch failed: {error}"
                    );
                    report.lookup_failures += 1;
                    Vec::new()
                });

            let decision = decide_authored(
                initialized,
                watermark,
                pull_request,
                &key,
                &comments,
                &reviews,
            );
            for notification in &decision.events {
                self.dispatch(cancel, &key, notification, &mut report)
                    .await?;
            }

            self.store.record_authored(&key, decision.watermark);
        }

        Ok(report)
    }

    /// Runs a data source call under cancellation and the request timeout.
    /// A timeout surfaces as [`GitHubError::Timeout`].
    async fn fetch<T>(
        &self,
        cancel: &CancellationToken,
        operation: &str,
        call: impl Future<Output = Result<T, GitHubError>>,
    ) -> Result<Result<T, GitHubError>, Cancelled> {
        match bounded(cancel, self.config.request_timeout, call).await {
            Ok(outcome) => Ok(outcome),
            Err(Interrupted::TimedOut) => Ok(Err(GitHubError::Timeout {
                operation: operation.to_owned(),
                seconds: self.config.request_timeout.as_secs(),
            })),
            Err(Interrupted::Cancelled) => Err(Cancelled),
        }
    }

    async fn dispatch(
        &self,
        cancel: &CancellationToken,
        key: &PullRequestKey,
        notification: &Notification,
        report: &mut FlowReport,
    ) -> Result<(), Cancelled> {
        report.notified += 1;
        match bounded(cancel, self.config.request_timeout, self.sink.notify(notification)).await {
            Ok(Ok(())) => {
                tracing::debug!(%key, title = %notification.title, "notification sent");
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    repo = %key.repository(),
                    number = key.number().get(),
                    "notification failed: {error}"
                );
                report.notification_failures += 1;
            }
            Err(Interrupted::TimedOut) => {
                tracing::warn!(
                    repo = %key.repository(),
                    number = key.number().get(),
                    "notification timed out"
                );
                report.notification_failures += 1;
            }
            Err(Interrupted::Cancelled) => return Err(Cancelled),
        }
        Ok(())
    }
}

fn resolve_key(pull_request: &PullRequestSummary) -> Option<PullRequestKey> {
    PullRequestKey::resolve(&pull_request.html_url, pull_request.number)
        .inspect_err(|error| {
            tracing::warn!(
                url = %pull_request.html_url,
                "skipping pull request with unresolvable URL: {error}"
            );
        })
        .ok()
}
