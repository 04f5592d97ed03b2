//! In-memory collaborators for exercising the poll loop without GitHub or a
//! desktop notifier.
//!
//! ```
//! use revwatch::watch::test_support::{InMemoryActivitySource, RecordingSink};
//!
//! let source = InMemoryActivitySource::default();
//! source.set_login("octocat");
//! let sink = RecordingSink::default();
//! assert!(sink.notifications().is_empty());
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::github::{
    GitHubError, IssueComment, PullRequestDiffStats, PullRequestKey, PullRequestSummary,
    ReviewActivitySource, Review,
};
use crate::notify::{Notification, NotificationSink, NotifyError};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct Fixtures {
    assigned: Option<Result<Vec<PullRequestSummary>, GitHubError>>,
    authored: Option<Result<Vec<PullRequestSummary>, GitHubError>>,
    details: HashMap<String, Result<PullRequestDiffStats, GitHubError>>,
    comments: HashMap<String, Result<Vec<IssueComment>, GitHubError>>,
    reviews: HashMap<String, Result<Vec<Review>, GitHubError>>,
    login: Option<String>,
    calls: Vec<String>,
}

/// Scriptable [`ReviewActivitySource`].
///
/// Unscripted listings return empty results and unscripted detail lookups
/// fail with [`GitHubError::Api`]. Every call is recorded as
/// `operation key-or-argument`.
#[derive(Debug, Default)]
pub struct InMemoryActivitySource {
    fixtures: Mutex<Fixtures>,
    stall_searches: AtomicBool,
}

impl InMemoryActivitySource {
    /// Sets the pull requests returned for the assigned search.
    pub fn set_assigned(&self, pull_requests: Vec<PullRequestSummary>) {
        guard(&self.fixtures).assigned = Some(Ok(pull_requests));
    }

    /// Makes the assigned search fail.
    pub fn fail_assigned(&self, error: GitHubError) {
        guard(&self.fixtures).assigned = Some(Err(error));
    }

    /// Sets the pull requests returned for the authored listing.
    pub fn set_authored(&self, pull_requests: Vec<PullRequestSummary>) {
        guard(&self.fixtures).authored = Some(Ok(pull_requests));
    }

    /// Makes the authored listing fail.
    pub fn fail_authored(&self, error: GitHubError) {
        guard(&self.fixtures).authored = Some(Err(error));
    }

    /// Sets the detail lookup result for `key` (`owner/name#number`).
    pub fn set_details(&self, key: &str, details: PullRequestDiffStats) {
        guard(&self.fixtures)
            .details
            .insert(key.to_owned(), Ok(details));
    }

    /// Makes the detail lookup for `key` fail.
    pub fn fail_details(&self, key: &str, error: GitHubError) {
        guard(&self.fixtures)
            .details
            .insert(key.to_owned(), Err(error));
    }

    /// Sets all issue comments on `key`; `comments_since` filters them.
    pub fn set_comments(&self, key: &str, comments: Vec<IssueComment>) {
        guard(&self.fixtures)
            .comments
            .insert(key.to_owned(), Ok(comments));
    }

    /// Makes the comment fetch for `key` fail.
    pub fn fail_comments(&self, key: &str, error: GitHubError) {
        guard(&self.fixtures)
            .comments
            .insert(key.to_owned(), Err(error));
    }

    /// Sets all reviews on `key`.
    pub fn set_reviews(&self, key: &str, reviews: Vec<Review>) {
        guard(&self.fixtures)
            .reviews
            .insert(key.to_owned(), Ok(reviews));
    }

    /// Makes the review fetch for `key` fail.
    pub fn fail_reviews(&self, key: &str, error: GitHubError) {
        guard(&self.fixtures)
            .reviews
            .insert(key.to_owned(), Err(error));
    }

    /// Sets the login returned by `current_user_login`.
    pub fn set_login(&self, login: &str) {
        guard(&self.fixtures).login = Some(login.to_owned());
    }

    /// When enabled, both searches never complete.
    pub fn stall_searches(&self, stall: bool) {
        self.stall_searches.store(stall, Ordering::SeqCst);
    }

    /// Calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        guard(&self.fixtures).calls.clone()
    }

    fn record_call(&self, call: String) {
        guard(&self.fixtures).calls.push(call);
    }

    async fn maybe_stall(&self) {
        if self.stall_searches.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl ReviewActivitySource for InMemoryActivitySource {
    async fn search_assigned(
        &self,
        query: &str,
        _limit: u8,
    ) -> Result<Vec<PullRequestSummary>, GitHubError> {
        self.record_call(format!("search_assigned {query}"));
        self.maybe_stall().await;
        guard(&self.fixtures)
            .assigned
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_authored(
        &self,
        author: &str,
        _limit: u8,
    ) -> Result<Vec<PullRequestSummary>, GitHubError> {
        self.record_call(format!("list_authored {author}"));
        self.maybe_stall().await;
        guard(&self.fixtures)
            .authored
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn pull_request_details(
        &self,
        key: &PullRequestKey,
    ) -> Result<PullRequestDiffStats, GitHubError> {
        let storage_key = key.to_string();
        self.record_call(format!("pull_request_details {storage_key}"));
        guard(&self.fixtures)
            .details
            .get(&storage_key)
            .cloned()
            .unwrap_or_else(|| {
                Err(GitHubError::Api {
                    message: format!("no details scripted for {storage_key}"),
                })
            })
    }

    async fn comments_since(
        &self,
        key: &PullRequestKey,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<IssueComment>, GitHubError> {
        let storage_key = key.to_string();
        self.record_call(format!("comments_since {storage_key}"));
        let scripted = guard(&self.fixtures)
            .comments
            .get(&storage_key)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))?;
        Ok(scripted
            .into_iter()
            .filter(|comment| since.is_none_or(|cutoff| comment.updated_at >= cutoff))
            .collect())
    }

    async fn reviews(&self, key: &PullRequestKey) -> Result<Vec<Review>, GitHubError> {
        let storage_key = key.to_string();
        self.record_call(format!("reviews {storage_key}"));
        guard(&self.fixtures)
            .reviews
            .get(&storage_key)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn current_user_login(&self) -> Result<String, GitHubError> {
        self.record_call("current_user_login".to_owned());
        guard(&self.fixtures)
            .login
            .clone()
            .ok_or(GitHubError::MissingToken)
    }
}

/// [`NotificationSink`] that keeps every notification it is handed.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingSink {
    /// When enabled, every delivery is recorded and then reported as failed.
    pub fn fail_deliveries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Notifications received so far, in order.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        guard(&self.notifications).clone()
    }

    /// Bodies of the notifications received so far.
    #[must_use]
    pub fn bodies(&self) -> Vec<String> {
        guard(&self.notifications)
            .iter()
            .map(|notification| notification.body.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        guard(&self.notifications).push(notification.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::CommandFailed {
                program: "recording-sink".to_owned(),
                status: "exit status: 1".to_owned(),
                stderr: "delivery disabled".to_owned(),
            });
        }
        Ok(())
    }
}
