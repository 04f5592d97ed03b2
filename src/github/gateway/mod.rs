//! Data source for review activity.
//!
//! [`ReviewActivitySource`] is the capability set the poll loop consumes. The
//! Octocrab implementation talks to the GitHub REST API; tests substitute
//! mocks or the in-memory fake from `watch::test_support`.

mod activity;
mod error_mapping;

pub use activity::OctocrabActivitySource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::github::error::GitHubError;
use crate::github::locator::PullRequestKey;
use crate::github::models::{IssueComment, PullRequestDiffStats, PullRequestSummary, Review};

/// Upper bound GitHub accepts for `per_page`.
pub const MAX_PAGE_SIZE: u8 = 100;

/// Capability set used to fetch pull request snapshots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewActivitySource: Send + Sync {
    /// Searches for open pull requests matching `query`, most recently
    /// updated first.
    async fn search_assigned(
        &self,
        query: &str,
        limit: u8,
    ) -> Result<Vec<PullRequestSummary>, GitHubError>;

    /// Lists open pull requests authored by `author`, most recently updated
    /// first.
    async fn list_authored(
        &self,
        author: &str,
        limit: u8,
    ) -> Result<Vec<PullRequestSummary>, GitHubError>;

    /// Loads title and diff size for a single pull request.
    async fn pull_request_details(
        &self,
        key: &PullRequestKey,
    ) -> Result<PullRequestDiffStats, GitHubError>;

    /// Lists conversation comments updated at or after `since` (all comments
    /// when `since` is `None`).
    async fn comments_since(
        &self,
        key: &PullRequestKey,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<IssueComment>, GitHubError>;

    /// Lists reviews on the pull request.
    async fn reviews(&self, key: &PullRequestKey) -> Result<Vec<Review>, GitHubError>;

    /// Returns the login of the authenticated user.
    async fn current_user_login(&self) -> Result<String, GitHubError>;
}
