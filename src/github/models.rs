//! Snapshot models for pull requests, issue comments and reviews.
//!
//! Types prefixed with `Api` are internal deserialisation targets shaped like
//! the GitHub REST responses; they convert into the public snapshot types
//! consumed by the change detector.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Pull request as returned by a search or listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSummary {
    /// Pull request number.
    pub number: u64,
    /// Title of the pull request.
    pub title: String,
    /// Web URL, used to derive the repository.
    pub html_url: String,
    /// Last time anything on the pull request changed.
    pub updated_at: DateTime<Utc>,
}

/// Diff size details fetched for a single pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestDiffStats {
    /// Pull request number.
    pub number: u64,
    /// Title of the pull request.
    pub title: String,
    /// Lines added.
    pub additions: u64,
    /// Lines removed.
    pub deletions: u64,
    /// Files touched.
    pub changed_files: u64,
}

/// Conversation comment on a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    /// Comment identifier.
    pub id: u64,
    /// Markdown body.
    pub body: String,
    /// Last edit (or creation) time.
    pub updated_at: DateTime<Utc>,
    /// Author login.
    pub author: Option<String>,
    /// Web URL of the comment.
    pub html_url: Option<String>,
}

/// Submitted (or pending) pull request review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    /// Review identifier.
    pub id: u64,
    /// Review summary body.
    pub body: String,
    /// Review state such as `APPROVED` or `CHANGES_REQUESTED`.
    pub state: String,
    /// Submission time; absent for pending reviews.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Author login.
    pub author: Option<String>,
    /// Web URL of the review.
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiSearchResults {
    #[serde(default)]
    pub(crate) items: Vec<ApiSearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiSearchItem {
    pub(crate) number: u64,
    #[serde(default)]
    pub(crate) title: Option<String>,
    pub(crate) html_url: String,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiPullRequest {
    pub(crate) number: u64,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) additions: u64,
    #[serde(default)]
    pub(crate) deletions: u64,
    #[serde(default)]
    pub(crate) changed_files: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiIssueComment {
    pub(crate) id: u64,
    #[serde(default)]
    pub(crate) body: Option<String>,
    pub(crate) updated_at: DateTime<Utc>,
    #[serde(default)]
    pub(crate) user: Option<ApiUser>,
    #[serde(default)]
    pub(crate) html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiReview {
    pub(crate) id: u64,
    #[serde(default)]
    pub(crate) body: Option<String>,
    #[serde(default)]
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) user: Option<ApiUser>,
    #[serde(default)]
    pub(crate) html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiUser {
    #[serde(default)]
    pub(crate) login: Option<String>,
}

impl From<ApiSearchItem> for PullRequestSummary {
    fn from(value: ApiSearchItem) -> Self {
        Self {
            number: value.number,
            title: value.title.unwrap_or_default(),
            html_url: value.html_url,
            updated_at: value.updated_at,
        }
    }
}

impl From<ApiPullRequest> for PullRequestDiffStats {
    fn from(value: ApiPullRequest) -> Self {
        Self {
            number: value.number,
            title: value.title.unwrap_or_default(),
            additions: value.additions,
            deletions: value.deletions,
            changed_files: value.changed_files,
        }
    }
}

impl From<ApiIssueComment> for IssueComment {
    fn from(value: ApiIssueComment) -> Self {
        Self {
            id: value.id,
            body: value.body.unwrap_or_default(),
            updated_at: value.updated_at,
            author: value.user.and_then(|user| user.login),
            html_url: value.html_url,
        }
    }
}

impl From<ApiReview> for Review {
    fn from(value: ApiReview) -> Self {
        Self {
            id: value.id,
            body: value.body.unwrap_or_default(),
            state: value.state.unwrap_or_default(),
            submitted_at: value.submitted_at,
            author: value.user.and_then(|user| user.login),
            html_url: value.html_url,
        }
    }
}
