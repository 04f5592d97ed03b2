//! GitHub data source for review activity.
//!
//! This module wraps Octocrab behind the [`ReviewActivitySource`] trait,
//! resolves tracked pull request keys from web URLs, and maps transport
//! failures into [`GitHubError`] variants the poll loop can log without
//! exposing Octocrab internals.

pub mod error;
pub mod gateway;
pub mod locator;
pub mod models;

pub use error::GitHubError;
pub use gateway::{MAX_PAGE_SIZE, OctocrabActivitySource, ReviewActivitySource};
pub use locator::{
    PersonalAccessToken, PullRequestKey, PullRequestNumber, RepositoryName, RepositoryOwner,
    RepositorySlug, resolve_api_base,
};
pub use models::{IssueComment, PullRequestDiffStats, PullRequestSummary, Review};

#[cfg(test)]
pub use gateway::MockReviewActivitySource;
