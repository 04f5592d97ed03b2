//! Octocrab implementation of [`ReviewActivitySource`].

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use http::Uri;
use octocrab::{Octocrab, Page};
use url::Url;

use crate::github::error::GitHubError;
use crate::github::locator::{PersonalAccessToken, PullRequestKey};
use crate::github::models::{
    ApiIssueComment, ApiPullRequest, ApiReview, ApiSearchResults, ApiUser, IssueComment,
    PullRequestDiffStats, PullRequestSummary, Review,
};

use super::error_mapping::map_octocrab_error;
use super::{MAX_PAGE_SIZE, ReviewActivitySource};

const SEARCH_PATH: &str = "/search/issues";
const PAGE_SIZE: &str = "100";

/// Octocrab-backed data source.
pub struct OctocrabActivitySource {
    client: Octocrab,
}

impl OctocrabActivitySource {
    /// Creates a data source from an Octocrab client.
    #[must_use]
    pub const fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Builds an authenticated client against `api_base`.
    ///
    /// # Errors
    ///
    /// Returns `GitHubError::InvalidUrl` when the base URI cannot be parsed or
    /// `GitHubError::Api` when Octocrab fails to construct a client.
    pub fn for_token(token: &PersonalAccessToken, api_base: &Url) -> Result<Self, GitHubError> {
        let base_uri = api_base
            .as_str()
            .parse::<Uri>()
            .map_err(|error| GitHubError::InvalidUrl(error.to_string()))?;

        let client = Octocrab::builder()
            .personal_token(token.as_ref())
            .base_uri(base_uri)
            .map_err(|error| GitHubError::Api {
                message: format!("configure client base URI: {error}"),
            })?
            .build()
            .map_err(|error| map_octocrab_error("build client", &error))?;
        Ok(Self::new(client))
    }

    async fn search(
        &self,
        operation: &str,
        query: &str,
        limit: u8,
    ) -> Result<Vec<PullRequestSummary>, GitHubError> {
        let per_page = limit.clamp(1, MAX_PAGE_SIZE).to_string();
        let params = [
            ("q", query),
            ("sort", "updated"),
            ("order", "desc"),
            ("per_page", per_page.as_str()),
        ];

        self.client
            .get::<ApiSearchResults, _, _>(SEARCH_PATH, Some(&params))
            .await
            .map(|results| results.items.into_iter().map(Into::into).collect())
            .map_err(|error| map_octocrab_error(operation, &error))
    }
}

/// Ensures the search only matches pull requests.
fn pull_request_query(query: &str) -> String {
    let trimmed = query.trim();
    if trimmed.split_whitespace().any(|term| term == "is:pr") {
        trimmed.to_owned()
    } else {
        format!("{trimmed} is:pr")
    }
}

fn authored_query(author: &str) -> String {
    format!("is:open is:pr archived:false author:{author}")
}

#[async_trait]
impl ReviewActivitySource for OctocrabActivitySource {
    async fn search_assigned(
        &self,
        query: &str,
        limit: u8,
    ) -> Result<Vec<PullRequestSummary>, GitHubError> {
        self.search("search assigned pull requests", &pull_request_query(query), limit)
            .await
    }

    async fn list_authored(
        &self,
        author: &str,
        limit: u8,
    ) -> Result<Vec<PullRequestSummary>, GitHubError> {
        self.search("list authored pull requests", &authored_query(author), limit)
            .await
    }

    async fn pull_request_details(
        &self,
        key: &PullRequestKey,
    ) -> Result<PullRequestDiffStats, GitHubError> {
        self.client
            .get::<ApiPullRequest, _, _>(key.pull_request_path(), None::<&()>)
            .await
            .map(ApiPullRequest::into)
            .map_err(|error| map_octocrab_error("pull request details", &error))
    }

    async fn comments_since(
        &self,
        key: &PullRequestKey,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<IssueComment>, GitHubError> {
        let since_param = since.map(|time| time.to_rfc3339_opts(SecondsFormat::Secs, true));
        let mut params = vec![("per_page", PAGE_SIZE)];
        if let Some(value) = since_param.as_deref() {
            params.push(("since", value));
        }

        let page = self
            .client
            .get::<Page<ApiIssueComment>, _, _>(key.issue_comments_path(), Some(&params))
            .await
            .map_err(|error| map_octocrab_error("issue comments", &error))?;

        self.client
            .all_pages(page)
            .await
            .map(|comments| comments.into_iter().map(ApiIssueComment::into).collect())
            .map_err(|error| map_octocrab_error("issue comments", &error))
    }

    async fn reviews(&self, key: &PullRequestKey) -> Result<Vec<Review>, GitHubError> {
        let params = [("per_page", PAGE_SIZE)];
        let page = self
            .client
            .get::<Page<ApiReview>, _, _>(key.reviews_path(), Some(&params))
            .await
            .map_err(|error| map_octocrab_error("pull request reviews", &error))?;

        self.client
            .all_pages(page)
            .await
            .map(|reviews| reviews.into_iter().map(ApiReview::into).collect())
            .map_err(|error| map_octocrab_error("pull request reviews", &error))
    }

    async fn current_user_login(&self) -> Result<String, GitHubError> {
        let user = self
            .client
            .get::<ApiUser, _, _>("/user", None::<&()>)
            .await
            .map_err(|error| map_octocrab_error("current user", &error))?;

        user.login
            .filter(|login| !login.trim().is_empty())
            .ok_or_else(|| GitHubError::Api {
                message: "current user: GitHub returned an empty login".to_owned(),
            })
    }
}
