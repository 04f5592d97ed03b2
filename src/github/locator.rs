//! Identity wrappers for tracked pull requests and API base resolution.

use std::fmt;

use url::Url;

use super::error::GitHubError;

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    fn new(value: &str, path: &str) -> Result<Self, GitHubError> {
        if value.is_empty() {
            return Err(GitHubError::MissingPathSegments {
                path: path.to_owned(),
            });
        }
        Ok(Self(value.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName(String);

impl RepositoryName {
    fn new(value: &str, path: &str) -> Result<Self, GitHubError> {
        if value.is_empty() {
            return Err(GitHubError::MissingPathSegments {
                path: path.to_owned(),
            });
        }
        Ok(Self(value.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository identity rendered as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositorySlug {
    owner: RepositoryOwner,
    name: RepositoryName,
}

impl RepositorySlug {
    /// Derives the repository from a pull request web URL such as
    /// `https://github.com/<owner>/<repo>/pull/<number>`.
    ///
    /// Only the first two path segments are used; the path must however have
    /// at least four segments so that bare repository or profile URLs are
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::InvalidUrl`] when the URL cannot be parsed and
    /// [`GitHubError::MissingPathSegments`] when the path is too short.
    pub fn from_html_url(input: &str) -> Result<Self, GitHubError> {
        let parsed =
            Url::parse(input).map_err(|error| GitHubError::InvalidUrl(error.to_string()))?;
        let path = parsed.path().trim_matches('/');
        let segments: Vec<&str> = path.split('/').collect();

        match segments.as_slice() {
            [owner, name, _, _, ..] => Ok(Self {
                owner: RepositoryOwner::new(owner, path)?,
                name: RepositoryName::new(name, path)?,
            }),
            _ => Err(GitHubError::MissingPathSegments {
                path: parsed.path().to_owned(),
            }),
        }
    }
}

impl fmt::Display for RepositorySlug {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.owner.as_str(), self.name.as_str())
    }
}

/// Pull request number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    /// Validates that the number is positive.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::InvalidPullRequestNumber`] for zero.
    pub const fn new(value: u64) -> Result<Self, GitHubError> {
        if value == 0 {
            return Err(GitHubError::InvalidPullRequestNumber);
        }
        Ok(Self(value))
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Tracked entity key: a pull request identified by repository and number.
///
/// The [`Display`](fmt::Display) form `owner/name#number` is the key used in
/// the persisted watermark maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PullRequestKey {
    repository: RepositorySlug,
    number: PullRequestNumber,
}

impl PullRequestKey {
    /// Resolves the key for a pull request from its web URL and number.
    ///
    /// # Errors
    ///
    /// Returns a [`GitHubError`] when the URL cannot be resolved to a
    /// repository or the number is zero.
    pub fn resolve(html_url: &str, number: u64) -> Result<Self, GitHubError> {
        Ok(Self {
            repository: RepositorySlug::from_html_url(html_url)?,
            number: PullRequestNumber::new(number)?,
        })
    }

    /// Repository the pull request belongs to.
    #[must_use]
    pub const fn repository(&self) -> &RepositorySlug {
        &self.repository
    }

    /// Pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    pub(crate) fn pull_request_path(&self) -> String {
        format!("/repos/{}/pulls/{}", self.repository, self.number.get())
    }

    pub(crate) fn issue_comments_path(&self) -> String {
        format!(
            "/repos/{}/issues/{}/comments",
            self.repository,
            self.number.get()
        )
    }

    pub(crate) fn reviews_path(&self) -> String {
        format!(
            "/repos/{}/pulls/{}/reviews",
            self.repository,
            self.number.get()
        )
    }
}

impl fmt::Display for PullRequestKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}#{}", self.repository, self.number.get())
    }
}

/// Personal access token wrapper enforcing presence.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::MissingToken`] when the supplied string is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, GitHubError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(GitHubError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

impl fmt::Debug for PersonalAccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("PersonalAccessToken(***)")
    }
}

/// Resolves the REST API base URL for a GitHub host.
///
/// Accepts either a bare host (`github.com`, `ghe.example.com`) or a URL with
/// scheme (`http://127.0.0.1:8080`). `github.com` maps to the public API;
/// any other host is treated as GitHub Enterprise and served under `/api/v3`.
///
/// # Errors
///
/// Returns [`GitHubError::InvalidUrl`] when the host cannot form a URL.
pub fn resolve_api_base(host: &str) -> Result<Url, GitHubError> {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        let parsed =
            Url::parse(trimmed).map_err(|error| GitHubError::InvalidUrl(error.to_string()))?;
        let host_str = parsed
            .host_str()
            .ok_or_else(|| GitHubError::InvalidUrl("URL must include a host".to_owned()))?;
        return derive_api_base_from_host(parsed.scheme(), host_str, parsed.port());
    }

    derive_api_base_from_host("https", trimmed, None)
}

fn derive_api_base_from_host(
    scheme: &str,
    host: &str,
    port: Option<u16>,
) -> Result<Url, GitHubError> {
    if host.is_empty() {
        return Err(GitHubError::InvalidUrl("host must not be empty".to_owned()));
    }

    if host.eq_ignore_ascii_case("github.com") || host.eq_ignore_ascii_case("api.github.com") {
        return Url::parse("https://api.github.com")
            .map_err(|error| GitHubError::InvalidUrl(error.to_string()));
    }

    let authority = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_owned()
    };
    let mut api_url = Url::parse(&format!("{scheme}://{authority}"))
        .map_err(|error| GitHubError::InvalidUrl(error.to_string()))?;

    api_url
        .set_port(port)
        .map_err(|()| GitHubError::InvalidUrl("invalid port".to_owned()))?;
    api_url.set_path("api/v3");
    Ok(api_url)
}
