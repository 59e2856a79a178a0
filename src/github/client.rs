use async_trait::async_trait;
use octocrab::Octocrab;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("remote '{0}' is not a recognised GitHub repository URL")]
    BadRepoUrl(String),
    #[error("failed to build GitHub client")]
    Client(#[source] octocrab::Error),
    #[error("review request submission failed")]
    Submission(#[source] octocrab::Error),
}

/// Host-side review request (pull request) creation, called once per
/// review-flow run after a successful push.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewApi: Send + Sync {
    /// Open a review request proposing `head` onto `base`; returns the
    /// request URL.
    async fn create_request(
        &self,
        repo_url: &str,
        base: &str,
        head: &str,
        title: &str,
    ) -> Result<String, ApiError>;
}

pub struct GithubReviewApi {
    octocrab: Octocrab,
}

impl GithubReviewApi {
    /// Client authenticated from `GITHUB_TOKEN` when the variable is set.
    pub fn new() -> Result<Self, ApiError> {
        let builder = Octocrab::builder();
        let builder = match std::env::var("GITHUB_TOKEN") {
            Ok(token) => builder.personal_token(token),
            Err(_) => builder,
        };

        Ok(Self {
            octocrab: builder.build().map_err(ApiError::Client)?,
        })
    }
}

#[async_trait]
impl ReviewApi for GithubReviewApi {
    async fn create_request(
        &self,
        repo_url: &str,
        base: &str,
        head: &str,
        title: &str,
    ) -> Result<String, ApiError> {
        let (owner, repo) =
            parse_github_url(repo_url).ok_or_else(|| ApiError::BadRepoUrl(repo_url.to_string()))?;

        let pr = self
            .octocrab
            .pulls(&owner, &repo)
            .create(title, head, base)
            .send()
            .await
            .map_err(ApiError::Submission)?;

        let url = pr
            .html_url
            .map(|u| u.to_string())
            .unwrap_or_else(|| format!("https://github.com/{owner}/{repo}/pull/{}", pr.number));

        info!(%url, head, base, "opened review request");
        Ok(url)
    }
}

/// Split a GitHub remote URL into (owner, repo). Handles the SSH form
/// `git@github.com:owner/repo.git` and the HTTPS form.
fn parse_github_url(url: &str) -> Option<(String, String)> {
    let rest = url
        .strip_prefix("git@github.com:")
        .or_else(|| url.strip_prefix("ssh://git@github.com/"))
        .or_else(|| url.strip_prefix("https://github.com/"))?;

    let rest = rest.strip_suffix(".git").unwrap_or(rest);

    let mut parts = rest.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Some((owner.to_string(), repo.to_string()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ssh_urls() {
        assert_eq!(
            parse_github_url("git@github.com:unframework/scratchpad-repo.git"),
            Some(("unframework".to_string(), "scratchpad-repo".to_string()))
        );
    }

    #[test]
    fn parses_https_urls_with_and_without_suffix() {
        assert_eq!(
            parse_github_url("https://github.com/owner/repo.git"),
            Some(("owner".to_string(), "repo".to_string()))
        );
        assert_eq!(
            parse_github_url("https://github.com/owner/repo"),
            Some(("owner".to_string(), "repo".to_string()))
        );
    }

    #[test]
    fn rejects_urls_that_are_not_github_repositories() {
        assert_eq!(parse_github_url("https://gitlab.com/owner/repo"), None);
        assert_eq!(parse_github_url("git@github.com:just-an-owner"), None);
        assert_eq!(parse_github_url("https://github.com/a/b/c"), None);
        assert_eq!(parse_github_url("/local/path/repo"), None);
    }
}
