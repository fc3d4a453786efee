use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{CodeHost, RemotePull, RepoRef};
use crate::error::{Service, ServiceError};

const USER_AGENT: &str = "pr-reporter";

#[derive(Deserialize)]
struct User {
    login: String,
}

#[derive(Deserialize)]
struct Label {
    name: Option<String>,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    draft: Option<bool>,
    user: Option<User>,
    assignee: Option<User>,
    #[serde(default)]
    labels: Vec<Label>,
}

impl From<PullResponse> for RemotePull {
    fn from(pr: PullResponse) -> Self {
        Self {
            number: pr.number,
            title: pr.title,
            url: pr.html_url,
            draft: pr.draft.unwrap_or(false),
            author: pr.user.map(|u| u.login),
            assignee: pr.assignee.map(|u| u.login),
            labels: pr.labels.into_iter().filter_map(|l| l.name).collect(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// GitHub REST client for open pull request listings.
pub struct GitHubClient {
    http: Client,
    token: String,
    api_url: String,
}

impl GitHubClient {
    pub fn new(token: &str, api_url: &str) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ServiceError::http(Service::GitHub))?;
        Ok(Self {
            http,
            token: token.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Translate a non-success GitHub response into the shared error taxonomy.
async fn status_error(response: Response, repo: &RepoRef) -> ServiceError {
    let status = response.status();
    let rate_limited = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        == Some("0");
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::UNAUTHORIZED => ServiceError::Authentication {
            service: Service::GitHub,
            reason: message,
        },
        StatusCode::NOT_FOUND => ServiceError::NotFound {
            service: Service::GitHub,
            what: "repository",
            target: repo.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => ServiceError::RateLimit {
            service: Service::GitHub,
            target: repo.to_string(),
        },
        StatusCode::FORBIDDEN if rate_limited => ServiceError::RateLimit {
            service: Service::GitHub,
            target: repo.to_string(),
        },
        StatusCode::FORBIDDEN => ServiceError::Permission {
            service: Service::GitHub,
            target: repo.to_string(),
            reason: message,
        },
        _ => ServiceError::Api {
            service: Service::GitHub,
            target: repo.to_string(),
            reason: format!("{status}: {message}"),
        },
    }
}

#[async_trait]
impl CodeHost for GitHubClient {
    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn list_open_pulls(
        &self,
        repo: &RepoRef,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<RemotePull>, ServiceError> {
        let url = format!("{}/repos/{}/{}/pulls", self.api_url, repo.owner, repo.repo);
        debug!(page, "requesting open PRs");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("state", "open".to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ])
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(ServiceError::http(Service::GitHub))?;

        if !response.status().is_success() {
            return Err(status_error(response, repo).await);
        }

        let pulls = response
            .json::<Vec<PullResponse>>()
            .await
            .map_err(ServiceError::http(Service::GitHub))?;
        Ok(pulls.into_iter().map(RemotePull::from).collect())
    }
}
