use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{Issue, TicketTracker};
use crate::config::{JiraAuth, JiraConfig};
use crate::error::{Service, ServiceError};

#[derive(Deserialize)]
struct IssueResponse {
    fields: Option<Fields>,
}

#[derive(Deserialize)]
struct Fields {
    status: Option<Status>,
    summary: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Deserialize)]
struct Status {
    name: Option<String>,
}

enum Credentials {
    Basic { username: String, token: String },
    Bearer(String),
}

/// Jira REST client fetching one issue at a time.
pub struct JiraClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
}

impl JiraClient {
    /// Build a client from tracker settings; `None` when they are incomplete.
    pub fn from_config(config: &JiraConfig) -> Result<Option<Self>, ServiceError> {
        if !config.is_configured() {
            return Ok(None);
        }
        let (Some(base_url), Some(token)) = (config.base_url(), config.token.as_deref()) else {
            return Ok(None);
        };

        let credentials = match config.auth {
            JiraAuth::Bearer => Credentials::Bearer(token.to_string()),
            JiraAuth::Basic => Credentials::Basic {
                username: config.username.clone().unwrap_or_default(),
                token: token.to_string(),
            },
        };

        let http = Client::builder()
            .user_agent("pr-reporter")
            .build()
            .map_err(ServiceError::http(Service::Jira))?;

        Ok(Some(Self {
            http,
            base_url: base_url.to_string(),
            credentials,
        }))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Basic { username, token } => request.basic_auth(username, Some(token)),
            Credentials::Bearer(token) => request.bearer_auth(token),
        }
    }
}

#[async_trait]
impl TicketTracker for JiraClient {
    #[instrument(skip(self))]
    async fn fetch_issue(&self, id: &str) -> Result<Option<Issue>, ServiceError> {
        let url = format!("{}/rest/api/2/issue/{}", self.base_url, id);
        debug!("requesting ticket");

        let response = self
            .authorize(self.http.get(&url))
            .query(&[("fields", "status,summary,labels")])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(ServiceError::http(Service::Jira))?;

        let status = response.status();
        match status {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(ServiceError::NotFound {
                    service: Service::Jira,
                    what: "ticket",
                    target: id.to_string(),
                })
            }
            StatusCode::UNAUTHORIZED => {
                return Err(ServiceError::Authentication {
                    service: Service::Jira,
                    reason: status.to_string(),
                })
            }
            StatusCode::FORBIDDEN => {
                return Err(ServiceError::Permission {
                    service: Service::Jira,
                    target: id.to_string(),
                    reason: status.to_string(),
                })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ServiceError::RateLimit {
                    service: Service::Jira,
                    target: id.to_string(),
                })
            }
            _ => {
                return Err(ServiceError::Api {
                    service: Service::Jira,
                    target: id.to_string(),
                    reason: status.to_string(),
                })
            }
        }

        let body = response
            .json::<IssueResponse>()
            .await
            .map_err(ServiceError::http(Service::Jira))?;

        let Some(fields) = body.fields else {
            debug!("ticket has no fields");
            return Ok(None);
        };
        Ok(Some(Issue {
            status: fields.status.and_then(|s| s.name),
            summary: fields.summary,
            labels: fields.labels,
        }))
    }
}
