use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{AuthIdentity, Channel, ChannelKind, ChatService, ChatUser};
use crate::error::{Service, ServiceError};

const PAGE_LIMIT: &str = "1000";

#[derive(Deserialize)]
struct Envelope {
    ok: bool,
    error: Option<String>,
    /// Scope Slack wanted when it answers `missing_scope`.
    needed: Option<String>,
}

#[derive(Deserialize, Default)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Deserialize)]
struct AuthTestResponse {
    #[serde(default)]
    user: String,
    #[serde(default)]
    team: String,
}

#[derive(Deserialize)]
struct ConversationsPage {
    #[serde(default)]
    channels: Vec<ConversationEntry>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Deserialize)]
struct ConversationEntry {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct MembersPage {
    #[serde(default)]
    members: Vec<String>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    user: UserEntry,
}

#[derive(Deserialize)]
struct UserEntry {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    deleted: bool,
}

/// Map a Slack `error` code onto the shared taxonomy.
fn api_error(code: &str, needed: Option<String>, target: &str) -> ServiceError {
    match code {
        "invalid_auth" | "not_authed" | "token_revoked" | "token_expired" | "account_inactive" => {
            ServiceError::Authentication {
                service: Service::Slack,
                reason: code.to_string(),
            }
        }
        "missing_scope" | "not_allowed_token_type" | "no_permission" | "not_in_channel" => {
            ServiceError::Permission {
                service: Service::Slack,
                target: target.to_string(),
                reason: match needed {
                    Some(scope) => format!("{code} (needs {scope})"),
                    None => code.to_string(),
                },
            }
        }
        "channel_not_found" => ServiceError::NotFound {
            service: Service::Slack,
            what: "channel",
            target: target.to_string(),
        },
        "user_not_found" | "users_not_found" => ServiceError::NotFound {
            service: Service::Slack,
            what: "user",
            target: target.to_string(),
        },
        "ratelimited" => ServiceError::RateLimit {
            service: Service::Slack,
            target: target.to_string(),
        },
        other => ServiceError::Api {
            service: Service::Slack,
            target: target.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Slack Web API client authenticated with a bot token.
pub struct SlackClient {
    http: Client,
    token: String,
    api_url: String,
}

impl SlackClient {
    pub fn new(token: &str, api_url: &str) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .user_agent("pr-reporter")
            .build()
            .map_err(ServiceError::http(Service::Slack))?;
        Ok(Self {
            http,
            token: token.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_url, method)
    }

    /// Unwrap Slack's `{"ok": ..}` envelope, then decode the payload.
    async fn decode<T: DeserializeOwned>(response: Response, target: &str) -> Result<T, ServiceError> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::RateLimit {
                service: Service::Slack,
                target: target.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ServiceError::Api {
                service: Service::Slack,
                target: target.to_string(),
                reason: status.to_string(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(ServiceError::http(Service::Slack))?;
        let envelope = Envelope::deserialize(&body).map_err(|e| ServiceError::Api {
            service: Service::Slack,
            target: target.to_string(),
            reason: e.to_string(),
        })?;
        if !envelope.ok {
            let code = envelope.error.unwrap_or_else(|| "unknown_error".to_string());
            return Err(api_error(&code, envelope.needed, target));
        }

        T::deserialize(body).map_err(|e| ServiceError::Api {
            service: Service::Slack,
            target: target.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, &str)],
        target: &str,
    ) -> Result<T, ServiceError> {
        debug!(method, "calling Slack");
        let response = self
            .http
            .get(self.url(method))
            .query(query)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(ServiceError::http(Service::Slack))?;
        Self::decode(response, target).await
    }
}

#[async_trait]
impl ChatService for SlackClient {
    async fn auth_test(&self) -> Result<AuthIdentity, ServiceError> {
        let auth: AuthTestResponse = self.get("auth.test", &[], "auth.test").await?;
        Ok(AuthIdentity {
            user: auth.user,
            team: auth.team,
        })
    }

    #[instrument(skip(self))]
    async fn list_channels(&self, kind: ChannelKind) -> Result<Vec<Channel>, ServiceError> {
        let mut channels = Vec::new();
        let mut cursor = String::new();
        loop {
            let page: ConversationsPage = {
                let mut query = vec![
                    ("types", kind.as_api_type()),
                    ("limit", PAGE_LIMIT),
                    ("exclude_archived", "true"),
                ];
                if !cursor.is_empty() {
                    query.push(("cursor", cursor.as_str()));
                }
                self.get("conversations.list", &query, "conversations.list")
                    .await?
            };
            channels.extend(page.channels.into_iter().map(|c| Channel {
                id: c.id,
                name: c.name,
            }));

            cursor = page.response_metadata.next_cursor;
            if cursor.is_empty() {
                break;
            }
        }
        Ok(channels)
    }

    #[instrument(skip(self))]
    async fn channel_members(&self, channel_id: &str) -> Result<Vec<String>, ServiceError> {
        let mut members = Vec::new();
        let mut cursor = String::new();
        loop {
            let page: MembersPage = {
                let mut query = vec![("channel", channel_id), ("limit", PAGE_LIMIT)];
                if !cursor.is_empty() {
                    query.push(("cursor", cursor.as_str()));
                }
                self.get("conversations.members", &query, channel_id).await?
            };
            members.extend(page.members);

            cursor = page.response_metadata.next_cursor;
            if cursor.is_empty() {
                break;
            }
        }
        Ok(members)
    }

    async fn user_info(&self, user_id: &str) -> Result<ChatUser, ServiceError> {
        let info: UserInfoResponse = self.get("users.info", &[("user", user_id)], user_id).await?;
        Ok(ChatUser {
            id: info.user.id,
            name: info.user.name,
            is_bot: info.user.is_bot,
            deleted: info.user.deleted,
        })
    }

    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ServiceError> {
        let response = self
            .http
            .post(self.url("chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&json!({ "channel": channel, "text": text }))
            .send()
            .await
            .map_err(ServiceError::http(Service::Slack))?;
        let _: Value = Self::decode(response, channel).await?;
        Ok(())
    }
}
