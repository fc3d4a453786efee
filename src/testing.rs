//! In-memory stand-ins for the three remote services, with call tracking and
//! error injection.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::chat::{AuthIdentity, Channel, ChannelKind, ChatService, ChatUser};
use crate::error::{Service, ServiceError};
use crate::pr::{CodeHost, PullRequest, RemotePull, RepoRef};
use crate::ticket::{Issue, TicketTracker};

pub fn remote_pull(number: u64, title: &str, author: Option<&str>, labels: &[&str]) -> RemotePull {
    RemotePull {
        number,
        title: title.to_string(),
        url: format!("https://github.com/acme/widgets/pull/{number}"),
        draft: false,
        author: author.map(str::to_string),
        assignee: None,
        labels: labels.iter().map(|l| l.to_string()).collect(),
    }
}

pub fn pull_request(number: u64, title: &str, ticket: Option<&str>) -> PullRequest {
    PullRequest {
        number,
        title: title.to_string(),
        url: format!("https://github.com/acme/widgets/pull/{number}"),
        author: "alice".to_string(),
        assignee: None,
        draft: false,
        labels: vec![],
        ticket: ticket.map(str::to_string),
    }
}

/// Serves a fixed PR listing, split into pages on request.
pub struct FakeCodeHost {
    pulls: Vec<RemotePull>,
    error: Mutex<Option<ServiceError>>,
    pages: Mutex<Vec<u32>>,
}

impl FakeCodeHost {
    pub fn new(pulls: Vec<RemotePull>) -> Self {
        Self {
            pulls,
            error: Mutex::new(None),
            pages: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ServiceError) -> Self {
        let host = Self::new(vec![]);
        *host.error.lock().unwrap() = Some(error);
        host
    }

    pub fn pages_requested(&self) -> Vec<u32> {
        self.pages.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeHost for FakeCodeHost {
    async fn list_open_pulls(
        &self,
        _repo: &RepoRef,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<RemotePull>, ServiceError> {
        self.pages.lock().unwrap().push(page);
        if let Some(err) = self.error.lock().unwrap().take() {
            return Err(err);
        }
        let per_page = per_page as usize;
        let start = (page.saturating_sub(1) as usize) * per_page;
        Ok(self
            .pulls
            .iter()
            .skip(start)
            .take(per_page)
            .cloned()
            .collect())
    }
}

/// Tracker with canned issues; unknown identifiers are "not found".
#[derive(Default)]
pub struct FakeTracker {
    issues: HashMap<String, Option<Issue>>,
    errors: Mutex<HashMap<String, ServiceError>>,
    requested: Mutex<Vec<String>>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issue(mut self, id: &str, issue: Issue) -> Self {
        self.issues.insert(id.to_string(), Some(issue));
        self
    }

    /// The issue exists but comes back without fields.
    pub fn with_empty(mut self, id: &str) -> Self {
        self.issues.insert(id.to_string(), None);
        self
    }

    pub fn with_error(self, id: &str, error: ServiceError) -> Self {
        self.errors.lock().unwrap().insert(id.to_string(), error);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl TicketTracker for FakeTracker {
    async fn fetch_issue(&self, id: &str) -> Result<Option<Issue>, ServiceError> {
        self.requested.lock().unwrap().push(id.to_string());
        if let Some(err) = self.errors.lock().unwrap().remove(id) {
            return Err(err);
        }
        self.issues.get(id).cloned().ok_or_else(|| ServiceError::NotFound {
            service: Service::Jira,
            what: "ticket",
            target: id.to_string(),
        })
    }
}

/// Chat workspace with configurable channels and members.
#[derive(Default)]
pub struct FakeChat {
    channels: Vec<(ChannelKind, Channel)>,
    members: HashMap<String, Vec<String>>,
    users: HashMap<String, ChatUser>,
    auth_fails: bool,
    listing_errors: Mutex<HashMap<ChannelKind, ServiceError>>,
    members_error: Mutex<Option<ServiceError>>,
    profile_error: Mutex<Option<ServiceError>>,
    post_error: Mutex<Option<ServiceError>>,
    calls: Mutex<Vec<String>>,
    posted: Mutex<Vec<(String, String)>>,
}

impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, kind: ChannelKind, id: &str, name: &str) -> Self {
        self.channels.push((
            kind,
            Channel {
                id: id.to_string(),
                name: name.to_string(),
            },
        ));
        self
    }

    pub fn with_member(mut self, channel_id: &str, id: &str, name: &str, is_bot: bool, deleted: bool) -> Self {
        self.members
            .entry(channel_id.to_string())
            .or_default()
            .push(id.to_string());
        self.users.insert(
            id.to_string(),
            ChatUser {
                id: id.to_string(),
                name: name.to_string(),
                is_bot,
                deleted,
            },
        );
        self
    }

    pub fn failing_auth(mut self) -> Self {
        self.auth_fails = true;
        self
    }

    pub fn failing_listing(self, kind: ChannelKind, error: ServiceError) -> Self {
        self.listing_errors.lock().unwrap().insert(kind, error);
        self
    }

    /// The next profile lookup fails with `error`.
    pub fn failing_profile(self, error: ServiceError) -> Self {
        *self.profile_error.lock().unwrap() = Some(error);
        self
    }

    pub fn failing_members(self, error: ServiceError) -> Self {
        *self.members_error.lock().unwrap() = Some(error);
        self
    }

    pub fn failing_post(self, error: ServiceError) -> Self {
        *self.post_error.lock().unwrap() = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn posted(&self) -> Vec<(String, String)> {
        self.posted.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl ChatService for FakeChat {
    async fn auth_test(&self) -> Result<AuthIdentity, ServiceError> {
        self.record("auth.test");
        if self.auth_fails {
            return Err(ServiceError::Authentication {
                service: Service::Slack,
                reason: "invalid_auth".to_string(),
            });
        }
        Ok(AuthIdentity {
            user: "reporter".to_string(),
            team: "Acme".to_string(),
        })
    }

    async fn list_channels(&self, kind: ChannelKind) -> Result<Vec<Channel>, ServiceError> {
        self.record(&format!("conversations.list:{kind}"));
        if let Some(err) = self.listing_errors.lock().unwrap().remove(&kind) {
            return Err(err);
        }
        Ok(self
            .channels
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn channel_members(&self, channel_id: &str) -> Result<Vec<String>, ServiceError> {
        self.record("conversations.members");
        if let Some(err) = self.members_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.members.get(channel_id).cloned().unwrap_or_default())
    }

    async fn user_info(&self, user_id: &str) -> Result<ChatUser, ServiceError> {
        self.record("users.info");
        if let Some(err) = self.profile_error.lock().unwrap().take() {
            return Err(err);
        }
        self.users.get(user_id).cloned().ok_or_else(|| ServiceError::NotFound {
            service: Service::Slack,
            what: "user",
            target: user_id.to_string(),
        })
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ServiceError> {
        self.record("chat.postMessage");
        if let Some(err) = self.post_error.lock().unwrap().take() {
            return Err(err);
        }
        self.posted
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }
}
