pub mod slack;

pub use slack::SlackClient;

use async_trait::async_trait;
use std::fmt;

use crate::error::ServiceError;

/// Identity behind the chat token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub user: String,
    pub team: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Public,
    Private,
}

impl ChannelKind {
    pub fn as_api_type(self) -> &'static str {
        match self {
            ChannelKind::Public => "public_channel",
            ChannelKind::Private => "private_channel",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_type())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

/// A chat user profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: String,
    pub name: String,
    pub is_bot: bool,
    pub deleted: bool,
}

/// The chat operations the reporter needs.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Verify the token.
    async fn auth_test(&self) -> Result<AuthIdentity, ServiceError>;

    /// All channels of one kind visible to the token.
    async fn list_channels(&self, kind: ChannelKind) -> Result<Vec<Channel>, ServiceError>;

    /// Member user IDs of a channel.
    async fn channel_members(&self, channel_id: &str) -> Result<Vec<String>, ServiceError>;

    async fn user_info(&self, user_id: &str) -> Result<ChatUser, ServiceError>;

    /// Post a plain-text message (Slack mrkdwn) to a channel name or ID.
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ServiceError>;
}
