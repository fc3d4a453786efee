use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::config::MembershipSource;

/// How an assignee is written in the chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mention {
    /// A known chat user, rendered as a real mention.
    User(String),
    /// No chat ID known; rendered as plain `@name`.
    Name(String),
}

impl fmt::Display for Mention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mention::User(id) => write!(f, "<@{id}>"),
            Mention::Name(name) => write!(f, "@{name}"),
        }
    }
}

/// Chat <-> code-host identity mapping, built once per run.
///
/// Explicit pairs are literal and case-sensitive in both directions.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    chat_to_host: BTreeMap<String, String>,
    host_to_chat: HashMap<String, String>,
    chat_ids: HashMap<String, String>,
}

impl IdentityMap {
    /// Build from explicit chat username -> code-host login pairs.
    pub fn new(pairs: &BTreeMap<String, String>) -> Self {
        let host_to_chat = pairs
            .iter()
            .map(|(chat, host)| (host.clone(), chat.clone()))
            .collect();
        Self {
            chat_to_host: pairs.clone(),
            host_to_chat,
            chat_ids: HashMap::new(),
        }
    }

    /// Code-host login for a chat username: the explicit pair, else the same name.
    pub fn host_login<'a>(&'a self, chat_name: &'a str) -> &'a str {
        self.chat_to_host
            .get(chat_name)
            .map(String::as_str)
            .unwrap_or(chat_name)
    }

    pub fn is_mapped(&self, chat_name: &str) -> bool {
        self.chat_to_host.contains_key(chat_name)
    }

    /// Remember the chat ID of a channel member for mentions.
    pub fn record_chat_user(&mut self, name: &str, id: &str) {
        self.chat_ids.insert(name.to_string(), id.to_string());
    }

    /// Treat the chat side of every explicit pair as a chat ID.
    pub fn record_paired_ids(&mut self) {
        for id in self.chat_to_host.keys() {
            self.chat_ids.insert(id.clone(), id.clone());
        }
    }

    pub fn chat_id(&self, chat_name: &str) -> Option<&str> {
        self.chat_ids.get(chat_name).map(String::as_str)
    }

    /// Resolve a code-host login to a mention.
    ///
    /// An explicit pair wins; otherwise the login is tried as a chat username.
    pub fn mention(&self, host_login: &str) -> Mention {
        let chat_name = self
            .host_to_chat
            .get(host_login)
            .map(String::as_str)
            .unwrap_or(host_login);
        match self.chat_id(chat_name) {
            Some(id) => Mention::User(id.to_string()),
            None => Mention::Name(chat_name.to_string()),
        }
    }
}

/// The team whose pull requests are reported.
#[derive(Debug, Clone)]
pub struct Membership {
    pub source: MembershipSource,
    /// Code-host logins; empty with a static source means "everyone".
    pub allowed: Vec<String>,
    pub identities: IdentityMap,
}

impl Membership {
    /// True when a channel was resolved but contained no people.
    pub fn is_empty_team(&self) -> bool {
        self.source == MembershipSource::Channel && self.allowed.is_empty()
    }
}
