use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".pr-reporter.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

/// Top-level configuration loaded from .pr-reporter.toml, with environment overrides.
///
/// Passed explicitly to every stage; nothing reads the environment after loading.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub jira: JiraConfig,

    #[serde(default)]
    pub team: TeamConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    /// Case-insensitive substrings; a PR needs one label containing any of them.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Project key of ticket identifiers embedded in PR titles (e.g. "SCRUM" for SCRUM-123).
    #[serde(default = "default_ticket_key")]
    pub ticket_key: String,
    #[serde(default = "default_github_api")]
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner: None,
            repo: None,
            labels: Vec::new(),
            ticket_key: default_ticket_key(),
            api_url: default_github_api(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    pub token: Option<String>,
    /// Channel the report is posted to.
    pub channel: Option<String>,
    /// User group ID mentioned under the report (`<!subteam^ID>`).
    pub team_group: Option<String>,
    /// Individual user IDs to mention; takes priority over `team_group`.
    #[serde(default)]
    pub mention_users: Vec<String>,
    #[serde(default = "default_slack_api")]
    pub api_url: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: None,
            channel: None,
            team_group: None,
            mention_users: Vec::new(),
            api_url: default_slack_api(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JiraAuth {
    /// Username (email) + API token.
    #[default]
    Basic,
    /// Personal access token sent as a bearer token.
    Bearer,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    pub token: Option<String>,
    #[serde(default)]
    pub auth: JiraAuth,
}

impl JiraConfig {
    /// Whether enough credentials are present to talk to the tracker at all.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.url)
            && present(&self.token)
            && (self.auth == JiraAuth::Bearer || present(&self.username))
    }

    /// Tracker base URL without a trailing slash, if configured.
    pub fn base_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipSource {
    /// Members of a Slack channel decide whose PRs are reported.
    #[default]
    Channel,
    /// `team.allowed_users` decides; an empty list reports every author.
    Static,
}

/// What the chat side of a `user_mapping` pair names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    /// Chat usernames, e.g. `"bob.smith" = "bobgh"`.
    #[default]
    Name,
    /// Chat user IDs, e.g. `"U02ABC" = "bobgh"`; mentions render as `<@U02ABC>`.
    Id,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamConfig {
    #[serde(default)]
    pub source: MembershipSource,
    /// Channel whose members form the team; defaults to `slack.channel`.
    pub members_channel: Option<String>,
    /// GitHub logins used when `source = "static"`.
    #[serde(default)]
    pub allowed_users: Vec<String>,
    /// Slack username (or user ID, see `mapping_kind`) -> GitHub login.
    #[serde(default)]
    pub user_mapping: BTreeMap<String, String>,
    #[serde(default)]
    pub mapping_kind: MappingKind,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportConfig {
    /// Optional heading printed above the date line.
    pub title: Option<String>,
    #[serde(default)]
    pub debug: bool,
}

fn default_ticket_key() -> String {
    "SCRUM".to_string()
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_slack_api() -> String {
    "https://slack.com/api".to_string()
}

impl Config {
    /// Load configuration from `path`, or from .pr-reporter.toml in the current
    /// directory when no path is given, then apply environment overrides.
    ///
    /// A missing default file yields the default config; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path without environment overrides.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Override file settings with environment variables resolved through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(token) = get("GITHUB_TOKEN").or_else(|| get("TOKEN")) {
            self.github.token = Some(token);
        }
        if let Some(owner) = get("OWNER").or_else(|| get("GITHUB_OWNER")) {
            self.github.owner = Some(owner);
        }
        if let Some(repo) = get("REPO") {
            self.github.repo = Some(repo);
        }
        if let Some(labels) = get("LABELS") {
            self.github.labels = split_list(&labels);
        }
        if let Some(key) = get("TICKET_KEY") {
            self.github.ticket_key = key;
        }

        if let Some(token) = get("SLACK_TOKEN") {
            self.slack.token = Some(token);
        }
        if let Some(channel) = get("SLACK_CHANNEL") {
            self.slack.channel = Some(channel);
        }
        if let Some(group) = get("TEAM_GROUP") {
            self.slack.team_group = Some(group);
        }
        if let Some(users) = get("MENTION_USERS") {
            self.slack.mention_users = split_list(&users);
        }

        if let Some(mapping) = get("USER_MAPPING") {
            self.team.user_mapping.extend(parse_user_mapping(&mapping));
        }
        if let Some(kind) = get("USER_MAPPING_KIND") {
            if kind.eq_ignore_ascii_case("id") {
                self.team.mapping_kind = MappingKind::Id;
            } else if kind.eq_ignore_ascii_case("name") {
                self.team.mapping_kind = MappingKind::Name;
            }
        }

        if let Some(url) = get("JIRA_URL") {
            self.jira.url = Some(url);
        }
        if let Some(username) = get("JIRA_USERNAME") {
            self.jira.username = Some(username);
        }
        if let Some(token) = get("JIRA_API_TOKEN") {
            self.jira.token = Some(token);
        }
        if let Some(use_pat) = get("JIRA_USE_PAT") {
            if use_pat.eq_ignore_ascii_case("true") {
                self.jira.auth = JiraAuth::Bearer;
            }
        }

        if let Some(debug) = get("DEBUG") {
            self.report.debug = debug.eq_ignore_ascii_case("true");
        }
    }

    /// Check that every setting the pipeline cannot run without is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require(&self.github.token, "github.token (GITHUB_TOKEN)")?;
        require(&self.github.owner, "github.owner (OWNER)")?;
        require(&self.github.repo, "github.repo (REPO)")?;
        require(&self.slack.token, "slack.token (SLACK_TOKEN)")?;
        require(&self.slack.channel, "slack.channel (SLACK_CHANNEL)")?;
        if self.github.ticket_key.trim().is_empty() {
            return Err(ConfigError::Missing("github.ticket_key (TICKET_KEY)"));
        }
        Ok(())
    }

    /// Channel whose membership defines the team.
    pub fn members_channel(&self) -> Option<&str> {
        self.team
            .members_channel
            .as_deref()
            .or(self.slack.channel.as_deref())
    }
}

fn require(value: &Option<String>, name: &'static str) -> Result<(), ConfigError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `slack_user:github_user,slack_user2:github_user2`. Malformed pairs are ignored.
pub fn parse_user_mapping(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (chat, host) = pair.trim().split_once(':')?;
            let (chat, host) = (chat.trim(), host.trim());
            if chat.is_empty() || host.is_empty() || host.contains(':') {
                return None;
            }
            Some((chat.to_string(), host.to_string()))
        })
        .collect()
}
