use std::fmt;

/// Owner/name coordinates of one code-host repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// One entry of an open pull request listing, as the code host returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePull {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub draft: bool,
    /// Author login; `None` when the host returned no user (e.g. a deleted account).
    pub author: Option<String>,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
}

/// An open pull request that passed the author and label filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: String,
    pub assignee: Option<String>,
    pub draft: bool,
    pub labels: Vec<String>,
    /// Ticket identifier found in the title (e.g. "SCRUM-123").
    pub ticket: Option<String>,
}
