pub mod github;
pub mod types;

pub use github::GitHubClient;
pub use types::{PullRequest, RemotePull, RepoRef};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, instrument};

use crate::error::ServiceError;

/// Page size for open PR listings; a shorter page marks the end.
pub const PAGE_SIZE: u32 = 100;

/// Read access to a code host's pull request listings.
#[async_trait]
pub trait CodeHost: Send + Sync {
    /// Return one page (1-based) of open pull requests for `repo`, in listing order.
    async fn list_open_pulls(
        &self,
        repo: &RepoRef,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<RemotePull>, ServiceError>;
}

/// Finds ticket identifiers of the form `<KEY>-<digits>` in PR titles.
#[derive(Debug, Clone)]
pub struct TicketPattern {
    regex: Regex,
}

impl TicketPattern {
    pub fn new(key: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(r"{}-\d+", regex::escape(key.trim())))?;
        Ok(Self { regex })
    }

    /// First identifier in `title`, or `None`. Never fails.
    pub fn extract(&self, title: &str) -> Option<String> {
        self.regex.find(title).map(|m| m.as_str().to_string())
    }
}

/// Author and label criteria a pull request must satisfy to be reported.
#[derive(Debug, Clone, Default)]
pub struct PrFilter {
    /// Case-insensitive substrings matched against label names. Empty = no label filter.
    pub labels: Vec<String>,
    /// Code-host logins, compared case-insensitively. Empty = every author passes.
    pub authors: Vec<String>,
}

impl PrFilter {
    pub fn author_allowed(&self, author: &str) -> bool {
        let mut entries = self
            .authors
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .peekable();
        if entries.peek().is_none() {
            return true;
        }
        let author = author.to_lowercase();
        entries.any(|allowed| allowed.to_lowercase() == author)
    }

    /// The first (label, term) pair where the label contains the term, if a filter is set.
    fn matching_label<'a>(&'a self, labels: &'a [String]) -> Option<(&'a str, &'a str)> {
        labels.iter().find_map(|label| {
            let lowered = label.to_lowercase();
            self.labels
                .iter()
                .find(|term| lowered.contains(&term.to_lowercase()))
                .map(|term| (label.as_str(), term.as_str()))
        })
    }

    /// True when no label filter is set or one of `labels` contains a filter term.
    pub fn labels_match(&self, labels: &[String]) -> bool {
        if self.labels.is_empty() {
            return true;
        }
        match self.matching_label(labels) {
            Some((label, term)) => {
                debug!(label, term, "matched label filter");
                true
            }
            None => false,
        }
    }
}

/// Fetch every page of open pull requests, listing order preserved.
async fn list_all_open(host: &dyn CodeHost, repo: &RepoRef) -> Result<Vec<RemotePull>, ServiceError> {
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let batch = host.list_open_pulls(repo, page, PAGE_SIZE).await?;
        let fetched = batch.len();
        debug!(page, fetched, "fetched page of open PRs");
        all.extend(batch);
        if fetched < PAGE_SIZE as usize {
            break;
        }
        page += 1;
    }
    Ok(all)
}

/// List all open PRs of `repo` and keep the ones passing `filter`, extracting
/// ticket identifiers from their titles.
#[instrument(skip(host, repo, filter, pattern), fields(repo = %repo))]
pub async fn collect(
    host: &dyn CodeHost,
    repo: &RepoRef,
    filter: &PrFilter,
    pattern: &TicketPattern,
) -> Result<Vec<PullRequest>, ServiceError> {
    let listing = list_all_open(host, repo).await?;
    info!(total = listing.len(), "fetched open PRs");

    let mut kept = Vec::new();
    for pull in listing {
        debug!(pr = pull.number, title = %pull.title, draft = pull.draft, labels = ?pull.labels, "examining PR");

        let Some(author) = pull.author else {
            debug!(pr = pull.number, "skipped: no author");
            continue;
        };

        if !filter.author_allowed(&author) {
            debug!(pr = pull.number, author = %author, "skipped: author not in team");
            continue;
        }

        if !filter.labels_match(&pull.labels) {
            debug!(pr = pull.number, filter = ?filter.labels, "skipped: no matching label");
            continue;
        }

        let ticket = pattern.extract(&pull.title);
        if let Some(ticket) = &ticket {
            debug!(pr = pull.number, ticket = %ticket, "extracted ticket");
        }

        kept.push(PullRequest {
            number: pull.number,
            title: pull.title,
            url: pull.url,
            author,
            assignee: pull.assignee,
            draft: pull.draft,
            labels: pull.labels,
            ticket,
        });
    }

    info!(matched = kept.len(), "filtered PRs");
    Ok(kept)
}
