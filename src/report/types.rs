use crate::pr::PullRequest;
use crate::ticket::TicketInfo;

/// A pull request with its ticket enrichment, if any.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub pull: PullRequest,
    /// `None` when the PR has no ticket or the tracker was skipped.
    pub ticket: Option<TicketInfo>,
}

impl ReportEntry {
    pub fn is_blocked(&self) -> bool {
        self.ticket.as_ref().is_some_and(|t| t.blocked)
    }
}

/// A PR listed in the blocked or draft summary line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRef {
    pub number: u64,
    pub url: String,
    /// Blocked PRs that are also drafts are only listed once, as blocked.
    pub also_draft: bool,
}

/// Everything a single run publishes.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Entries in code-host listing order.
    pub entries: Vec<ReportEntry>,
    pub blocked: Vec<SummaryRef>,
    pub drafts: Vec<SummaryRef>,
}

/// Message settings that do not come from the collected data.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub title: Option<String>,
    /// Tracker base URL for ticket links; bare identifiers when absent.
    pub tracker_url: Option<String>,
    /// Chat user IDs mentioned under the report; wins over `team_group`.
    pub mention_users: Vec<String>,
    pub team_group: Option<String>,
}
