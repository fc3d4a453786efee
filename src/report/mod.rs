pub mod types;

pub use types::{RenderOptions, Report, ReportEntry, SummaryRef};

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::chat::ChatService;
use crate::error::ServiceError;
use crate::membership::IdentityMap;
use crate::pr::PullRequest;
use crate::ticket::TicketInfo;

const REVIEW_CALL: &str = "Please make sure to review these pull requests!";

/// Pair each PR with its ticket info and compute the blocked/draft summaries.
///
/// Order follows `pulls`; nothing is re-sorted.
pub fn build(pulls: Vec<PullRequest>, tickets: &HashMap<String, TicketInfo>) -> Report {
    let entries: Vec<ReportEntry> = pulls
        .into_iter()
        .map(|pull| {
            let ticket = pull.ticket.as_ref().and_then(|id| tickets.get(id)).cloned();
            ReportEntry { pull, ticket }
        })
        .collect();

    let mut blocked = Vec::new();
    let mut drafts = Vec::new();
    for entry in &entries {
        let summary = SummaryRef {
            number: entry.pull.number,
            url: entry.pull.url.clone(),
            also_draft: entry.is_blocked() && entry.pull.draft,
        };
        if entry.is_blocked() {
            blocked.push(summary);
        } else if entry.pull.draft {
            drafts.push(summary);
        }
    }

    Report {
        entries,
        blocked,
        drafts,
    }
}

fn pr_link(number: u64, url: &str) -> String {
    format!("<{url}|PR-{number}>")
}

fn ticket_text(ticket: Option<&str>, tracker_url: Option<&str>) -> String {
    match (ticket, tracker_url) {
        (Some(id), Some(base)) => format!("<{base}/browse/{id}|{id}>"),
        (Some(id), None) => id.to_string(),
        (None, _) => "N/A".to_string(),
    }
}

fn entry_line(index: usize, entry: &ReportEntry, identities: &IdentityMap, options: &RenderOptions) -> String {
    let pull = &entry.pull;

    let assignee = match pull.assignee.as_deref() {
        Some(login) => identities.mention(login).to_string(),
        None => "unassigned".to_string(),
    };

    let ticket = ticket_text(pull.ticket.as_deref(), options.tracker_url.as_deref());

    let description = entry
        .ticket
        .as_ref()
        .map(|t| t.summary.as_str())
        .filter(|s| !s.is_empty())
        .or(Some(pull.title.as_str()).filter(|s| !s.is_empty()))
        .unwrap_or("No description");

    let status = entry
        .ticket
        .as_ref()
        .map(|t| t.status.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown");

    format!(
        "{}. *{}* assigned to {} | Jira: {} | {} | *{}*",
        index + 1,
        pr_link(pull.number, &pull.url),
        assignee,
        ticket,
        description,
        status
    )
}

fn mention_line(options: &RenderOptions) -> Option<String> {
    let users: Vec<String> = options
        .mention_users
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(|id| format!("<@{id}>"))
        .collect();
    if !users.is_empty() {
        return Some(format!("{} {REVIEW_CALL}", users.join(" ")));
    }
    options
        .team_group
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(|group| format!("<!subteam^{group}> {REVIEW_CALL}"))
}

/// Render the report as one Slack mrkdwn message.
///
/// The output depends only on the arguments; `date` is the only line that changes day to day.
pub fn render(report: &Report, identities: &IdentityMap, options: &RenderOptions, date: NaiveDate) -> String {
    let mut lines = Vec::new();

    if let Some(title) = options.title.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("📋 *{title}*"));
        lines.push(String::new());
    }

    lines.push(format!(":date: *{}*", date.format("%Y-%m-%d")));
    lines.push(String::new());
    lines.push(format!(":bar_chart: *Total Open PRs: {}*", report.entries.len()));
    lines.push(String::new());

    for (index, entry) in report.entries.iter().enumerate() {
        lines.push(entry_line(index, entry, identities, options));
    }

    lines.push(String::new());

    if report.blocked.is_empty() && report.drafts.is_empty() {
        lines.push("✅ *Blocked/Draft:* N/A".to_string());
    } else {
        if !report.blocked.is_empty() {
            let refs: Vec<String> = report
                .blocked
                .iter()
                .map(|r| {
                    let link = pr_link(r.number, &r.url);
                    if r.also_draft {
                        format!("{link} (Blocked & Draft)")
                    } else {
                        link
                    }
                })
                .collect();
            lines.push(format!("🚫 *Blocked:* {}", refs.join(", ")));
        }
        if !report.drafts.is_empty() {
            let refs: Vec<String> = report
                .drafts
                .iter()
                .map(|r| pr_link(r.number, &r.url))
                .collect();
            lines.push(format!("📝 *Draft:* {}", refs.join(", ")));
        }
    }

    if let Some(mentions) = mention_line(options) {
        lines.push(String::new());
        lines.push(mentions);
    }

    lines.join("\n")
}

/// Post the rendered message. Any rejection is a publish failure.
#[instrument(skip(chat, message), fields(chars = message.len()))]
pub async fn publish(chat: &dyn ChatService, channel: &str, message: &str) -> Result<(), ServiceError> {
    chat.post_message(channel, message)
        .await
        .map_err(|err| ServiceError::Publish {
            channel: channel.to_string(),
            reason: err.to_string(),
        })?;
    debug!("message posted");
    Ok(())
}
