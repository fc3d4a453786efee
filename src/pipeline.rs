use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::chat::ChatService;
use crate::config::{Config, ConfigError, MembershipSource};
use crate::error::ServiceError;
use crate::membership;
use crate::pr::{self, CodeHost, PrFilter, RepoRef, TicketPattern};
use crate::report::{self, RenderOptions};
use crate::ticket::{self, TicketTracker};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid ticket key {key:?}: {source}")]
    TicketPattern {
        key: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to resolve team membership: {0}")]
    Membership(#[source] ServiceError),

    #[error("Failed to collect pull requests: {0}")]
    Collect(#[source] ServiceError),

    #[error("{0}")]
    Publish(#[source] ServiceError),
}

/// The remote services one run talks to.
pub struct Services<'a> {
    pub chat: &'a dyn ChatService,
    pub host: &'a dyn CodeHost,
    /// `None` when tracker credentials are not configured.
    pub tracker: Option<&'a dyn TicketTracker>,
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The report was posted.
    Published { pull_requests: usize },
    /// The team channel had no human members; nothing was collected or posted.
    NoMembers,
    /// The report was rendered but not posted.
    DryRun { message: String },
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub dry_run: bool,
    /// Date printed in the report header.
    pub date: NaiveDate,
}

fn required<'c>(value: &'c Option<String>, name: &'static str) -> Result<&'c str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Run the whole report once: resolve the team, collect PRs, enrich them with
/// ticket status, render, and publish.
pub async fn run(config: &Config, services: &Services<'_>, options: RunOptions) -> Result<RunOutcome, PipelineError> {
    let post_channel = required(&config.slack.channel, "slack.channel (SLACK_CHANNEL)")?;
    let repo = RepoRef::new(
        required(&config.github.owner, "github.owner (OWNER)")?,
        required(&config.github.repo, "github.repo (REPO)")?,
    );
    let pattern = TicketPattern::new(&config.github.ticket_key).map_err(|source| PipelineError::TicketPattern {
        key: config.github.ticket_key.clone(),
        source,
    })?;

    let team = match config.team.source {
        MembershipSource::Channel => {
            let channel = config.members_channel().unwrap_or(post_channel);
            membership::resolve_channel(services.chat, channel, &config.team)
                .instrument(info_span!("membership", channel = %channel))
                .await
                .map_err(PipelineError::Membership)?
        }
        MembershipSource::Static => membership::resolve_static(&config.team),
    };

    if team.is_empty_team() {
        info!(outcome = "zero-result", "team channel has no human members, nothing to report");
        return Ok(RunOutcome::NoMembers);
    }

    let filter = PrFilter {
        labels: config.github.labels.clone(),
        authors: team.allowed.clone(),
    };
    if filter.labels.is_empty() {
        info!(repo = %repo, "collecting PRs without a label filter");
    } else {
        info!(repo = %repo, labels = ?filter.labels, "collecting PRs");
    }
    let pulls = pr::collect(services.host, &repo, &filter, &pattern)
        .await
        .map_err(PipelineError::Collect)?;

    let ticket_ids: Vec<String> = pulls.iter().filter_map(|p| p.ticket.clone()).collect();
    let tickets = match services.tracker {
        None => {
            warn!("tracker credentials not configured, ticket status will show as Unknown");
            HashMap::new()
        }
        Some(_) if ticket_ids.is_empty() => {
            debug!("no ticket identifiers in collected PRs, skipping tracker");
            HashMap::new()
        }
        Some(tracker) => {
            info!(tickets = ticket_ids.len(), "fetching ticket status");
            ticket::enrich(tracker, &ticket_ids).await
        }
    };

    let built = report::build(pulls, &tickets);
    let render_options = RenderOptions {
        title: config.report.title.clone(),
        tracker_url: config.jira.base_url().map(str::to_string),
        mention_users: config.slack.mention_users.clone(),
        team_group: config.slack.team_group.clone(),
    };
    let message = report::render(&built, &team.identities, &render_options, options.date);
    info!(
        pull_requests = built.entries.len(),
        blocked = built.blocked.len(),
        drafts = built.drafts.len(),
        "report rendered"
    );

    if options.dry_run {
        return Ok(RunOutcome::DryRun { message });
    }

    report::publish(services.chat, post_channel, &message)
        .await
        .map_err(PipelineError::Publish)?;
    info!(channel = %post_channel, "report published");

    Ok(RunOutcome::Published {
        pull_requests: built.entries.len(),
    })
}
