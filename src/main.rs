mod chat;
mod config;
mod error;
mod membership;
mod pipeline;
mod pr;
mod report;
mod ticket;

#[cfg(test)]
mod testing;

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;

use crate::chat::SlackClient;
use crate::config::{Config, MembershipSource};
use crate::pipeline::{RunOptions, RunOutcome, Services};
use crate::pr::GitHubClient;
use crate::ticket::{JiraClient, TicketTracker};

/// PR Reporter: posts a Slack digest of a team's open GitHub pull requests,
/// enriched with Jira ticket status.
#[derive(Parser, Debug)]
#[command(name = "pr-reporter", version, about)]
struct Cli {
    /// Config file (defaults to .pr-reporter.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render the report to stdout instead of posting it
    #[arg(long)]
    dry_run: bool,

    /// Print the effective configuration (tokens hidden) and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug logging (same as DEBUG=true)
    #[arg(long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let default_level = if cli.debug || config.report.debug {
        "pr_reporter=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    if cli.print_config {
        print_config(&config);
        return Ok(());
    }

    config.validate()?;

    let github_token = config.github.token.as_deref().unwrap_or_default();
    let slack_token = config.slack.token.as_deref().unwrap_or_default();
    let host = GitHubClient::new(github_token, &config.github.api_url)?;
    let chat = SlackClient::new(slack_token, &config.slack.api_url)?;
    let jira = JiraClient::from_config(&config.jira)?;

    let services = Services {
        chat: &chat,
        host: &host,
        tracker: jira.as_ref().map(|j| j as &dyn TicketTracker),
    };
    let options = RunOptions {
        dry_run: cli.dry_run,
        date: chrono::Local::now().date_naive(),
    };

    info!("starting PR report");
    let outcome = pipeline::run(&config, &services, options)
        .instrument(info_span!("report_run"))
        .await?;

    match outcome {
        RunOutcome::Published { pull_requests } => {
            info!(pull_requests, "PR report sent");
        }
        RunOutcome::NoMembers => {
            warn!("no team members found, no report sent");
        }
        RunOutcome::DryRun { message } => {
            println!("{}", "── report preview ──".bold());
            println!("{message}");
        }
    }

    Ok(())
}

fn print_config(config: &Config) {
    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "(not set)".to_string());
    let secret = |value: &Option<String>| {
        if value.as_deref().is_some_and(|v| !v.is_empty()) {
            "(set, hidden)".to_string()
        } else {
            "(not set)".to_string()
        }
    };

    println!("{}", "GitHub".bold());
    println!("  token:       {}", secret(&config.github.token));
    println!("  repository:  {}/{}", show(&config.github.owner), show(&config.github.repo));
    println!("  labels:      {:?}", config.github.labels);
    println!("  ticket key:  {}", config.github.ticket_key);

    println!("{}", "Slack".bold());
    println!("  token:       {}", secret(&config.slack.token));
    println!("  channel:     {}", show(&config.slack.channel));
    println!("  team group:  {}", show(&config.slack.team_group));
    println!("  mentions:    {:?}", config.slack.mention_users);

    println!("{}", "Jira".bold());
    println!("  url:         {}", show(&config.jira.url));
    println!("  username:    {}", show(&config.jira.username));
    println!("  token:       {}", secret(&config.jira.token));
    println!("  auth:        {:?}", config.jira.auth);
    if !config.jira.is_configured() {
        println!("  {}", "incomplete: ticket status will show as Unknown".yellow());
    }

    println!("{}", "Team".bold());
    match config.team.source {
        MembershipSource::Channel => println!(
            "  source:      members of {}",
            config.members_channel().unwrap_or("(not set)")
        ),
        MembershipSource::Static => println!("  source:      allow-list {:?}", config.team.allowed_users),
    }
    println!("  mapping:     {:?}", config.team.user_mapping);

    println!("{}", "Report".bold());
    println!("  title:       {}", show(&config.report.title));
    println!("  debug:       {}", config.report.debug);
}
