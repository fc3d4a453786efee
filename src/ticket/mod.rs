pub mod jira;
pub mod types;

pub use jira::JiraClient;
pub use types::{Issue, TicketInfo};

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

use crate::error::ServiceError;

/// Substrings (lowercase) that mark a ticket as stalled when found in its status or labels.
pub const BLOCKED_MARKERS: [&str; 3] = ["block", "impediment", "pause"];

/// Single-issue lookups against an issue tracker.
#[async_trait]
pub trait TicketTracker: Send + Sync {
    /// `Ok(None)` when the issue exists but the tracker returned no fields for it.
    async fn fetch_issue(&self, id: &str) -> Result<Option<Issue>, ServiceError>;
}

fn blocked_marker(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    BLOCKED_MARKERS
        .into_iter()
        .find(|marker| lowered.contains(marker))
}

/// Derive the blocked flag from the status name and labels.
///
/// Every source is checked and logged; once a match sets the flag it stays set.
pub fn is_blocked(id: &str, status: Option<&str>, labels: &[String]) -> bool {
    let mut blocked = false;

    if let Some(status) = status {
        if let Some(marker) = blocked_marker(status) {
            debug!(ticket = id, status, marker, "blocked by status");
            blocked = true;
        }
    }

    for label in labels {
        if let Some(marker) = blocked_marker(label) {
            debug!(ticket = id, label = %label, marker, "blocked by label");
            blocked = true;
        }
    }

    blocked
}

fn ticket_info(id: &str, issue: Issue) -> TicketInfo {
    let status = issue.status.filter(|s| !s.is_empty());
    let blocked = is_blocked(id, status.as_deref(), &issue.labels);
    TicketInfo {
        id: id.to_string(),
        status: status.unwrap_or_else(|| "No Status".to_string()),
        summary: issue
            .summary
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "No Description".to_string()),
        blocked,
    }
}

/// Look up each distinct ticket once, in order. Failures never abort: a missing
/// ticket becomes "Not Found", any other error becomes "Error".
#[instrument(skip_all, fields(tickets = ids.len()))]
pub async fn enrich(tracker: &dyn TicketTracker, ids: &[String]) -> HashMap<String, TicketInfo> {
    let mut results = HashMap::new();

    for id in ids {
        if id.is_empty() || results.contains_key(id) {
            continue;
        }

        let info = match tracker.fetch_issue(id).await {
            Ok(Some(issue)) => ticket_info(id, issue),
            Ok(None) => {
                warn!(ticket = %id, "ticket returned no usable data");
                TicketInfo::no_data(id)
            }
            Err(err) if err.is_not_found() => {
                warn!(ticket = %id, "ticket not found");
                TicketInfo::not_found(id)
            }
            Err(err) => {
                warn!(ticket = %id, error = %err, "failed to fetch ticket");
                TicketInfo::failed(id, &err)
            }
        };

        debug!(ticket = %id, status = %info.status, blocked = info.blocked, "ticket resolved");
        results.insert(id.clone(), info);
    }

    info!(resolved = results.len(), "enrichment complete");
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Service;
    use crate::testing::FakeTracker;

    fn issue(status: &str, summary: &str, labels: &[&str]) -> Issue {
        Issue {
            status: Some(status.to_string()),
            summary: Some(summary.to_string()),
            labels: labels.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_blocked_by_status() {
        assert!(is_blocked("PREFIX-42", Some("Blocked - Waiting"), &[]));
        assert!(is_blocked("X-1", Some("On PAUSE"), &[]));
        assert!(is_blocked("X-1", Some("Impediment"), &[]));
        assert!(!is_blocked("X-1", Some("In Review"), &[]));
        assert!(!is_blocked("X-1", None, &[]));
    }

    #[test]
    fn test_blocked_by_label() {
        let labels = vec!["frontend".to_string(), "Blocker".to_string()];
        assert!(is_blocked("X-1", Some("In Progress"), &labels));
        assert!(!is_blocked("X-1", Some("In Progress"), &["frontend".to_string()]));
    }

    #[test]
    fn test_blocked_flag_is_monotonic() {
        // a later non-matching label must not clear an earlier match
        let labels = vec!["blocked".to_string(), "ready".to_string()];
        assert!(is_blocked("X-1", Some("Blocked"), &labels));
        assert!(is_blocked("X-1", Some("Done"), &labels));
        assert!(is_blocked("X-1", Some("Paused"), &["ready".to_string()]));
    }

    #[tokio::test]
    async fn test_enrich_scenario_blocked_status() {
        let tracker = FakeTracker::new()
            .with_issue("PREFIX-42", issue("Blocked - Waiting", "Login fails", &[]));
        let results = enrich(&tracker, &["PREFIX-42".to_string()]).await;

        let info = &results["PREFIX-42"];
        assert!(info.blocked);
        assert_eq!(info.status, "Blocked - Waiting");
        assert_eq!(info.summary, "Login fails");
    }

    #[tokio::test]
    async fn test_enrich_isolates_failures() {
        let tracker = FakeTracker::new()
            .with_issue("PREFIX-1", issue("In Review", "First", &[]))
            .with_error(
                "PREFIX-2",
                ServiceError::Api {
                    service: Service::Jira,
                    target: "PREFIX-2".to_string(),
                    reason: "500 Internal Server Error".to_string(),
                },
            )
            .with_error(
                "PREFIX-3",
                ServiceError::NotFound {
                    service: Service::Jira,
                    what: "ticket",
                    target: "PREFIX-3".to_string(),
                },
            )
            .with_issue("PREFIX-4", issue("Done", "Fourth", &["paused"]));

        let ids: Vec<String> = (1..=4).map(|n| format!("PREFIX-{n}")).collect();
        let results = enrich(&tracker, &ids).await;

        assert_eq!(results.len(), 4);
        assert_eq!(results["PREFIX-1"].status, "In Review");
        assert_eq!(results["PREFIX-2"].status, "Error");
        assert!(results["PREFIX-2"].summary.starts_with("Error: "));
        assert_eq!(results["PREFIX-3"], TicketInfo::not_found("PREFIX-3"));
        assert_eq!(results["PREFIX-4"].summary, "Fourth");
        assert!(results["PREFIX-4"].blocked);
    }

    #[tokio::test]
    async fn test_enrich_looks_up_each_ticket_once() {
        let tracker = FakeTracker::new().with_issue("PREFIX-1", issue("Open", "s", &[]));
        let ids = vec![
            "PREFIX-1".to_string(),
            String::new(),
            "PREFIX-1".to_string(),
        ];
        let results = enrich(&tracker, &ids).await;
        assert_eq!(results.len(), 1);
        assert_eq!(tracker.requested(), vec!["PREFIX-1".to_string()]);
    }

    #[tokio::test]
    async fn test_enrich_marks_ticket_without_fields() {
        let tracker = FakeTracker::new().with_empty("PREFIX-6");
        let results = enrich(&tracker, &["PREFIX-6".to_string()]).await;
        assert_eq!(results["PREFIX-6"].status, "No Data");
        assert!(results["PREFIX-6"].summary.is_empty());
        assert!(!results["PREFIX-6"].blocked);
    }

    #[tokio::test]
    async fn test_enrich_fills_missing_fields() {
        let tracker = FakeTracker::new().with_issue("PREFIX-5", Issue::default());
        let results = enrich(&tracker, &["PREFIX-5".to_string()]).await;
        assert_eq!(results["PREFIX-5"].status, "No Status");
        assert_eq!(results["PREFIX-5"].summary, "No Description");
        assert!(!results["PREFIX-5"].blocked);
    }
}
