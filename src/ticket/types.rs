/// Fields read from a single tracker issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Issue {
    pub status: Option<String>,
    pub summary: Option<String>,
    pub labels: Vec<String>,
}

/// Enrichment attached to every PR that references a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketInfo {
    pub id: String,
    pub status: String,
    pub summary: String,
    /// Derived from status and labels, see `ticket::is_blocked`.
    pub blocked: bool,
}

impl TicketInfo {
    pub const NOT_FOUND: &'static str = "Not Found";
    pub const ERROR: &'static str = "Error";
    pub const NO_DATA: &'static str = "No Data";

    pub fn not_found(id: &str) -> Self {
        Self {
            id: id.to_string(),
            status: Self::NOT_FOUND.to_string(),
            summary: "Ticket not found".to_string(),
            blocked: false,
        }
    }

    /// The issue exists but carried no fields; the PR title stands in as description.
    pub fn no_data(id: &str) -> Self {
        Self {
            id: id.to_string(),
            status: Self::NO_DATA.to_string(),
            summary: String::new(),
            blocked: false,
        }
    }

    pub fn failed(id: &str, error: &dyn std::error::Error) -> Self {
        Self {
            id: id.to_string(),
            status: Self::ERROR.to_string(),
            summary: format!("Error: {error}"),
            blocked: false,
        }
    }
}
