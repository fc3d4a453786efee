use std::fmt;

use thiserror::Error;

/// The remote service a request was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    GitHub,
    Slack,
    Jira,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::GitHub => write!(f, "GitHub"),
            Service::Slack => write!(f, "Slack"),
            Service::Jira => write!(f, "Jira"),
        }
    }
}

/// Failures reported by the code host, chat and tracker clients.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} rejected the credentials: {reason}")]
    Authentication { service: Service, reason: String },

    #[error("{service} {what} not found: {target}")]
    NotFound {
        service: Service,
        what: &'static str,
        target: String,
    },

    #[error("{service} denied access to {target}: {reason}")]
    Permission {
        service: Service,
        target: String,
        reason: String,
    },

    #[error("{service} rate limit exceeded while requesting {target}")]
    RateLimit { service: Service, target: String },

    #[error("Failed to publish report to {channel}: {reason}")]
    Publish { channel: String, reason: String },

    #[error("{service} request failed: {source}")]
    Http {
        service: Service,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned an unexpected response for {target}: {reason}")]
    Api {
        service: Service,
        target: String,
        reason: String,
    },
}

impl ServiceError {
    pub fn http(service: Service) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ServiceError::Http { service, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }
}
