//! Failure taxonomy for one aggregation request.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrendError {
    /// The occurrence source or document lookup failed.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// An occurrence references a document id with no stored document.
    #[error("document not found: {0}")]
    NotFound(i64),

    /// A time-window boundary could not be parsed.
    #[error("invalid window boundary: {0}")]
    InvalidWindow(String),
}

impl TrendError {
    /// Wraps a collaborator failure, keeping the whole context chain.
    pub fn upstream(err: anyhow::Error) -> Self {
        Self::UpstreamUnavailable(format!("{:#}", err))
    }

    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::NotFound(_) => "not_found",
            Self::InvalidWindow(_) => "bad_request",
        }
    }
}
