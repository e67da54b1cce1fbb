use thiserror::Error;

use crate::fetcher::PhaseReport;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScrapeError {
    #[error("Valid url required")]
    InvalidUrl,

    #[error("Unable to load page (blocked or not HTML)")]
    Unavailable,

    /// The headless endpoint answered 403: bad token or exhausted plan.
    #[error("browserless_403")]
    AuthRejected,

    #[error("Could not extract product metadata")]
    NoMetadata,

    #[error(transparent)]
    Client(#[from] ClientBuildError),
}

impl ScrapeError {
    pub fn status_code(&self) -> u16 {
        match self {
            ScrapeError::InvalidUrl => 400,
            ScrapeError::Unavailable | ScrapeError::AuthRejected => 502,
            ScrapeError::NoMetadata => 422,
            ScrapeError::Client(_) => 500,
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ScrapeError::AuthRejected => Some("Invalid token, no credits, or endpoint blocked by plan"),
            _ => None,
        }
    }
}

/// Failed HTTP client construction. Holds the rendered cause since the
/// underlying client error is not `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to build HTTP client: {0}")]
pub struct ClientBuildError(pub String);

impl From<wreq::Error> for ClientBuildError {
    fn from(err: wreq::Error) -> Self {
        Self(err.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchFailure {
    pub direct: PhaseReport,
    pub headless: PhaseReport,
}

impl FetchFailure {
    pub fn headless_rejected(&self) -> bool {
        self.headless.status == Some(403)
    }
}

impl From<FetchFailure> for ScrapeError {
    fn from(failure: FetchFailure) -> Self {
        if failure.headless_rejected() {
            ScrapeError::AuthRejected
        } else {
            ScrapeError::Unavailable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream extractor error: {0}")]
    Upstream(String),
}
