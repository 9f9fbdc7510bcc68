use crate::measurement::MetricKind;
use thiserror::Error;

/// Failures crossing the remote service boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode {what} response: {message}")]
    Decode { what: &'static str, message: String },

    #[error("service returned no {0}")]
    Empty(&'static str),

    #[error("expected {expected} measurement records, service returned {found}")]
    MissingRecords { expected: usize, found: usize },

    #[error("{metric} band is not ordered (warning_low <= ok_min <= ok_max <= warning_high)")]
    InvalidBand { metric: MetricKind },

    #[error("login rejected: {0}")]
    Login(String),

    #[error("session is not authenticated")]
    NotAuthenticated,

    #[error("invalid service URL: {0}")]
    InvalidUrl(String),
}

/// Why a read could not produce a value. Identifier discovery is not a
/// failure; see [`crate::reading::PendingIdentifier`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadFailure {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("fetch failed: {0}")]
    Fetch(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metric `{0}` (expected temperature, ph, orp or salinity)")]
pub struct UnknownMetric(pub String);
