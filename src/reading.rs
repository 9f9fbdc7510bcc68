//! Outcome of a single characteristic read.
//!
//! The host contract is that a read never fails outwardly, so every
//! non-value outcome collapses to [`SENTINEL`]. That collapse is lossy: a
//! sentinel 0 cannot be told apart from a genuine zero reading. Callers that
//! can carry more than a number (the HTTP surface, the poller) keep the
//! [`Reading`] itself.

use crate::error::ReadFailure;
use crate::quality::QualityLevel;
use serde::Serialize;

pub const SENTINEL: f64 = 0.0;
pub const SENTINEL_CODE: u8 = 0;

/// An identifier that had to be discovered. The read is deferred until the
/// operator persists the discovered value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingIdentifier {
    PoolId { discovered: String },
    DeviceSerial { discovered: String },
}

impl PendingIdentifier {
    /// Setup-config key the discovered value belongs under.
    pub fn config_key(&self) -> &'static str {
        match self {
            PendingIdentifier::PoolId { .. } => "swimmingpoolid",
            PendingIdentifier::DeviceSerial { .. } => "bluedeviceserial",
        }
    }

    pub fn discovered(&self) -> &str {
        match self {
            PendingIdentifier::PoolId { discovered }
            | PendingIdentifier::DeviceSerial { discovered } => discovered.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStatus {
    Ok,
    Pending,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reading<T> {
    Value(T),
    Pending(PendingIdentifier),
    Unavailable(ReadFailure),
}

impl<T> Reading<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Reading::Value(value) => Reading::Value(f(value)),
            Reading::Pending(pending) => Reading::Pending(pending),
            Reading::Unavailable(failure) => Reading::Unavailable(failure),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Reading::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn status(&self) -> ReadStatus {
        match self {
            Reading::Value(_) => ReadStatus::Ok,
            Reading::Pending(_) => ReadStatus::Pending,
            Reading::Unavailable(_) => ReadStatus::Unavailable,
        }
    }

    /// Human-readable reason for a non-value outcome.
    pub fn detail(&self) -> Option<String> {
        match self {
            Reading::Value(_) => None,
            Reading::Pending(pending) => Some(format!(
                "add \"{}\": \"{}\" to the configuration",
                pending.config_key(),
                pending.discovered()
            )),
            Reading::Unavailable(failure) => Some(failure.to_string()),
        }
    }
}

impl Reading<f64> {
    pub fn value_or_sentinel(&self) -> f64 {
        self.value().copied().unwrap_or(SENTINEL)
    }
}

impl Reading<QualityLevel> {
    pub fn code_or_sentinel(&self) -> u8 {
        self.value()
            .map(|level| level.characteristic_code())
            .unwrap_or(SENTINEL_CODE)
    }
}
