//! Health status of a monitored account.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The health of an account, derived from its balance and threshold.
///
/// The variants are ordered by severity for display only; transition
/// detection compares them for equality and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The balance is above the threshold but inside the warning margin.
    Approaching,
    /// The balance is at or below the threshold.
    Unhealthy,
    /// The balance is above the warning margin. This is also the assumed
    /// status of an account that has never been observed.
    #[default]
    Resolved,
}

/// Returned when a stored status string is not one of the known variants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown health status: {0}")]
pub struct ParseHealthStatusError(pub String);

impl HealthStatus {
    /// The stable lowercase representation used in storage and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Approaching => "approaching",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = ParseHealthStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approaching" => Ok(HealthStatus::Approaching),
            "unhealthy" => Ok(HealthStatus::Unhealthy),
            "resolved" => Ok(HealthStatus::Resolved),
            other => Err(ParseHealthStatusError(other.to_string())),
        }
    }
}
