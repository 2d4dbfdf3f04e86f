//! Maps a balance sample to a health status.

use crate::models::HealthStatus;

/// Balances up to this multiple of the threshold are reported as approaching
/// the threshold.
pub const APPROACHING_MARGIN: f64 = 1.1;

/// Classifies a balance against a threshold.
///
/// Boundaries belong to the more severe bucket: a balance equal to the
/// threshold is unhealthy and a balance equal to `threshold * 1.1` is
/// approaching. The threshold is expected to be non-negative; validating it is
/// up to the caller.
pub fn classify(balance: f64, threshold: f64) -> HealthStatus {
    if balance <= threshold {
        HealthStatus::Unhealthy
    } else if balance <= threshold * APPROACHING_MARGIN {
        HealthStatus::Approaching
    } else {
        HealthStatus::Resolved
    }
}
