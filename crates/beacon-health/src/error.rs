//! Health error types.

use thiserror::Error;

/// Result type alias for health queries.
pub type HealthResult<T> = Result<T, HealthError>;

/// Stable message key for the degraded-service refusal.
pub const STATUS_MAJOR_CODE: &str = "l.system.status.major";

/// Errors surfaced by the aggregator's query surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HealthError {
    /// The latest snapshot is MAJOR; new work should be refused.
    #[error("service is degraded ({code})")]
    ServiceDegraded { code: &'static str, status: u16 },

    /// A snapshot was queried before the first tick published one.
    #[error("health status queried before the first snapshot was published")]
    NotStarted,
}

impl HealthError {
    pub(crate) fn degraded() -> Self {
        HealthError::ServiceDegraded {
            code: STATUS_MAJOR_CODE,
            status: 503,
        }
    }

    /// HTTP-equivalent status for transport layers.
    pub fn status(&self) -> u16 {
        match self {
            HealthError::ServiceDegraded { status, .. } => *status,
            HealthError::NotStarted => 500,
        }
    }

    /// Localizable message key.
    pub fn code(&self) -> &'static str {
        match self {
            HealthError::ServiceDegraded { code, .. } => *code,
            HealthError::NotStarted => "l.system.status.not.started",
        }
    }
}
