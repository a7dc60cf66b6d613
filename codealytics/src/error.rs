//! Errors returned by the registry and the dashboard.
//!
//! Every failure is reported synchronously to the immediate caller; nothing
//! in this crate retries on your behalf.

use thiserror::Error;

use crate::types::Identifier;

/// Failures of registry and dashboard operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The identifier breaks the naming rules.
    #[error("invalid identifier {id:?}: {reason}")]
    InvalidArgument {
        /// The rejected identifier text.
        id: String,
        /// Which rule it broke.
        reason: &'static str,
    },

    /// A metric with this identifier is already registered.
    #[error("metric `{id}` already exists, update it instead")]
    AlreadyExists {
        /// The identifier that is taken.
        id: Identifier,
    },

    /// No metric with this identifier is registered.
    #[error("metric `{id}` not found")]
    NotFound {
        /// The identifier that was looked up.
        id: String,
    },

    /// The stored value or provider could not produce the requested type.
    #[error("metric `{id}` is unresolvable: {reason}")]
    Unresolvable {
        /// The metric that failed to resolve.
        id: Identifier,
        /// Type mismatch or provider failure details.
        reason: String,
    },

    /// Another writer replaced the metric between read and swap.
    #[error("metric `{id}` was changed concurrently, retry the update")]
    Conflict {
        /// The contended metric.
        id: Identifier,
    },

    /// The operation is not allowed in the current dashboard state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The dashboard's render thread could not be started.
    #[error("could not start the render thread: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
