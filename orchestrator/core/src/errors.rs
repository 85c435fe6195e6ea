use std::time::Duration;

use thiserror::Error;

use crate::provider::ProviderError;

/// Classification tag for [`RunError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunErrorKind {
    DuplicateId,
    UnknownLinkTarget,
    LinkNotYetStarted,
    StartFailed,
    StartupTimeout,
}

impl RunErrorKind {
    /// True for errors detected before any provider call; these abort the
    /// whole run.
    #[must_use]
    pub const fn is_validation(self) -> bool {
        matches!(
            self,
            Self::DuplicateId | Self::UnknownLinkTarget | Self::LinkNotYetStarted
        )
    }
}

/// An error recorded against a run.
///
/// Validation errors are terminal for the whole set; start and timeout
/// errors accumulate while the run continues with the remaining
/// configurations.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("container id '{id}' is declared more than once")]
    DuplicateId { id: String },
    #[error("container '{config_id}' links to '{target}', which is not declared in this run")]
    UnknownLinkTarget { config_id: String, target: String },
    #[error(
        "container '{config_id}' links to '{target}', which is declared later and will not have started yet"
    )]
    LinkNotYetStarted { config_id: String, target: String },
    #[error("failed to start container '{config_id}': {source}")]
    StartFailed {
        config_id: String,
        #[source]
        source: ProviderError,
    },
    #[error(
        "container '{config_id}' did not log startup pattern '{pattern}' within {timeout:?}"
    )]
    StartupTimeout {
        config_id: String,
        pattern: String,
        timeout: Duration,
    },
}

impl RunError {
    #[must_use]
    pub const fn kind(&self) -> RunErrorKind {
        match self {
            Self::DuplicateId { .. } => RunErrorKind::DuplicateId,
            Self::UnknownLinkTarget { .. } => RunErrorKind::UnknownLinkTarget,
            Self::LinkNotYetStarted { .. } => RunErrorKind::LinkNotYetStarted,
            Self::StartFailed { .. } => RunErrorKind::StartFailed,
            Self::StartupTimeout { .. } => RunErrorKind::StartupTimeout,
        }
    }

    /// Configuration the error belongs to; `None` for run-wide validation
    /// errors.
    #[must_use]
    pub fn config_id(&self) -> Option<&str> {
        match self {
            Self::DuplicateId { .. } => None,
            Self::UnknownLinkTarget { config_id, .. }
            | Self::LinkNotYetStarted { config_id, .. }
            | Self::StartFailed { config_id, .. }
            | Self::StartupTimeout { config_id, .. } => Some(config_id),
        }
    }
}
