use thiserror::Error;

/// Failures surfaced by the studio core.
///
/// `Validation` and `NotReady` are returned before any collaborator is
/// contacted. `Collaborator` failures end up as a `Failed` request state
/// when they happen inside a spawned request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StudioError {
    #[error("{0}")]
    Validation(String),

    #[error("{service} failed: {message}")]
    Collaborator {
        service: &'static str,
        message: String,
    },

    #[error("{0} is not ready")]
    NotReady(&'static str),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl StudioError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn collaborator(service: &'static str, message: impl ToString) -> Self {
        Self::Collaborator {
            service,
            message: message.to_string(),
        }
    }
}

pub type StudioResult<T> = Result<T, StudioError>;
