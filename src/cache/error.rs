use thiserror::Error;

/// Outcome delivered to a caller whose request could not be served.
///
/// The acquisition error is forwarded untouched: every waiter of a failed
/// attempt receives its own clone of the same value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AcquireError<E> {
    #[error("token acquisition failed: {0}")]
    Failed(E),
    /// The acquisition task ended without an outcome (it panicked).
    #[error("token acquisition was abandoned before completing")]
    Abandoned,
}

impl<E> AcquireError<E> {
    /// The collaborator's error, if the attempt produced one.
    pub fn source_error(&self) -> Option<&E> {
        match self {
            AcquireError::Failed(e) => Some(e),
            AcquireError::Abandoned => None,
        }
    }

    pub(crate) fn reason(&self) -> &'static str {
        match self {
            AcquireError::Failed(_) => "failed",
            AcquireError::Abandoned => "abandoned",
        }
    }
}
