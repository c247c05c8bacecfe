use thiserror::Error;

use crate::ai::AiError;
use crate::state::{EditMode, StateError};
use crate::storage::StorageError;
use crate::surface::SurfaceError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to fetch source image: {0}")]
    Fetch(#[source] StorageError),
    #[error("failed to open image: {0}")]
    Open(#[source] SurfaceError),
    #[error("{action} is not available in {mode} mode")]
    UnavailableInMode {
        action: &'static str,
        mode: EditMode,
    },
    #[error("an AI request is still in flight")]
    Busy,
    #[error("AI tools need a persisted image id")]
    MissingImageId,
    #[error("AI ticket does not belong to the pending request")]
    StaleTicket,
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("failed to save edited image: {0}")]
    Commit(#[source] StorageError),
}

impl SessionError {
    /// Text suitable for a status line or alert.
    pub fn user_message(&self) -> String {
        match self {
            Self::Ai(err) => err.user_message(),
            Self::Commit(err) => format!("Save failed: {err}"),
            other => other.to_string(),
        }
    }

    /// Whether the session is unchanged and usable after this error.
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Fetch(_) | Self::Open(_))
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
