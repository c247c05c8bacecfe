use crate::ai::AiError;
use crate::cli::ScriptError;
use crate::config::ConfigError;
use crate::session::SessionError;
use crate::state::StateError;
use crate::storage::StorageError;
use crate::surface::SurfaceError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}
