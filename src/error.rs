//! SpeechTrainer Error Types
//!
//! Centralized error handling for session operations.

use thiserror::Error;

/// Central error type for recognition session operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no engine registered with id '{0}'")]
    EngineNotFound(String),

    #[error("engine '{0}' failed to initialize")]
    EngineInitFailed(String),

    #[error("model load failed: {0}")]
    ModelLoadFailed(String),

    #[error("no active engine")]
    NoEngine,

    #[error("engine mismatch: requested '{requested}' but '{active}' is active")]
    EngineMismatch { requested: String, active: String },

    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("audio source error: {0}")]
    AudioInitFailed(String),

    #[error("engine '{0}' failed to start recognition")]
    StartFailed(String),

    #[error("lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Helper to convert Mutex poison errors
impl<T> From<std::sync::PoisonError<T>> for SessionError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        SessionError::Lock(err.to_string())
    }
}
