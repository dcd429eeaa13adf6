//! Errors raised while configuring or running the server.
//!
//! Request-level failures never surface here; they become envelope data.

/// All errors that can stop the server.
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Switchboard(#[from] switchboard::SwitchboardError),
}

pub type ServerResult<T> = Result<T, ServerError>;
