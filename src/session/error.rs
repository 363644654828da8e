use thiserror::Error;

use crate::transport::TransportError;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Required input missing; raised before any I/O.
    #[error("{0}")]
    Validation(String),
    /// The API answered but the payload cannot be used.
    #[error("{0}")]
    Protocol(String),
    /// The operation is not allowed in the current session state.
    #[error("{0}")]
    State(String),
    /// Passed through from the transport unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The credential could not be written to the session store.
    #[error("Unable to persist the session: {0}")]
    Storage(#[from] std::io::Error),
}

impl SessionError {
    pub(crate) fn validation(message: &str) -> Self {
        Self::Validation(message.to_string())
    }

    pub(crate) fn protocol(message: &str) -> Self {
        Self::Protocol(message.to_string())
    }

    pub(crate) fn state(message: &str) -> Self {
        Self::State(message.to_string())
    }

    /// Short kind label used in logs (never carries payload data).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Protocol(_) => "protocol",
            Self::State(_) => "state",
            Self::Transport(_) => "transport",
            Self::Storage(_) => "storage",
        }
    }
}
