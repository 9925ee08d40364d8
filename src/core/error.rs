//! Session error kinds

use thiserror::Error;

use super::terminal::TerminalError;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The program or its environment failed to load
    #[error("Runtime failed to initialize: {0}")]
    RuntimeInitialization(String),

    /// Uncaught fault while the program was running
    #[error("{0}")]
    RuntimeExecution(String),

    /// A line was requested while another request was still outstanding
    #[error("Reentrant input request {prompt:?} while {outstanding:?} is outstanding")]
    ReentrantInputRequest { prompt: String, outstanding: String },

    /// Clipboard or other peripheral failure; never fatal to the session
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    #[error(transparent)]
    Terminal(#[from] TerminalError),

    /// The session was torn down while the operation was pending
    #[error("Session closed")]
    Closed,
}

impl SessionError {
    /// Build an execution fault from any displayable cause
    pub fn fault(cause: impl std::fmt::Display) -> Self {
        Self::RuntimeExecution(cause.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
