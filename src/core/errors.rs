//! Domain error types
//!
//! Every failure inside the resolver or the session channel ends up as a
//! displayable result or event. These types carry the failure to the
//! boundary where that conversion happens.

use thiserror::Error;

use super::types::{CommandResult, ResultKind};

/// Errors raised by slash command handlers
///
/// Each variant maps onto exactly one displayable [`CommandResult`], so a
/// handler failure never escapes the resolver.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Input rejected locally, no collaborator call was made
    #[error("{0}")]
    Validation(String),

    /// The capability needed by the command is not reachable
    #[error("{0}")]
    Unavailable(String),

    /// The collaborator call itself failed
    #[error("Error: {0}")]
    Collaborator(String),
}

impl CommandError {
    pub fn collaborator(err: impl std::fmt::Display) -> Self {
        CommandError::Collaborator(err.to_string())
    }

    /// Convert into the single result shown in place of the command output
    pub fn into_result(self, command: &str, kind: ResultKind) -> CommandResult {
        match self {
            CommandError::Validation(hint) => {
                CommandResult::new(format!("{command}-hint"), hint, "Keep typing…", kind)
            }
            CommandError::Unavailable(reason) => CommandResult::new(
                format!("{command}-unavailable"),
                reason,
                "Not available in this environment",
                ResultKind::System,
            ),
            err @ CommandError::Collaborator(_) => CommandResult::new(
                format!("{command}-error"),
                err.to_string(),
                format!("/{command} failed"),
                ResultKind::System,
            ),
        }
    }
}

/// Errors registering slash commands at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Command already registered: /{0}")]
    Duplicate(String),

    #[error("Invalid command name: {0:?}")]
    InvalidName(String),
}

/// Errors talking to the assistant backend
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the backend (refused, DNS, handshake)
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Writing to the streaming channel failed
    #[error("Send failed: {0}")]
    Send(String),

    /// The backend answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body did not have the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),

    /// The streaming channel closed
    #[error("Channel closed: {0}")]
    Closed(String),

    #[error("Request timed out")]
    Timeout,
}

impl TransportError {
    /// Classify a reqwest failure
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            TransportError::Http {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            TransportError::Connect(e.to_string())
        }
    }
}

/// Errors from the sandboxed arithmetic evaluator
#[derive(Debug, Error, PartialEq)]
pub enum CalcError {
    #[error("Empty expression")]
    Empty,

    #[error("Unexpected character {0:?}")]
    UnexpectedChar(char),

    #[error("Invalid number literal {0:?}")]
    InvalidNumber(String),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unexpected token at position {0}")]
    UnexpectedToken(usize),

    #[error("Result is not finite")]
    NotFinite,

    #[error("Expression is nested too deeply")]
    TooDeep,
}
