use thiserror::Error;

use crate::models::event::CalendarEvent;

/// Failure of an external collaborator (calendar store or intent classifier).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CollaboratorError::Timeout("http request")
        } else if err.is_decode() {
            CollaboratorError::Decode(err.to_string())
        } else {
            CollaboratorError::Request(err.to_string())
        }
    }
}

/// Everything that can end a user turn early. All variants are recovered
/// by the orchestrator and turned into a user-facing message.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("missing or invalid field: {0}")]
    Validation(String),

    #[error("no matching event: {message}")]
    NotFound { reason: &'static str, message: String },

    #[error("multiple matching events: {message}")]
    AmbiguousMatch {
        candidates: Vec<CalendarEvent>,
        message: String,
    },

    #[error("closest event is too far from the requested time: {message}")]
    NearMiss {
        event: Box<CalendarEvent>,
        distance_ms: i64,
        message: String,
    },

    #[error("collaborator failed: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("invalid classifier payload: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config line {line}: {content}")]
    Malformed { line: usize, content: String },

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
