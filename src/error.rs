//! Crate-level errors and their HTTP mapping

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use super::{board, questions, session, teams};

/// Errors surfaced by the store, the HTTP layer and the client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No live session has this id
    #[error("session not found")]
    SessionNotFound,
    /// The server already holds the maximum number of sessions
    #[error("too many active sessions")]
    TooManySessions,
    /// Another team already holds the buzz lock
    #[error("buzz lock is held by team {owner}")]
    BuzzLockHeld {
        /// The team holding the lock
        owner: usize,
    },
    /// A payload failed validation
    #[error("{0}")]
    Validation(String),
    /// A session operation failed
    #[error(transparent)]
    Session(#[from] session::Error),
    /// The request could not be sent or the response could not be read
    #[error("transport error: {0}")]
    Transport(String),
    /// The server answered with an unexpected status
    #[error("unexpected status {0}")]
    Status(u16),
}

impl From<teams::Error> for Error {
    fn from(error: teams::Error) -> Self {
        Self::Session(error.into())
    }
}

impl From<board::Error> for Error {
    fn from(error: board::Error) -> Self {
        Self::Session(error.into())
    }
}

impl From<questions::Error> for Error {
    fn from(error: questions::Error) -> Self {
        Self::Session(error.into())
    }
}

impl From<garde::Report> for Error {
    fn from(report: garde::Report) -> Self {
        Self::Validation(report.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Transport(error.to_string()),
        }
    }
}

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code
    pub error: &'static str,
    /// Human-readable description
    pub message: String,
    /// Team holding the buzz lock, set on `buzz_lock_held`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<usize>,
}

impl Error {
    /// HTTP status and stable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        use session::Error as S;

        match self {
            Self::SessionNotFound => (StatusCode::NOT_FOUND, "session_not_found"),
            Self::TooManySessions => (StatusCode::SERVICE_UNAVAILABLE, "too_many_sessions"),
            Self::BuzzLockHeld { .. } => (StatusCode::CONFLICT, "buzz_lock_held"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed"),
            Self::Session(S::Teams(teams::Error::NoSuchTeam(_))) => {
                (StatusCode::NOT_FOUND, "team_not_found")
            }
            Self::Session(S::Teams(_)) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_team"),
            Self::Session(S::Board(board::Error::NoSuchCell(_))) => {
                (StatusCode::NOT_FOUND, "cell_not_found")
            }
            Self::Session(S::Board(board::Error::NoSuchCategory(_))) => {
                (StatusCode::NOT_FOUND, "category_not_found")
            }
            Self::Session(S::Board(_)) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_board_action"),
            Self::Session(S::Questions(questions::Error::NotFound(_))) => {
                (StatusCode::NOT_FOUND, "question_not_found")
            }
            Self::Session(S::Questions(_)) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_deck"),
            Self::Transport(_) => (StatusCode::BAD_GATEWAY, "transport_error"),
            Self::Status(_) => (StatusCode::BAD_GATEWAY, "upstream_status"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_code();
        let owner = match self {
            Self::BuzzLockHeld { owner } => Some(owner),
            _ => None,
        };
        let body = ErrorResponse {
            error,
            message: self.to_string(),
            owner,
        };
        (status, Json(body)).into_response()
    }
}
