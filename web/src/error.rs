use std::error::Error as StdError;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use sse::error::{Error as SseError, ErrorKind as SseErrorKind};

extern crate log;

pub type Result<T> = core::result::Result<T, Error>;

/// Top-level error type for the `web` layer. Errors from the `sse` layer and the
/// transport are translated into a `WebErrorKind` that decides the HTTP response.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: WebErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum WebErrorKind {
    Input(InputErrorKind),
    /// New sessions are refused because shutdown has begun.
    Unavailable,
    /// Binding or serving on the listener failed.
    Transport,
    /// Open connections did not finish within the shutdown grace period.
    ShutdownTimeout,
    Internal,
}

/// Client input errors. None of them has side effects on the registry.
#[derive(Debug, PartialEq)]
pub enum InputErrorKind {
    /// The stream endpoint was opened without a user key.
    MissingStreamUser,
    /// A dispatch body without a user key.
    MissingUserId,
    /// A dispatch body that is not valid JSON of the expected shape.
    InvalidBody,
}

impl Error {
    pub fn new(error_kind: WebErrorKind) -> Self {
        Self {
            source: None,
            error_kind,
        }
    }

    pub fn input(kind: InputErrorKind) -> Self {
        Self::new(WebErrorKind::Input(kind))
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.error_kind {
            WebErrorKind::Input(input_error_kind) => match input_error_kind {
                InputErrorKind::MissingStreamUser => StatusCode::BAD_REQUEST.into_response(),
                InputErrorKind::MissingUserId => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "userID is required"})),
                )
                    .into_response(),
                InputErrorKind::InvalidBody => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid body"})),
                )
                    .into_response(),
            },
            WebErrorKind::Unavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE UNAVAILABLE").into_response()
            }
            WebErrorKind::Transport | WebErrorKind::ShutdownTimeout | WebErrorKind::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

// This is where we translate errors from the `sse` layer to the `web` layer.
impl From<SseError> for Error {
    fn from(err: SseError) -> Self {
        let error_kind = match err.error_kind {
            SseErrorKind::RegistryClosed => WebErrorKind::Unavailable,
            SseErrorKind::DuplicateSession | SseErrorKind::Serialization => WebErrorKind::Internal,
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(err: JsonRejection) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: WebErrorKind::Input(InputErrorKind::InvalidBody),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: WebErrorKind::Transport,
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: WebErrorKind::Internal,
        }
    }
}
