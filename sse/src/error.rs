//! Error types for the `sse` crate.
//!
//! Follows the same pattern as the other layers: a root `Error` struct holding an
//! error kind and an optional source for error chaining.

use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Kinds of errors that can occur while managing sessions or formatting events.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The registry has been closed for shutdown and accepts no new sessions.
    RegistryClosed,
    /// A session with the same identity is already registered.
    DuplicateSession,
    /// A payload could not be serialized into an event record.
    Serialization,
}

impl Error {
    pub fn new(error_kind: ErrorKind) -> Self {
        Self {
            source: None,
            error_kind,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "SSE Error: {:?} ({source})", self.error_kind),
            None => write!(f, "SSE Error: {:?}", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Serialization,
        }
    }
}
