//! Error types shared across the core.

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::dialect::ParseError;
use crate::schema::SchemaViolation;

/// Errors surfaced by the store, the dialect pipeline and the change queue.
#[derive(Debug, Error)]
pub enum Error {
    /// The pattern file is missing or unreadable.
    #[error(
        "pattern file {} could not be read ({source}). Is the player running in the directory that holds it?",
        .path.display()
    )]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The pattern file (or its backup/temporary sibling) could not be written.
    #[error("cannot write {} ({source}). Check file permissions.", .path.display())]
    StorePermission {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The text does not follow the pattern dialect.
    #[error(transparent)]
    MalformedDialect(#[from] ParseError),

    /// The decoded record breaks a musical constraint.
    #[error(transparent)]
    SchemaViolation(#[from] SchemaViolation),

    /// The fallback mutation agent returned an error.
    #[error("fallback agent failed: {0}")]
    FallbackFailure(String),

    /// A delay too large to be represented as a wall-clock deadline.
    #[error("delay of {0} seconds is out of range")]
    InvalidDelay(u64),
}

/// Machine readable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    StoreUnavailable,
    StorePermission,
    MalformedDialect,
    SchemaViolation,
    FallbackFailure,
    InvalidRequest,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            Error::StorePermission { .. } => ErrorKind::StorePermission,
            Error::MalformedDialect(_) => ErrorKind::MalformedDialect,
            Error::SchemaViolation(_) => ErrorKind::SchemaViolation,
            Error::FallbackFailure(_) => ErrorKind::FallbackFailure,
            Error::InvalidDelay(_) => ErrorKind::InvalidRequest,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::StoreUnavailable => "store unavailable",
            ErrorKind::StorePermission => "store permission",
            ErrorKind::MalformedDialect => "malformed dialect",
            ErrorKind::SchemaViolation => "schema violation",
            ErrorKind::FallbackFailure => "fallback failure",
            ErrorKind::InvalidRequest => "invalid request",
        };
        f.write_str(name)
    }
}
