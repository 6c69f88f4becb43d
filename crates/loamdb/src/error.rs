use loamdb_core::error::{ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.kind, ErrorKind::Conflict)
    }

    #[must_use]
    pub const fn is_detached(&self) -> bool {
        matches!(self.kind, ErrorKind::Detached)
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let kind = match err.class {
            ErrorClass::Conflict => ErrorKind::Conflict,
            ErrorClass::Detached => ErrorKind::Detached,
            ErrorClass::Mapping => ErrorKind::Mapping,
            ErrorClass::NotFound => ErrorKind::NotFound,
            ErrorClass::UnparsableSignature => ErrorKind::UnparsableSignature,
            ErrorClass::Unsupported => ErrorKind::Unsupported,
            ErrorClass::Internal | ErrorClass::InvariantViolation => ErrorKind::Internal,
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Conflict,
    Detached,
    Internal,
    Mapping,
    NotFound,
    UnparsableSignature,
    Unsupported,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Conflict => "conflict",
            Self::Detached => "detached",
            Self::Internal => "internal",
            Self::Mapping => "mapping",
            Self::NotFound => "not_found",
            Self::UnparsableSignature => "unparsable_signature",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Mapping,
    Session,
    Signature,
    Store,
    Tracker,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Mapping => Self::Mapping,
            CoreErrorOrigin::Session => Self::Session,
            CoreErrorOrigin::Signature => Self::Signature,
            CoreErrorOrigin::Store => Self::Store,
            CoreErrorOrigin::Tracker => Self::Tracker,
        }
    }
}

///
/// TESTS
///
