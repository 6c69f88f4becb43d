use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a mapping-origin metadata error.
    pub(crate) fn mapping(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Mapping, ErrorOrigin::Mapping, message)
    }

    /// Construct a signature-origin derivation error.
    pub(crate) fn unparsable_signature(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::UnparsableSignature,
            ErrorOrigin::Signature,
            message,
        )
    }

    /// Construct a session-origin detached-access error.
    pub(crate) fn detached(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Detached, ErrorOrigin::Session, message)
    }

    /// Construct a store-origin conflict error.
    pub(crate) fn store_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Conflict, ErrorOrigin::Store, message)
    }

    /// Construct a store-origin internal error.
    pub(crate) fn store_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Store, message)
    }

    /// Construct a store-origin invariant violation.
    pub(crate) fn store_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Store, message)
    }

    /// Construct a session-origin unsupported error.
    pub(crate) fn session_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Session, message)
    }

    pub fn store_not_found(key: impl Into<String>) -> Self {
        let key = key.into();

        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Store,
            format!("row key not found: {key}"),
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.class, ErrorClass::Conflict)
    }

    #[must_use]
    pub const fn is_detached(&self) -> bool {
        matches!(self.class, ErrorClass::Detached)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Optimistic or lock conflict detected against storage.
    Conflict,
    /// Access through a handle that is no longer managed by a unit of work.
    Detached,
    Internal,
    InvariantViolation,
    /// Bad static metadata; fatal at startup.
    Mapping,
    NotFound,
    /// Derived-method signature the engine cannot decompose; fatal at startup.
    UnparsableSignature,
    Unsupported,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Conflict => "conflict",
            Self::Detached => "detached",
            Self::Internal => "internal",
            Self::InvariantViolation => "invariant_violation",
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
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Mapping,
    Session,
    Signature,
    Store,
    Tracker,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Mapping => "mapping",
            Self::Session => "session",
            Self::Signature => "signature",
            Self::Store => "store",
            Self::Tracker => "tracker",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
