use alloc::string::String;

use thiserror::Error;

// -----------------------------------------------------------------------------
// SerialError

/// Errors raised while encoding or decoding a stream.
///
/// Inside a pass these propagate with `?`. The engine's top-level call
/// publishes each one exactly once as a
/// [`SerialEvent::Fault`](crate::events::SerialEvent::Fault).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SerialError {
    #[error("input ended early: {needed} bytes needed, {available} available")]
    IncompleteInput { needed: usize, available: usize },

    #[error("no usable constructor for type `{type_name}`")]
    ConstructionFailure { type_name: String },

    #[error("unresolved type: {detail}")]
    UnresolvedType { detail: String },

    #[error("no extension for type `{type_name}`: {cause}")]
    ExtensionResolution { type_name: String, cause: String },

    #[error("generic instantiation `{type_name}` is neither registered nor provably shareable")]
    AotUnsafeInstantiation { type_name: String },

    #[error("contract violation: {0}")]
    Misuse(String),

    #[error("malformed stream: {0}")]
    Malformed(String),

    #[error("section overrun: {declared} bytes declared, {consumed} consumed")]
    SectionOverrun { declared: usize, consumed: usize },

    #[error("payload nesting exceeds {0} levels")]
    DepthExceeded(usize),

    #[error("backend i/o failure: {0}")]
    Io(String),
}

/// Result alias used throughout the crate.
pub type SerialResult<T> = Result<T, SerialError>;

// -----------------------------------------------------------------------------
// FaultKind

/// Coarse classification of a [`SerialError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// The backend ran out of bytes.
    IncompleteInput,
    /// A decoded type could not be instantiated.
    ConstructionFailure,
    /// A type tag named no known type.
    UnresolvedType,
    /// The extension factory had no handler for a type.
    ExtensionResolution,
    /// Advisory only, never aborts a pass.
    AotUnsafeInstantiation,
    /// The API was used against its contract.
    Misuse,
    /// The stream content is inconsistent.
    Malformed,
    /// The backend itself failed.
    Io,
}

impl SerialError {
    /// Returns the [`FaultKind`] of this error.
    pub const fn kind(&self) -> FaultKind {
        match self {
            Self::IncompleteInput { .. } => FaultKind::IncompleteInput,
            Self::ConstructionFailure { .. } => FaultKind::ConstructionFailure,
            Self::UnresolvedType { .. } => FaultKind::UnresolvedType,
            Self::ExtensionResolution { .. } => FaultKind::ExtensionResolution,
            Self::AotUnsafeInstantiation { .. } => FaultKind::AotUnsafeInstantiation,
            Self::Misuse(_) => FaultKind::Misuse,
            Self::Malformed(_) | Self::SectionOverrun { .. } | Self::DepthExceeded(_) => {
                FaultKind::Malformed
            }
            Self::Io(_) => FaultKind::Io,
        }
    }

    /// Returns `true` if the stream simply ended before the payload did.
    ///
    /// Batch readers use this to tell a truncated tail from corruption.
    #[inline]
    pub const fn is_incomplete(&self) -> bool {
        matches!(self, Self::IncompleteInput { .. })
    }

    pub(crate) fn unresolved(detail: impl Into<String>) -> Self {
        Self::UnresolvedType {
            detail: detail.into(),
        }
    }

    pub(crate) fn misuse(detail: impl Into<String>) -> Self {
        Self::Misuse(detail.into())
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed(detail.into())
    }
}
