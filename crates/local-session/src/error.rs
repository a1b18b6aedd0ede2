//! Error types for session store operations.

/// Broad category of an [`Error`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Options were rejected while constructing a cache.
    Config,
    /// A `set` call carried none of the recognised intent flags.
    UnresolvableIntent,
}

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The options value was not an object.
    #[error("options must be an object, invalid value provided")]
    InvalidOptions,

    /// A single option failed its type or range check.
    #[error("options.{field} {reason}")]
    InvalidOption {
        field: &'static str,
        reason: &'static str,
    },

    /// `set` could not decide between create, update and renew.
    #[error("Cannot resolve session")]
    UnresolvableSession,
}

impl Error {
    pub(crate) fn option(field: &'static str, reason: &'static str) -> Self {
        Self::InvalidOption { field, reason }
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidOptions | Self::InvalidOption { .. } => ErrorKind::Config,
            Self::UnresolvableSession => ErrorKind::UnresolvableIntent,
        }
    }

    /// Name of the offending option, when the error is tied to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidOption { field, .. } => Some(*field),
            _ => None,
        }
    }
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
