use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no documents found: {0}")]
    NoDocumentsFound(String),

    #[error("documents produced no content: {0}")]
    NoContent(String),

    #[error("cannot build an index from an empty list of chunks")]
    EmptyInput,

    #[error("index contains no entries")]
    EmptyIndex,

    #[error("no index found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("corrupt index at {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    /// Timeouts, rate limits, 5xx and connection failures. Safe to retry.
    #[error("transient provider failure: {0}")]
    Transient(String),

    #[error("provider rejected credentials: {0}")]
    Auth(String),

    #[error("provider quota exhausted: {0}")]
    Quota(String),

    /// Any other permanent provider failure (bad request, malformed response).
    #[error("provider error: {0}")]
    Provider(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable names for each failure class, printed by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoDocumentsFound,
    NoContent,
    EmptyInput,
    EmptyIndex,
    NotFound,
    CorruptIndex,
    Transient,
    Auth,
    Quota,
    Provider,
    DimensionMismatch,
    InvalidConfig,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NoDocumentsFound => "NoDocumentsFoundError",
            ErrorKind::NoContent => "NoContentError",
            ErrorKind::EmptyInput => "EmptyInputError",
            ErrorKind::EmptyIndex => "EmptyIndexError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::CorruptIndex => "CorruptIndexError",
            ErrorKind::Transient => "TransientError",
            ErrorKind::Auth => "AuthError",
            ErrorKind::Quota => "QuotaError",
            ErrorKind::Provider => "ProviderError",
            ErrorKind::DimensionMismatch => "DimensionMismatchError",
            ErrorKind::InvalidConfig => "InvalidConfigError",
            ErrorKind::Io => "IoError",
        };
        f.write_str(name)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoDocumentsFound(_) => ErrorKind::NoDocumentsFound,
            Error::NoContent(_) => ErrorKind::NoContent,
            Error::EmptyInput => ErrorKind::EmptyInput,
            Error::EmptyIndex => ErrorKind::EmptyIndex,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::CorruptIndex { .. } => ErrorKind::CorruptIndex,
            Error::Transient(_) => ErrorKind::Transient,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Quota(_) => ErrorKind::Quota,
            Error::Provider(_) => ErrorKind::Provider,
            Error::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient(_))
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptIndex { path: path.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
