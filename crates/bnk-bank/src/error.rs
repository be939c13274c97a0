use std::path::PathBuf;

use bnk_format::{FormatError, WemId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BankError {
    #[error(transparent)]
    Format(FormatError),

    #[error("unknown object id: {0}")]
    UnknownObjectId(WemId),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid operation: {0}")]
    InvalidState(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BankError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Human-readable error category for reports.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Format(FormatError::MalformedContainer { .. }) => "MalformedContainer",
            Self::Format(FormatError::MalformedIndex { .. }) => "MalformedIndex",
            Self::Format(FormatError::UnknownObjectId(_)) | Self::UnknownObjectId(_) => {
                "UnknownObjectId"
            }
            Self::Io { .. } => "IOFailure",
            Self::InvalidState(_) => "InvalidState",
            Self::Config(_) => "Config",
        }
    }
}

impl From<FormatError> for BankError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::UnknownObjectId(id) => Self::UnknownObjectId(id),
            other => Self::Format(other),
        }
    }
}

pub type BankResult<T> = Result<T, BankError>;
