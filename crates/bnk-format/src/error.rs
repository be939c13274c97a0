use thiserror::Error;

use crate::index::WemId;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("malformed container at offset {offset}: {reason}")]
    MalformedContainer { offset: u64, reason: String },

    #[error("malformed object index: {reason}")]
    MalformedIndex { reason: String },

    #[error("unknown object id: {0}")]
    UnknownObjectId(WemId),
}

impl FormatError {
    pub(crate) fn container(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedContainer {
            offset: offset as u64,
            reason: reason.into(),
        }
    }

    pub(crate) fn index(reason: impl Into<String>) -> Self {
        Self::MalformedIndex {
            reason: reason.into(),
        }
    }
}

pub type FormatResult<T> = Result<T, FormatError>;
