use thiserror::Error;
use std::io;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("index {id} out of range (limit {limit})")]
    IndexOutOfRange { id: u16, limit: u16 },
    #[error("corrupt node: {0}")]
    CorruptNode(String),
    #[error("page overflow: node needs {needed} bytes")]
    PageOverflow { needed: usize },
    #[error("page {0} not found")]
    PageNotFound(u64),
    #[error("page {0} is reachable from the published root")]
    PageInUse(u64),
    #[error("key of {0} bytes exceeds maximum key size")]
    KeyTooLarge(usize),
    #[error("value of {0} bytes exceeds maximum value size")]
    ValueTooLarge(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Coarse classification surfaced at the engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Corrupt or invalid storage; not retryable without higher-level recovery.
    InvalidStorage,
    Io,
}

impl DbError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DbError::Io(_) => ErrorCategory::Io,
            _ => ErrorCategory::InvalidStorage,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
