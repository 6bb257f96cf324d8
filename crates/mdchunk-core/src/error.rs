//! Error taxonomy for the parsing and chunking core.
//!
//! Two kinds of failure cross this crate's boundary:
//!
//! | Kind | Raised when |
//! |------|-------------|
//! | [`ErrorKind::Configuration`] | `chunk_size`/`overlap` are out of contract |
//! | [`ErrorKind::Processing`] | an unregistered chunking method is requested, or input cannot be processed at all |
//!
//! Malformed frontmatter and oversized atomic elements are *not* errors;
//! they are absorbed where they occur and never reach this type.

use thiserror::Error;

/// Broad classification of a [`ChunkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Processing,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("invalid chunking configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown chunking strategy: {0}")]
    UnknownStrategy(String),

    #[error("processing failed: {0}")]
    Processing(String),
}

impl ChunkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChunkError::InvalidConfig(_) => ErrorKind::Configuration,
            ChunkError::UnknownStrategy(_) | ChunkError::Processing(_) => ErrorKind::Processing,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChunkError>;
