use thiserror::Error;

use crate::types::PageId;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer pool exhausted")]
    BufferPoolExhausted,

    #[error("Invalid page id: {0}")]
    InvalidPageId(PageId),

    #[error("Invalid page size: {expected} bytes, got {actual} bytes")]
    InvalidPageSize { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
