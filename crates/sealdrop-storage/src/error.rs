use thiserror::Error;

use crate::store::BlobId;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(BlobId),

    #[error("invalid blob id: {0:?}")]
    InvalidId(String),

    #[error("storage backend: {0}")]
    Backend(#[from] opendal::Error),
}
