//! sealdrop-storage: id-addressed blob store over OpenDAL
//!
//! The store never looks inside a blob. It hands out a fresh [`BlobId`] on
//! `put` and returns the exact bytes on `get`.

pub mod error;
pub mod operator;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use operator::{build_operator, S3Credentials};
pub use store::{BlobId, BlobStore, OpendalBlobStore};
