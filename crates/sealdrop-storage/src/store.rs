//! Blob store contract and its OpenDAL implementation
//!
//! Layout: `{prefix}/blobs/{id}` where `id` is a canonical UUIDv4.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use opendal::{ErrorKind, Operator};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Identifier of one stored blob.
///
/// Only the canonical hyphenated lowercase UUID text is accepted, so an id
/// taken from a URL can never name a path outside the blob namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobId(Uuid);

impl BlobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> StorageResult<Self> {
        let uuid = Uuid::parse_str(s).map_err(|_| StorageError::InvalidId(s.to_string()))?;
        if uuid.hyphenated().to_string() != s {
            return Err(StorageError::InvalidId(s.to_string()));
        }
        Ok(Self(uuid))
    }
}

impl Default for BlobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for BlobId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Opaque byte store keyed by generated ids.
///
/// `put` followed by `get` on the returned id yields identical bytes.
pub trait BlobStore: Clone + Send + Sync + 'static {
    fn put(&self, bytes: Vec<u8>) -> impl Future<Output = StorageResult<BlobId>> + Send;

    fn get(&self, id: &BlobId) -> impl Future<Output = StorageResult<Vec<u8>>> + Send;

    /// Cheap reachability probe for readiness checks.
    fn check(&self) -> impl Future<Output = StorageResult<()>> + Send;
}

/// [`BlobStore`] over any OpenDAL operator.
#[derive(Clone)]
pub struct OpendalBlobStore {
    op: Operator,
    prefix: String,
}

impl OpendalBlobStore {
    pub fn new(op: Operator, prefix: &str) -> Self {
        Self {
            op,
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    /// In-memory store, for tests and throwaway instances.
    pub fn memory() -> StorageResult<Self> {
        let op = Operator::new(opendal::services::Memory::default())?.finish();
        Ok(Self::new(op, "sealdrop"))
    }

    fn path(&self, id: &BlobId) -> String {
        if self.prefix.is_empty() {
            format!("blobs/{id}")
        } else {
            format!("{}/blobs/{id}", self.prefix)
        }
    }
}

impl BlobStore for OpendalBlobStore {
    async fn put(&self, bytes: Vec<u8>) -> StorageResult<BlobId> {
        let id = BlobId::new();
        let len = bytes.len();
        self.op.write(&self.path(&id), bytes).await?;
        tracing::debug!(id = %id, bytes = len, "blob stored");
        Ok(id)
    }

    async fn get(&self, id: &BlobId) -> StorageResult<Vec<u8>> {
        match self.op.read(&self.path(id)).await {
            Ok(buf) => Ok(buf.to_vec()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(*id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn check(&self) -> StorageResult<()> {
        self.op.list("/").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_id_roundtrip() {
        let id = BlobId::new();
        let parsed = BlobId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_blob_id_rejects_non_canonical() {
        for bad in [
            "",
            "../../etc/passwd",
            "not-a-uuid",
            "67e55044-10b1-426f-9247-bb680e5fe0c8/../x",
            "67E55044-10B1-426F-9247-BB680E5FE0C8",
            "67e5504410b1426f9247bb680e5fe0c8",
            "{67e55044-10b1-426f-9247-bb680e5fe0c8}",
        ] {
            assert!(
                matches!(BlobId::parse(bad), Err(StorageError::InvalidId(_))),
                "{bad:?} must be rejected"
            );
        }
        assert!(BlobId::parse("67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
    }

    #[tokio::test]
    async fn test_memory_put_get_roundtrip() {
        let store = OpendalBlobStore::memory().unwrap();
        let blob = vec![0u8, 1, 2, 255, 254];

        let id = store.put(blob.clone()).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), blob);
    }

    #[tokio::test]
    async fn test_put_generates_distinct_ids() {
        let store = OpendalBlobStore::memory().unwrap();
        let a = store.put(b"a".to_vec()).await.unwrap();
        let b = store.put(b"a".to_vec()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = OpendalBlobStore::memory().unwrap();
        let id = BlobId::new();

        match store.get(&id).await {
            Err(StorageError::NotFound(missing)) => assert_eq!(missing, id),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fs_backend_layout() {
        let dir = tempfile::tempdir().unwrap();
        let op = Operator::new(
            opendal::services::Fs::default().root(dir.path().to_str().unwrap()),
        )
        .unwrap()
        .finish();
        let store = OpendalBlobStore::new(op, "/drops/");

        let id = store.put(b"ciphertext".to_vec()).await.unwrap();

        let on_disk = dir.path().join("drops").join("blobs").join(id.to_string());
        assert_eq!(std::fs::read(on_disk).unwrap(), b"ciphertext");
        assert_eq!(store.get(&id).await.unwrap(), b"ciphertext");
        assert!(store.check().await.is_ok());
    }
}
