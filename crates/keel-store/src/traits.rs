use async_trait::async_trait;
use keel_types::{Digest, RepositoryPath};

use crate::error::StoreResult;
use crate::object::{BlobDescriptor, StoredManifest};

/// Repository-scoped content store.
///
/// All implementations must satisfy these invariants:
/// - Manifests and blobs are immutable once written. Writing the same digest
///   twice is a no-op that returns the same digest.
/// - Every operation is scoped to a repository: content linked into one
///   repository is invisible from another, even if the bytes are shared.
/// - The store never interprets manifest or blob contents.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Check whether the repository links a manifest with this digest.
    async fn manifest_exists(&self, repo: &RepositoryPath, digest: &Digest) -> StoreResult<bool>;

    /// Read a manifest.
    ///
    /// Fails with `ManifestUnknownRevision` if the repository does not link it.
    async fn get_manifest(
        &self,
        repo: &RepositoryPath,
        digest: &Digest,
    ) -> StoreResult<StoredManifest>;

    /// Write a manifest and link it into the repository.
    async fn put_manifest(
        &self,
        repo: &RepositoryPath,
        manifest: &StoredManifest,
    ) -> StoreResult<Digest>;

    /// Unlink a manifest from the repository.
    async fn delete_manifest(&self, repo: &RepositoryPath, digest: &Digest) -> StoreResult<()>;

    /// Describe a blob linked into the repository.
    ///
    /// Fails with `BlobUnknown` if it is not linked.
    async fn stat_blob(&self, repo: &RepositoryPath, digest: &Digest)
        -> StoreResult<BlobDescriptor>;

    /// Read a blob linked into the repository.
    async fn get_blob(&self, repo: &RepositoryPath, digest: &Digest) -> StoreResult<Vec<u8>>;

    /// Write a blob, link it into the repository and return its digest.
    async fn put_blob(&self, repo: &RepositoryPath, data: &[u8]) -> StoreResult<Digest>;
}
