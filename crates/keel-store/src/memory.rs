use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use keel_types::{Digest, RepositoryPath};

use crate::error::{StoreError, StoreResult};
use crate::object::{BlobDescriptor, StoredManifest};
use crate::traits::ContentStore;

#[derive(Default)]
struct StoreState {
    manifests: HashMap<(RepositoryPath, Digest), StoredManifest>,
    blobs: HashMap<Digest, Vec<u8>>,
    blob_links: HashSet<(RepositoryPath, Digest)>,
}

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. Blob data is shared across
/// repositories; manifests and blob links are per repository.
pub struct InMemoryContentStore {
    state: RwLock<StoreState>,
}

impl InMemoryContentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Number of manifest links across all repositories.
    pub fn manifest_count(&self) -> usize {
        self.state.read().expect("lock poisoned").manifests.len()
    }

    /// Number of distinct blobs held.
    pub fn blob_count(&self) -> usize {
        self.state.read().expect("lock poisoned").blobs.len()
    }

    /// Total bytes across all stored blobs.
    pub fn total_blob_bytes(&self) -> u64 {
        self.state
            .read()
            .expect("lock poisoned")
            .blobs
            .values()
            .map(|b| b.len() as u64)
            .sum()
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn key(repo: &RepositoryPath, digest: &Digest) -> (RepositoryPath, Digest) {
    (repo.clone(), *digest)
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn manifest_exists(&self, repo: &RepositoryPath, digest: &Digest) -> StoreResult<bool> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.manifests.contains_key(&key(repo, digest)))
    }

    async fn get_manifest(
        &self,
        repo: &RepositoryPath,
        digest: &Digest,
    ) -> StoreResult<StoredManifest> {
        let state = self.state.read().expect("lock poisoned");
        state
            .manifests
            .get(&key(repo, digest))
            .cloned()
            .ok_or_else(|| StoreError::ManifestUnknownRevision {
                repository: repo.clone(),
                revision: *digest,
            })
    }

    async fn put_manifest(
        &self,
        repo: &RepositoryPath,
        manifest: &StoredManifest,
    ) -> StoreResult<Digest> {
        let mut state = self.state.write().expect("lock poisoned");
        // Idempotent: the digest names the content.
        state
            .manifests
            .entry(key(repo, &manifest.digest))
            .or_insert_with(|| manifest.clone());
        tracing::trace!(repository = %repo, digest = %manifest.digest, "manifest linked");
        Ok(manifest.digest)
    }

    async fn delete_manifest(&self, repo: &RepositoryPath, digest: &Digest) -> StoreResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        match state.manifests.remove(&key(repo, digest)) {
            Some(_) => Ok(()),
            None => Err(StoreError::ManifestUnknownRevision {
                repository: repo.clone(),
                revision: *digest,
            }),
        }
    }

    async fn stat_blob(
        &self,
        repo: &RepositoryPath,
        digest: &Digest,
    ) -> StoreResult<BlobDescriptor> {
        let state = self.state.read().expect("lock poisoned");
        if !state.blob_links.contains(&key(repo, digest)) {
            return Err(StoreError::BlobUnknown(*digest));
        }
        let data = state
            .blobs
            .get(digest)
            .ok_or(StoreError::BlobUnknown(*digest))?;
        Ok(BlobDescriptor::new(*digest, data.len() as u64))
    }

    async fn get_blob(&self, repo: &RepositoryPath, digest: &Digest) -> StoreResult<Vec<u8>> {
        let state = self.state.read().expect("lock poisoned");
        if !state.blob_links.contains(&key(repo, digest)) {
            return Err(StoreError::BlobUnknown(*digest));
        }
        state
            .blobs
            .get(digest)
            .cloned()
            .ok_or(StoreError::BlobUnknown(*digest))
    }

    async fn put_blob(&self, repo: &RepositoryPath, data: &[u8]) -> StoreResult<Digest> {
        let digest = Digest::from_bytes(data);
        let mut state = self.state.write().expect("lock poisoned");
        state.blobs.entry(digest).or_insert_with(|| data.to_vec());
        state.blob_links.insert(key(repo, &digest));
        Ok(digest)
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("manifest_count", &self.manifest_count())
            .field("blob_count", &self.blob_count())
            .finish()
    }
}
