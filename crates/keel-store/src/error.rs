use keel_types::{Digest, RepositoryPath};

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The repository holds no manifest with this digest.
    #[error("unknown manifest revision {revision} in {repository}")]
    ManifestUnknownRevision {
        repository: RepositoryPath,
        revision: Digest,
    },

    /// The blob is not linked into the repository.
    #[error("blob unknown to registry: {0}")]
    BlobUnknown(Digest),

    /// The backend could not be reached or is in a bad state.
    #[error("content store unavailable: {0}")]
    Unavailable(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for [`StoreError::ManifestUnknownRevision`].
    pub fn is_unknown_revision(&self) -> bool {
        matches!(self, Self::ManifestUnknownRevision { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
