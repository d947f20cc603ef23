use keel_catalog::CatalogError;
use keel_codec::CodecError;
use keel_store::StoreError;
use keel_types::Digest;
use thiserror::Error;

/// Errors surfaced by the manifest service.
///
/// Collaborator failures that are not reclassified are carried unchanged in
/// the `Store`, `Catalog` and `Codec` variants.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The manifest could not be decoded or is refused by policy.
    #[error("manifest invalid: {0}")]
    ManifestInvalid(String),

    /// Referenced blobs are not present in the repository.
    #[error("manifest verification failed: unknown blobs [{}]", join_digests(missing))]
    VerificationFailed { missing: Vec<Digest> },

    /// Neither the content store nor the catalog record can produce the manifest.
    #[error("unknown manifest revision {revision} in {repository}")]
    ManifestUnknownRevision { repository: String, revision: Digest },

    /// The catalog has no record of the manifest in this repository.
    #[error("image {revision} not found in {repository}")]
    RecordNotFound { repository: String, revision: Digest },

    /// A catalog write was refused for quota reasons.
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// Returns `true` when callers should treat the manifest as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ManifestUnknownRevision { .. } | Self::RecordNotFound { .. }
        )
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

fn join_digests(digests: &[Digest]) -> String {
    digests
        .iter()
        .map(Digest::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
