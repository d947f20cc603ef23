use keel_types::{Digest, MediaType, TypeError};

/// Errors from manifest decoding and metadata extraction.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The document is not valid JSON or does not match its schema.
    #[error("malformed manifest: {0}")]
    Json(#[from] serde_json::Error),

    /// A digest or name inside the document is invalid.
    #[error("invalid field: {0}")]
    Field(#[from] TypeError),

    /// The media type is not an image manifest this codec understands.
    #[error("unsupported manifest media type: {0}")]
    UnsupportedMediaType(MediaType),

    /// Manifest lists and OCI indexes are recognised but not accepted.
    #[error("manifest lists are not supported: {0}")]
    ManifestList(MediaType),

    /// `schemaVersion` does not match the media type.
    #[error("unsupported schema version {version} for {media_type}")]
    SchemaVersion { version: i64, media_type: MediaType },

    /// The JWS envelope of a signed schema1 manifest is unusable.
    #[error("invalid schema1 signature: {0}")]
    Signature(String),

    /// The record carries no manifest payload to reconstruct from.
    #[error("image {0} has no embedded manifest")]
    NoEmbeddedManifest(Digest),

    /// Decoded bytes do not hash to the expected digest.
    #[error("digest mismatch: expected {expected}, computed {computed}")]
    DigestMismatch { expected: Digest, computed: Digest },

    /// The image config blob is missing or unreadable.
    #[error("invalid image config: {0}")]
    Config(String),

    /// No size is known for a schema1 layer.
    #[error("size of layer {0} is unknown")]
    MissingLayerSize(Digest),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
