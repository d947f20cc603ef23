use keel_types::{Digest, MediaType};
use serde::{Deserialize, Serialize};

/// A manifest as held by the content store.
///
/// The store never interprets `payload`. `digest` is supplied by the writer
/// and names the canonical form, which for signed schema1 manifests differs
/// from the stored bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredManifest {
    pub digest: Digest,
    pub media_type: MediaType,
    pub payload: Vec<u8>,
}

impl StoredManifest {
    /// Create a stored manifest with an explicit digest.
    pub fn new(digest: Digest, media_type: MediaType, payload: Vec<u8>) -> Self {
        Self {
            digest,
            media_type,
            payload,
        }
    }

    /// Create a stored manifest addressed by the hash of `payload` itself.
    pub fn from_payload(media_type: MediaType, payload: Vec<u8>) -> Self {
        Self::new(Digest::from_bytes(&payload), media_type, payload)
    }

    /// Size of the stored payload in bytes.
    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// Size and type of a blob linked into a repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobDescriptor {
    pub digest: Digest,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl BlobDescriptor {
    pub fn new(digest: Digest, size: u64) -> Self {
        Self {
            digest,
            size,
            media_type: None,
        }
    }

    /// Builder-style media type setter.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}
