use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::TypeError;

/// The only algorithm prefix accepted by [`Digest`].
pub const SHA256_PREFIX: &str = "sha256:";

/// Content-addressed identifier for a manifest or blob.
///
/// A `Digest` is the SHA-256 hash of the canonical bytes of a document.
/// Identical content always produces the same `Digest`, so the content store
/// can deduplicate and verify what it holds. The textual form is
/// `sha256:<64 lowercase hex chars>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest([u8; 32]);

impl Digest {
    /// Compute the digest of raw bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Create a `Digest` from a pre-computed SHA-256 hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded hash without the algorithm prefix.
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 12 characters), as shown by image tools.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..6])
    }

    /// Returns `true` if `data` hashes to this digest.
    pub fn verify(&self, data: &[u8]) -> bool {
        Self::from_bytes(data) == *self
    }

    /// Parse from the `sha256:<hex>` form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let Some((algorithm, encoded)) = s.split_once(':') else {
            return Err(TypeError::InvalidDigest {
                digest: s.to_string(),
                reason: "missing algorithm prefix".into(),
            });
        };
        if algorithm != "sha256" {
            return Err(TypeError::UnsupportedAlgorithm(algorithm.to_string()));
        }
        if encoded.len() != 64 {
            return Err(TypeError::InvalidDigest {
                digest: s.to_string(),
                reason: format!("expected 64 hex characters, got {}", encoded.len()),
            });
        }
        if encoded.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(TypeError::InvalidDigest {
                digest: s.to_string(),
                reason: "hex must be lowercase".into(),
            });
        }
        let bytes = hex::decode(encoded).map_err(|e| TypeError::InvalidDigest {
            digest: s.to_string(),
            reason: e.to_string(),
        })?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SHA256_PREFIX}{}", self.hex())
    }
}

impl FromStr for Digest {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_string()
    }
}
