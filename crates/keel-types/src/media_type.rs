use std::fmt;

use serde::{Deserialize, Serialize};

pub const SCHEMA1: &str = "application/vnd.docker.distribution.manifest.v1+json";
pub const SCHEMA1_SIGNED: &str = "application/vnd.docker.distribution.manifest.v1+prettyjws";
pub const SCHEMA2: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const MANIFEST_LIST: &str = "application/vnd.docker.distribution.manifest.list.v2+json";
pub const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";

/// Manifest schema variant tag.
///
/// Unknown media types are preserved verbatim in [`MediaType::Other`] so a
/// record written by a newer producer can still be carried around.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MediaType {
    Schema1,
    Schema1Signed,
    Schema2,
    ManifestList,
    OciManifest,
    OciIndex,
    Other(String),
}

impl MediaType {
    /// Parse a media type string. Parameters after `;` are ignored.
    pub fn parse(s: &str) -> Self {
        let base = s.split(';').next().unwrap_or_default().trim();
        match base {
            SCHEMA1 => Self::Schema1,
            SCHEMA1_SIGNED => Self::Schema1Signed,
            SCHEMA2 => Self::Schema2,
            MANIFEST_LIST => Self::ManifestList,
            OCI_MANIFEST => Self::OciManifest,
            OCI_INDEX => Self::OciIndex,
            other => Self::Other(other.to_string()),
        }
    }

    /// The canonical media type string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Schema1 => SCHEMA1,
            Self::Schema1Signed => SCHEMA1_SIGNED,
            Self::Schema2 => SCHEMA2,
            Self::ManifestList => MANIFEST_LIST,
            Self::OciManifest => OCI_MANIFEST,
            Self::OciIndex => OCI_INDEX,
            Self::Other(s) => s,
        }
    }

    /// Returns `true` for both schema1 variants.
    pub fn is_schema1(&self) -> bool {
        matches!(self, Self::Schema1 | Self::Schema1Signed)
    }

    /// Returns `true` for multi-platform index documents.
    pub fn is_index(&self) -> bool {
        matches!(self, Self::ManifestList | Self::OciIndex)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for MediaType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<MediaType> for String {
    fn from(value: MediaType) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_types() {
        assert_eq!(MediaType::parse(SCHEMA2), MediaType::Schema2);
        assert_eq!(MediaType::parse(SCHEMA1_SIGNED), MediaType::Schema1Signed);
        assert_eq!(MediaType::parse(OCI_MANIFEST), MediaType::OciManifest);
    }

    #[test]
    fn parse_ignores_parameters() {
        let mt = MediaType::parse("application/vnd.oci.image.manifest.v1+json; charset=utf-8");
        assert_eq!(mt, MediaType::OciManifest);
    }

    #[test]
    fn unknown_type_is_preserved() {
        let mt = MediaType::parse("application/x-custom");
        assert_eq!(mt.as_str(), "application/x-custom");
    }

    #[test]
    fn classification_helpers() {
        assert!(MediaType::Schema1.is_schema1());
        assert!(MediaType::Schema1Signed.is_schema1());
        assert!(!MediaType::Schema2.is_schema1());
        assert!(MediaType::OciIndex.is_index());
        assert!(MediaType::ManifestList.is_index());
    }

    #[test]
    fn serde_roundtrip_via_string() {
        let json = serde_json::to_string(&MediaType::Schema2).unwrap();
        assert_eq!(json, format!("\"{SCHEMA2}\""));
        let back: MediaType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MediaType::Schema2);
    }
}
