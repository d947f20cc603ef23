//! Decoded manifests.
//!
//! A [`Manifest`] keeps the bytes it was decoded from, the canonical bytes
//! its digest is computed over, and the parsed document.

use std::collections::HashSet;

use keel_catalog::ImageRecord;
use keel_types::{Digest, MediaType};
use serde::de::IgnoredAny;
use serde::Deserialize;

use crate::descriptor::{Descriptor, SCHEMA1_LAYER};
use crate::error::{CodecError, CodecResult};
use crate::schema1::{signed_payload, Schema1Manifest};
use crate::schema2::ImageManifest;

/// Just enough of any manifest to pick a decoder.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Probe {
    #[serde(default)]
    schema_version: Option<i64>,
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    manifests: Option<IgnoredAny>,
    #[serde(default)]
    signatures: Option<IgnoredAny>,
}

#[derive(Clone, Debug, PartialEq)]
enum Document {
    Schema1(Schema1Manifest),
    Image(ImageManifest),
}

/// An immutable, decoded image manifest.
#[derive(Clone, Debug, PartialEq)]
pub struct Manifest {
    media_type: MediaType,
    payload: Vec<u8>,
    canonical: Vec<u8>,
    digest: Digest,
    document: Document,
}

impl Manifest {
    /// Decode raw bytes, detecting the media type from the document.
    pub fn decode(raw: &[u8]) -> CodecResult<Self> {
        Self::decode_with_media_type(raw, None)
    }

    /// Decode raw bytes. An explicit `media_type` wins over the document.
    pub fn decode_with_media_type(raw: &[u8], media_type: Option<&MediaType>) -> CodecResult<Self> {
        let probe: Probe = serde_json::from_slice(raw)?;
        let media_type = match media_type {
            Some(t) => t.clone(),
            None => detect(&probe)?,
        };

        let (canonical, document) = match &media_type {
            t if t.is_index() => return Err(CodecError::ManifestList(t.clone())),
            MediaType::Schema1 | MediaType::Schema1Signed => {
                let doc: Schema1Manifest = serde_json::from_slice(raw)?;
                check_version(doc.schema_version, 1, &media_type)?;
                let canonical = match doc.signatures.as_deref() {
                    Some(sigs) if !sigs.is_empty() => signed_payload(raw, sigs)?,
                    _ => raw.to_vec(),
                };
                (canonical, Document::Schema1(doc))
            }
            MediaType::Schema2 | MediaType::OciManifest => {
                let doc: ImageManifest = serde_json::from_slice(raw)?;
                check_version(doc.schema_version, 2, &media_type)?;
                (raw.to_vec(), Document::Image(doc))
            }
            other => return Err(CodecError::UnsupportedMediaType(other.clone())),
        };

        Ok(Self {
            digest: Digest::from_bytes(&canonical),
            media_type,
            payload: raw.to_vec(),
            canonical,
            document,
        })
    }

    /// Rebuild a manifest from the payload embedded in a catalog record.
    ///
    /// The decoded digest must match the record's.
    pub fn from_image(record: &ImageRecord) -> CodecResult<Self> {
        let payload = record
            .manifest
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(CodecError::NoEmbeddedManifest(record.digest))?;
        let hint = match &record.media_type {
            MediaType::Other(_) => None,
            t => Some(t),
        };
        let manifest = Self::decode_with_media_type(payload, hint)?;
        manifest.verify(&record.digest)?;
        Ok(manifest)
    }

    /// Fail unless this manifest's digest is `expected`.
    pub fn verify(&self, expected: &Digest) -> CodecResult<()> {
        if self.digest != *expected {
            return Err(CodecError::DigestMismatch {
                expected: *expected,
                computed: self.digest,
            });
        }
        Ok(())
    }

    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// The bytes the manifest was decoded from.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The bytes the digest is computed over.
    pub fn canonical(&self) -> &[u8] {
        &self.canonical
    }

    pub fn digest(&self) -> Digest {
        self.digest
    }

    /// Media type, stored payload and canonical bytes.
    pub fn payload_parts(&self) -> (&MediaType, &[u8], &[u8]) {
        (&self.media_type, &self.payload, &self.canonical)
    }

    pub fn is_schema1(&self) -> bool {
        matches!(self.document, Document::Schema1(_))
    }

    pub fn schema1(&self) -> Option<&Schema1Manifest> {
        match &self.document {
            Document::Schema1(doc) => Some(doc),
            Document::Image(_) => None,
        }
    }

    pub fn image(&self) -> Option<&ImageManifest> {
        match &self.document {
            Document::Image(doc) => Some(doc),
            Document::Schema1(_) => None,
        }
    }

    /// The config descriptor. Schema1 manifests have none.
    pub fn config(&self) -> Option<&Descriptor> {
        self.image().map(|doc| &doc.config)
    }

    /// Layer descriptors, base layer first.
    ///
    /// Schema1 layers carry no size; theirs is reported as zero.
    pub fn layers(&self) -> Vec<Descriptor> {
        match &self.document {
            Document::Image(doc) => doc.layers.clone(),
            Document::Schema1(doc) => doc
                .layers()
                .into_iter()
                .map(|d| Descriptor::new(SCHEMA1_LAYER, d, 0))
                .collect(),
        }
    }

    /// Descriptors of every referenced blob, config first, each digest once.
    pub fn blob_descriptors(&self) -> Vec<Descriptor> {
        let mut seen = HashSet::new();
        self.config()
            .cloned()
            .into_iter()
            .chain(self.layers())
            .filter(|d| seen.insert(d.digest))
            .collect()
    }

    /// Every blob the manifest references: config first, then layers.
    pub fn references(&self) -> Vec<Digest> {
        self.blob_descriptors().into_iter().map(|d| d.digest).collect()
    }
}

fn detect(probe: &Probe) -> CodecResult<MediaType> {
    if let Some(t) = &probe.media_type {
        return Ok(MediaType::parse(t));
    }
    if probe.manifests.is_some() {
        return Ok(MediaType::OciIndex);
    }
    match probe.schema_version {
        Some(1) if probe.signatures.is_some() => Ok(MediaType::Schema1Signed),
        Some(1) => Ok(MediaType::Schema1),
        Some(2) => Ok(MediaType::OciManifest),
        version => Err(CodecError::SchemaVersion {
            version: version.unwrap_or_default(),
            media_type: MediaType::Other(String::new()),
        }),
    }
}

fn check_version(version: i64, expected: i64, media_type: &MediaType) -> CodecResult<()> {
    if version != expected {
        return Err(CodecError::SchemaVersion {
            version,
            media_type: media_type.clone(),
        });
    }
    Ok(())
}
