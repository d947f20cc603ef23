//! Catalog record types.
//!
//! An [`ImageRecord`] is created once per digest and never updated. A
//! [`CollectionMapping`] is the write that publishes an image into a
//! [`Collection`], optionally under a tag.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use keel_types::{Digest, MediaType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Annotation marking an image as pushed to (and managed by) this registry.
pub const MANAGED_ANNOTATION: &str = "keel.io/image.managed";

/// Metadata catalog entity for one manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Manifest digest; also the record's name.
    pub digest: Digest,
    /// Pull spec, `registry/namespace/name@digest`.
    pub docker_image_reference: String,
    /// Media type of the manifest.
    pub media_type: MediaType,
    /// Embedded manifest payload. Kept only as a read fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Vec<u8>>,
    /// Embedded image config blob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Vec<u8>>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Summary derived from the config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
    /// Layers in base-to-top order.
    #[serde(default)]
    pub layers: Vec<ImageLayer>,
    /// Total size of config and layers.
    #[serde(default)]
    pub size: u64,
    /// Set by the catalog when the record is stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ImageRecord {
    /// A bare record for `digest`.
    pub fn new(digest: Digest, docker_image_reference: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            digest,
            docker_image_reference: docker_image_reference.into(),
            media_type,
            manifest: None,
            config: None,
            annotations: BTreeMap::new(),
            metadata: None,
            layers: Vec::new(),
            size: 0,
            created_at: None,
        }
    }

    /// Builder-style annotation setter.
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Mark the record as managed by this registry.
    pub fn managed(self) -> Self {
        self.with_annotation(MANAGED_ANNOTATION, "true")
    }

    /// Builder-style embedded payload setter.
    pub fn with_manifest(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.manifest = Some(payload.into());
        self
    }

    /// Returns `true` if the image was pushed to this registry rather than
    /// imported from a remote one.
    pub fn is_managed(&self) -> bool {
        self.annotations
            .get(MANAGED_ANNOTATION)
            .is_some_and(|v| v == "true")
    }

    /// Returns `true` if a non-empty manifest payload is embedded.
    pub fn has_embedded_manifest(&self) -> bool {
        self.manifest.as_ref().is_some_and(|m| !m.is_empty())
    }

    /// Drop the embedded manifest and config.
    pub fn strip_payload(&mut self) {
        self.manifest = None;
        self.config = None;
    }
}

/// Summary of an image config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Config digest (schema2/OCI) or v1 image id (schema1).
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// One layer of an image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLayer {
    pub digest: Digest,
    pub size: u64,
    pub media_type: String,
}

/// A single entry in a tag's history, newest last.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEvent {
    pub digest: Digest,
    pub created_at: DateTime<Utc>,
}

/// A repository-level container of images and tags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub uid: Uuid,
    pub namespace: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Digests published into this collection, in publication order.
    #[serde(default)]
    pub images: Vec<Digest>,
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<TagEvent>>,
}

impl Collection {
    /// A new empty collection.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: Uuid::now_v7(),
            namespace: namespace.into(),
            name: name.into(),
            created_at: Utc::now(),
            images: Vec::new(),
            tags: BTreeMap::new(),
        }
    }

    /// Digest the tag currently points at.
    pub fn resolve_tag(&self, tag: &str) -> Option<&Digest> {
        self.tags.get(tag).and_then(|h| h.last()).map(|e| &e.digest)
    }

    /// Returns `true` if `digest` was published into this collection.
    pub fn contains(&self, digest: &Digest) -> bool {
        self.images.contains(digest)
    }
}

/// Publication of an image into a collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMapping {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub image: ImageRecord,
}

impl CollectionMapping {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, image: ImageRecord) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            tag: None,
            image,
        }
    }
}
