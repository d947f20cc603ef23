//! Derive catalog fields from a decoded manifest.

use std::collections::BTreeMap;

use keel_catalog::{ImageLayer, ImageMetadata, ImageRecord};
use keel_types::Digest;

use crate::descriptor::SCHEMA1_LAYER;
use crate::error::{CodecError, CodecResult};
use crate::manifest::Manifest;
use crate::schema2::ImageConfig;

/// Fill `record.metadata`, `record.layers` and `record.size` from `manifest`.
///
/// Schema2 and OCI manifests need the config blob in `config`; it is
/// verified against the config descriptor and embedded in the record.
/// Schema1 manifests read the top history entry and take layer sizes from
/// `layer_sizes`.
pub fn fill_image_metadata(
    manifest: &Manifest,
    record: &mut ImageRecord,
    config: Option<&[u8]>,
    layer_sizes: &BTreeMap<Digest, u64>,
) -> CodecResult<()> {
    if let Some(doc) = manifest.schema1() {
        let v1 = doc.v1_compatibility()?;
        let mut layers = Vec::new();
        for digest in doc.layers() {
            let size = *layer_sizes
                .get(&digest)
                .ok_or(CodecError::MissingLayerSize(digest))?;
            layers.push(ImageLayer {
                digest,
                size,
                media_type: SCHEMA1_LAYER.to_string(),
            });
        }
        let architecture = if v1.architecture.is_empty() {
            doc.architecture.clone()
        } else {
            v1.architecture.clone()
        };
        record.size = layers.iter().map(|l| l.size).sum();
        record.layers = layers;
        record.metadata = Some(ImageMetadata {
            id: v1.id.clone(),
            created: v1.created.clone(),
            architecture,
            os: v1.os.clone(),
            author: v1.author.clone(),
            labels: v1
                .config
                .and_then(|c| c.labels)
                .unwrap_or_default(),
        });
        return Ok(());
    }

    let descriptor = manifest
        .config()
        .ok_or_else(|| CodecError::Config("manifest has no config descriptor".into()))?;
    let bytes = config.ok_or_else(|| {
        CodecError::Config(format!("config blob {} not supplied", descriptor.digest))
    })?;
    let computed = Digest::from_bytes(bytes);
    if computed != descriptor.digest {
        return Err(CodecError::DigestMismatch {
            expected: descriptor.digest,
            computed,
        });
    }
    let image: ImageConfig = serde_json::from_slice(bytes)?;

    let layers: Vec<ImageLayer> = manifest
        .layers()
        .into_iter()
        .map(|l| ImageLayer {
            digest: l.digest,
            size: l.size,
            media_type: l.media_type,
        })
        .collect();
    record.size = descriptor.size + layers.iter().map(|l| l.size).sum::<u64>();
    record.layers = layers;
    record.config = Some(bytes.to_vec());
    record.metadata = Some(ImageMetadata {
        id: descriptor.digest.to_string(),
        created: image.created.clone(),
        architecture: image.architecture.clone(),
        os: image.os.clone(),
        author: image.author.clone(),
        labels: image.labels(),
    });
    tracing::trace!(digest = %manifest.digest(), layers = record.layers.len(), "image metadata filled");
    Ok(())
}
