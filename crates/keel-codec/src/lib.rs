//! Manifest codec for Keel.
//!
//! Decodes raw manifest bytes into a [`Manifest`]: media type, canonical
//! bytes, digest, and referenced blobs. Decoding is pure and deterministic.
//!
//! Supported documents:
//!
//! - Docker schema1, unsigned and JWS-signed ([`schema1`])
//! - Docker schema2 and OCI image manifests ([`schema2`])
//!
//! Manifest lists and OCI indexes are recognised and rejected.
//!
//! [`fill_image_metadata`] derives the catalog's layer and config summary
//! for an [`ImageRecord`](keel_catalog::ImageRecord).

pub mod descriptor;
pub mod error;
pub mod manifest;
pub mod metadata;
pub mod schema1;
pub mod schema2;

pub use descriptor::{Descriptor, SCHEMA1_LAYER};
pub use error::{CodecError, CodecResult};
pub use manifest::Manifest;
pub use metadata::fill_image_metadata;
pub use schema1::Schema1Manifest;
pub use schema2::{ImageConfig, ImageManifest};
