//! Metadata catalog client for Keel.
//!
//! The catalog tracks which manifests are published into which repository
//! collections, under which tags, and enforces per-namespace quota. Keel
//! treats it as an external service; this crate defines the client seam and
//! an in-memory implementation.
//!
//! # Modules
//!
//! - [`error`] -- structured [`CatalogError`] with resource kinds
//! - [`models`] -- [`ImageRecord`], [`Collection`], [`CollectionMapping`]
//! - [`traits`] -- the [`MetadataCatalog`] trait
//! - [`quota`] -- [`CatalogQuota`] limits
//! - [`memory`] -- [`InMemoryCatalog`] for tests and embedding

pub mod error;
pub mod memory;
pub mod models;
pub mod quota;
pub mod traits;

pub use error::{CatalogError, CatalogResult, QuotaResource, ResourceKind};
pub use memory::InMemoryCatalog;
pub use models::{
    Collection, CollectionMapping, ImageLayer, ImageMetadata, ImageRecord, TagEvent,
    MANAGED_ANNOTATION,
};
pub use quota::CatalogQuota;
pub use traits::MetadataCatalog;
