//! The [`MetadataCatalog`] trait defining the catalog client interface.

use async_trait::async_trait;
use keel_types::Digest;

use crate::error::CatalogResult;
use crate::models::{Collection, CollectionMapping, ImageRecord};

/// Client for the metadata catalog.
///
/// The catalog owns its own authorization, quota and persistence. Callers
/// treat every method as a remote call that can fail independently.
///
/// Implementations must:
/// - create an [`ImageRecord`] at most once per digest and never update it
/// - report a missing parent collection on `create_mapping` as
///   `NotFound { kind: Collection, name }` with the collection's name
/// - report quota exhaustion as `QuotaExceeded` on any write
/// - treat `create_collection` for an existing collection as success
#[async_trait]
pub trait MetadataCatalog: Send + Sync {
    /// Read the global image record for `digest`.
    async fn get_image(&self, digest: &Digest) -> CatalogResult<ImageRecord>;

    /// Read the image record for `digest` as published in `namespace/name`.
    ///
    /// Fails with `NotFound` if the collection is missing or the digest was
    /// never published into it, even when a global record exists.
    async fn get_collection_image(
        &self,
        namespace: &str,
        name: &str,
        digest: &Digest,
    ) -> CatalogResult<ImageRecord>;

    /// Read a collection.
    async fn get_collection(&self, namespace: &str, name: &str) -> CatalogResult<Collection>;

    /// Publish an image into a collection, optionally under a tag.
    async fn create_mapping(&self, mapping: &CollectionMapping) -> CatalogResult<()>;

    /// Create an empty collection.
    async fn create_collection(&self, namespace: &str, name: &str) -> CatalogResult<Collection>;
}
