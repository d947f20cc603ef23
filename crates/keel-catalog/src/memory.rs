//! In-memory metadata catalog for testing and ephemeral use.
//!
//! [`InMemoryCatalog`] keeps image records and collections in maps behind a
//! `RwLock` and enforces [`CatalogQuota`] on every write.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use keel_types::{validate_namespace, validate_repository_name, validate_tag, Digest};

use crate::error::{CatalogError, CatalogResult, QuotaResource, ResourceKind};
use crate::models::{Collection, CollectionMapping, ImageRecord, TagEvent};
use crate::quota::CatalogQuota;
use crate::traits::MetadataCatalog;

#[derive(Default)]
struct CatalogState {
    images: HashMap<Digest, ImageRecord>,
    collections: BTreeMap<(String, String), Collection>,
}

impl CatalogState {
    fn collections_in<'a>(
        &'a self,
        namespace: &'a str,
    ) -> impl Iterator<Item = &'a Collection> + 'a {
        self.collections
            .values()
            .filter(move |c| c.namespace == namespace)
    }

    fn images_in(&self, namespace: &str) -> BTreeSet<Digest> {
        self.collections_in(namespace)
            .flat_map(|c| c.images.iter().copied())
            .collect()
    }
}

/// An in-memory implementation of [`MetadataCatalog`].
///
/// Data is lost when the catalog is dropped.
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
    quota: CatalogQuota,
}

impl InMemoryCatalog {
    /// Create an empty catalog with no quota.
    pub fn new() -> Self {
        Self::with_quota(CatalogQuota::unlimited())
    }

    /// Create an empty catalog enforcing `quota` per namespace.
    pub fn with_quota(quota: CatalogQuota) -> Self {
        Self {
            state: RwLock::new(CatalogState::default()),
            quota,
        }
    }

    /// The quota in force.
    pub fn quota(&self) -> &CatalogQuota {
        &self.quota
    }

    /// Store an image record directly, bypassing collections.
    ///
    /// Returns `false` if a record for the digest already existed; the
    /// existing record is left untouched.
    pub fn insert_image(&self, record: ImageRecord) -> CatalogResult<bool> {
        let mut state = self.write()?;
        if state.images.contains_key(&record.digest) {
            return Ok(false);
        }
        let mut record = record;
        record.created_at.get_or_insert_with(Utc::now);
        state.images.insert(record.digest, record);
        Ok(true)
    }

    /// Number of image records held.
    pub fn image_count(&self) -> usize {
        self.state
            .read()
            .map(|s| s.images.len())
            .unwrap_or_default()
    }

    /// Number of collections in `namespace`.
    pub fn collection_count(&self, namespace: &str) -> usize {
        self.state
            .read()
            .map(|s| s.collections_in(namespace).count())
            .unwrap_or_default()
    }

    fn read(&self) -> CatalogResult<std::sync::RwLockReadGuard<'_, CatalogState>> {
        self.state
            .read()
            .map_err(|e| CatalogError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> CatalogResult<std::sync::RwLockWriteGuard<'_, CatalogState>> {
        self.state
            .write()
            .map_err(|e| CatalogError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCatalog")
            .field("image_count", &self.image_count())
            .field("quota", &self.quota)
            .finish()
    }
}

fn validate_collection_name(namespace: &str, name: &str) -> CatalogResult<()> {
    validate_namespace(namespace).map_err(|e| CatalogError::Invalid(e.to_string()))?;
    validate_repository_name(name).map_err(|e| CatalogError::Invalid(e.to_string()))
}

#[async_trait]
impl MetadataCatalog for InMemoryCatalog {
    async fn get_image(&self, digest: &Digest) -> CatalogResult<ImageRecord> {
        let state = self.read()?;
        state
            .images
            .get(digest)
            .cloned()
            .ok_or_else(|| CatalogError::not_found(ResourceKind::Image, digest.to_string()))
    }

    async fn get_collection_image(
        &self,
        namespace: &str,
        name: &str,
        digest: &Digest,
    ) -> CatalogResult<ImageRecord> {
        let state = self.read()?;
        let collection = state
            .collections
            .get(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| CatalogError::not_found(ResourceKind::Collection, name))?;
        if !collection.contains(digest) {
            return Err(CatalogError::not_found(
                ResourceKind::CollectionImage,
                format!("{name}@{digest}"),
            ));
        }
        state
            .images
            .get(digest)
            .cloned()
            .ok_or_else(|| CatalogError::not_found(ResourceKind::Image, digest.to_string()))
    }

    async fn get_collection(&self, namespace: &str, name: &str) -> CatalogResult<Collection> {
        let state = self.read()?;
        state
            .collections
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| CatalogError::not_found(ResourceKind::Collection, name))
    }

    async fn create_mapping(&self, mapping: &CollectionMapping) -> CatalogResult<()> {
        validate_collection_name(&mapping.namespace, &mapping.name)?;
        if let Some(tag) = &mapping.tag {
            validate_tag(tag).map_err(|e| CatalogError::Invalid(e.to_string()))?;
        }

        let mut state = self.write()?;
        let key = (mapping.namespace.clone(), mapping.name.clone());
        if !state.collections.contains_key(&key) {
            return Err(CatalogError::not_found(
                ResourceKind::Collection,
                mapping.name.clone(),
            ));
        }

        let digest = mapping.image.digest;
        if let Some(limit) = self.quota.max_images {
            let images = state.images_in(&mapping.namespace);
            if !images.contains(&digest) && images.len() >= limit {
                return Err(CatalogError::QuotaExceeded {
                    namespace: mapping.namespace.clone(),
                    resource: QuotaResource::Images,
                    used: images.len(),
                    limit,
                });
            }
        }

        let now = Utc::now();
        if !state.images.contains_key(&digest) {
            let mut record = mapping.image.clone();
            record.created_at = Some(now);
            state.images.insert(digest, record);
        }

        let Some(collection) = state.collections.get_mut(&key) else {
            return Err(CatalogError::not_found(
                ResourceKind::Collection,
                mapping.name.clone(),
            ));
        };
        if !collection.contains(&digest) {
            collection.images.push(digest);
        }
        if let Some(tag) = &mapping.tag {
            let history = collection.tags.entry(tag.clone()).or_default();
            if history.last().map(|e| e.digest) != Some(digest) {
                history.push(TagEvent {
                    digest,
                    created_at: now,
                });
            }
        }

        tracing::debug!(
            namespace = %mapping.namespace,
            name = %mapping.name,
            tag = mapping.tag.as_deref().unwrap_or(""),
            %digest,
            "mapping created"
        );
        Ok(())
    }

    async fn create_collection(&self, namespace: &str, name: &str) -> CatalogResult<Collection> {
        validate_collection_name(namespace, name)?;

        let mut state = self.write()?;
        let key = (namespace.to_string(), name.to_string());
        if let Some(existing) = state.collections.get(&key) {
            return Ok(existing.clone());
        }

        if let Some(limit) = self.quota.max_collections {
            let used = state.collections_in(namespace).count();
            if used >= limit {
                return Err(CatalogError::QuotaExceeded {
                    namespace: namespace.to_string(),
                    resource: QuotaResource::Collections,
                    used,
                    limit,
                });
            }
        }

        let collection = Collection::new(namespace, name);
        state.collections.insert(key, collection.clone());
        tracing::debug!(namespace, name, uid = %collection.uid, "collection created");
        Ok(collection)
    }
}
