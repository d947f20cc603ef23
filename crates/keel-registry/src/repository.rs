//! Per-request repository context.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use keel_catalog::{ImageRecord, MetadataCatalog};
use keel_codec::{Descriptor, Manifest};
use keel_store::{ContentStore, StoreError};
use keel_types::{Digest, ImageReference, RepositoryPath};

use crate::cache::LayerCache;
use crate::error::{RegistryError, RegistryResult};

/// One repository as seen by a single request: its path, the registry
/// address, the two stores and the shared layer cache.
#[derive(Clone)]
pub struct Repository {
    path: RepositoryPath,
    registry_addr: String,
    store: Arc<dyn ContentStore>,
    catalog: Arc<dyn MetadataCatalog>,
    user_catalog: Option<Arc<dyn MetadataCatalog>>,
    cache: Arc<LayerCache>,
}

impl Repository {
    pub fn new(
        path: RepositoryPath,
        registry_addr: impl Into<String>,
        store: Arc<dyn ContentStore>,
        catalog: Arc<dyn MetadataCatalog>,
        cache: Arc<LayerCache>,
    ) -> Self {
        Self {
            path,
            registry_addr: registry_addr.into(),
            store,
            catalog,
            user_catalog: None,
            cache,
        }
    }

    /// Attach the requesting user's catalog client, used to provision
    /// missing collections.
    pub fn with_user_catalog(mut self, catalog: Arc<dyn MetadataCatalog>) -> Self {
        self.user_catalog = Some(catalog);
        self
    }

    pub fn path(&self) -> &RepositoryPath {
        &self.path
    }

    pub fn namespace(&self) -> &str {
        self.path.namespace()
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn registry_addr(&self) -> &str {
        &self.registry_addr
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    pub fn catalog(&self) -> &dyn MetadataCatalog {
        self.catalog.as_ref()
    }

    pub fn user_catalog(&self) -> Option<&dyn MetadataCatalog> {
        self.user_catalog.as_deref()
    }

    pub fn cache(&self) -> &LayerCache {
        &self.cache
    }

    /// Pull spec recorded for a manifest pushed here.
    pub fn pull_spec(&self, digest: &Digest) -> String {
        format!(
            "{}/{}/{}@{}",
            self.registry_addr,
            self.namespace(),
            self.name(),
            digest
        )
    }

    /// Reference naming this repository in the local store.
    pub fn local_reference(&self) -> ImageReference {
        ImageReference::repository("", self.namespace(), self.name())
    }

    /// Reference labelling where `image`'s layers live.
    ///
    /// Managed images resolve to the local store; anything else to the
    /// remote repository with docker client defaults applied.
    pub fn reference_for(&self, image: &ImageRecord) -> ImageReference {
        if image.is_managed() {
            self.local_reference()
        } else {
            ImageReference::repository(&self.registry_addr, self.namespace(), self.name())
                .docker_client_defaults()
                .as_repository()
        }
    }

    /// Read the catalog record of `digest` as published in this repository.
    pub async fn get_image(&self, digest: &Digest) -> RegistryResult<ImageRecord> {
        match self
            .catalog
            .get_collection_image(self.namespace(), self.name(), digest)
            .await
        {
            Ok(image) => Ok(image),
            Err(e) if e.is_not_found() => Err(RegistryError::RecordNotFound {
                repository: self.path.to_string(),
                revision: *digest,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Check that every blob `manifest` references is linked here.
    ///
    /// Blobs the cache already confirms are not looked up again. Returns
    /// the size of every referenced blob.
    pub async fn verify_references(&self, manifest: &Manifest) -> RegistryResult<BTreeMap<Digest, u64>> {
        let cache_name = self.local_reference().exact();
        let mut sizes = BTreeMap::new();
        let mut missing = Vec::new();

        for descriptor in manifest.blob_descriptors() {
            if let Some(cached) = self.cache.descriptor(&descriptor.digest, &cache_name) {
                sizes.insert(cached.digest, cached.size);
                continue;
            }
            match self.store.stat_blob(&self.path, &descriptor.digest).await {
                Ok(stat) => {
                    sizes.insert(stat.digest, stat.size);
                    self.cache.remember(
                        Descriptor::new(descriptor.media_type, stat.digest, stat.size),
                        &cache_name,
                    );
                }
                Err(StoreError::BlobUnknown(digest)) => missing.push(digest),
                Err(e) => return Err(e.into()),
            }
        }

        if !missing.is_empty() {
            return Err(RegistryError::VerificationFailed { missing });
        }
        Ok(sizes)
    }

    /// Remember `manifest` and its blobs under `cache_name`.
    pub fn remember_layers_of_manifest(&self, digest: Digest, manifest: &Manifest, cache_name: &str) {
        self.cache.remember_manifest(digest, manifest, cache_name);
    }

    /// Rebuild a manifest from the payload embedded in `image` and remember
    /// the record's layers under `cache_name`.
    ///
    /// Blob existence is not checked.
    pub fn manifest_from_image_with_cached_layers(
        &self,
        image: &ImageRecord,
        cache_name: &str,
    ) -> RegistryResult<Manifest> {
        let manifest = Manifest::from_image(image)?;
        self.cache.remember_digest(image.digest, cache_name);
        for layer in &image.layers {
            self.cache.remember(
                Descriptor::new(layer.media_type.clone(), layer.digest, layer.size),
                cache_name,
            );
        }
        if let Some(config) = manifest.config() {
            self.cache.remember(config.clone(), cache_name);
        }
        Ok(manifest)
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .field("registry_addr", &self.registry_addr)
            .field("user_catalog", &self.user_catalog.is_some())
            .finish()
    }
}
