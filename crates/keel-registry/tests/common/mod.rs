//! Collaborator doubles for manifest service tests.
//!
//! Both doubles wrap the in-memory backends, count calls, and can be told
//! to fail upcoming calls.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use keel_catalog::{
    CatalogError, CatalogQuota, CatalogResult, Collection, CollectionMapping, ImageRecord,
    InMemoryCatalog, MetadataCatalog, QuotaResource, ResourceKind,
};
use keel_registry::{LayerCache, ManifestService, RegistryConfig, Repository};
use keel_store::{
    BlobDescriptor, ContentStore, InMemoryContentStore, StoreError, StoreResult, StoredManifest,
};
use keel_types::{Digest, RepositoryPath};

pub const NAMESPACE: &str = "team";
pub const NAME: &str = "app";

// ---------------------------------------------------------------------------
// Catalog double
// ---------------------------------------------------------------------------

/// Catalog client over a shared [`InMemoryCatalog`] with scripted failures.
pub struct ScriptedCatalog {
    inner: Arc<InMemoryCatalog>,
    mapping_faults: Mutex<VecDeque<CatalogError>>,
    collection_faults: Mutex<VecDeque<CatalogError>>,
    read_faults: Mutex<VecDeque<CatalogError>>,
    pub mapping_calls: AtomicUsize,
    pub collection_calls: AtomicUsize,
    pub read_calls: AtomicUsize,
}

impl ScriptedCatalog {
    pub fn new(inner: Arc<InMemoryCatalog>) -> Self {
        Self {
            inner,
            mapping_faults: Mutex::new(VecDeque::new()),
            collection_faults: Mutex::new(VecDeque::new()),
            read_faults: Mutex::new(VecDeque::new()),
            mapping_calls: AtomicUsize::new(0),
            collection_calls: AtomicUsize::new(0),
            read_calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &InMemoryCatalog {
        &self.inner
    }

    /// Fail the next `create_mapping` call with `err`.
    pub fn fail_mapping(&self, err: CatalogError) {
        self.mapping_faults.lock().unwrap().push_back(err);
    }

    /// Fail the next `create_collection` call with `err`.
    pub fn fail_collection(&self, err: CatalogError) {
        self.collection_faults.lock().unwrap().push_back(err);
    }

    /// Fail the next read with `err`.
    pub fn fail_read(&self, err: CatalogError) {
        self.read_faults.lock().unwrap().push_back(err);
    }

    pub fn mappings(&self) -> usize {
        self.mapping_calls.load(Ordering::SeqCst)
    }

    pub fn collections(&self) -> usize {
        self.collection_calls.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    fn next(faults: &Mutex<VecDeque<CatalogError>>) -> CatalogResult<()> {
        match faults.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MetadataCatalog for ScriptedCatalog {
    async fn get_image(&self, digest: &Digest) -> CatalogResult<ImageRecord> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.read_faults)?;
        self.inner.get_image(digest).await
    }

    async fn get_collection_image(
        &self,
        namespace: &str,
        name: &str,
        digest: &Digest,
    ) -> CatalogResult<ImageRecord> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.read_faults)?;
        self.inner.get_collection_image(namespace, name, digest).await
    }

    async fn get_collection(&self, namespace: &str, name: &str) -> CatalogResult<Collection> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.read_faults)?;
        self.inner.get_collection(namespace, name).await
    }

    async fn create_mapping(&self, mapping: &CollectionMapping) -> CatalogResult<()> {
        self.mapping_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.mapping_faults)?;
        self.inner.create_mapping(mapping).await
    }

    async fn create_collection(&self, namespace: &str, name: &str) -> CatalogResult<Collection> {
        self.collection_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.collection_faults)?;
        self.inner.create_collection(namespace, name).await
    }
}

pub fn quota_error(resource: QuotaResource) -> CatalogError {
    CatalogError::QuotaExceeded {
        namespace: NAMESPACE.into(),
        resource,
        used: 1,
        limit: 1,
    }
}

pub fn collection_not_found() -> CatalogError {
    CatalogError::not_found(ResourceKind::Collection, NAME)
}

// ---------------------------------------------------------------------------
// Content store double
// ---------------------------------------------------------------------------

/// Content store over [`InMemoryContentStore`] with call counters.
pub struct CountingStore {
    inner: InMemoryContentStore,
    get_faults: Mutex<VecDeque<StoreError>>,
    put_faults: Mutex<VecDeque<StoreError>>,
    pub manifest_puts: AtomicUsize,
    pub manifest_gets: AtomicUsize,
    pub blob_stats: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryContentStore::new(),
            get_faults: Mutex::new(VecDeque::new()),
            put_faults: Mutex::new(VecDeque::new()),
            manifest_puts: AtomicUsize::new(0),
            manifest_gets: AtomicUsize::new(0),
            blob_stats: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &InMemoryContentStore {
        &self.inner
    }

    pub fn fail_get(&self, err: StoreError) {
        self.get_faults.lock().unwrap().push_back(err);
    }

    pub fn fail_put(&self, err: StoreError) {
        self.put_faults.lock().unwrap().push_back(err);
    }

    pub fn puts(&self) -> usize {
        self.manifest_puts.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.manifest_gets.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> usize {
        self.blob_stats.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for CountingStore {
    async fn manifest_exists(&self, repo: &RepositoryPath, digest: &Digest) -> StoreResult<bool> {
        self.inner.manifest_exists(repo, digest).await
    }

    async fn get_manifest(
        &self,
        repo: &RepositoryPath,
        digest: &Digest,
    ) -> StoreResult<StoredManifest> {
        self.manifest_gets.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.get_faults.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.inner.get_manifest(repo, digest).await
    }

    async fn put_manifest(
        &self,
        repo: &RepositoryPath,
        manifest: &StoredManifest,
    ) -> StoreResult<Digest> {
        self.manifest_puts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.put_faults.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.inner.put_manifest(repo, manifest).await
    }

    async fn delete_manifest(&self, repo: &RepositoryPath, digest: &Digest) -> StoreResult<()> {
        self.inner.delete_manifest(repo, digest).await
    }

    async fn stat_blob(
        &self,
        repo: &RepositoryPath,
        digest: &Digest,
    ) -> StoreResult<BlobDescriptor> {
        self.blob_stats.fetch_add(1, Ordering::SeqCst);
        self.inner.stat_blob(repo, digest).await
    }

    async fn get_blob(&self, repo: &RepositoryPath, digest: &Digest) -> StoreResult<Vec<u8>> {
        self.inner.get_blob(repo, digest).await
    }

    async fn put_blob(&self, repo: &RepositoryPath, data: &[u8]) -> StoreResult<Digest> {
        self.inner.put_blob(repo, data).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub config: RegistryConfig,
    pub backing: Arc<InMemoryCatalog>,
    pub catalog: Arc<ScriptedCatalog>,
    pub user: Arc<ScriptedCatalog>,
    pub store: Arc<CountingStore>,
    pub cache: Arc<LayerCache>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig {
            registry_addr: "registry.local:5000".into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        let backing = Arc::new(InMemoryCatalog::with_quota(config.quota.clone()));
        Self {
            catalog: Arc::new(ScriptedCatalog::new(backing.clone())),
            user: Arc::new(ScriptedCatalog::new(backing.clone())),
            backing,
            store: Arc::new(CountingStore::new()),
            cache: Arc::new(LayerCache::new(config.blob_repository_cache_ttl())),
            config,
        }
    }

    pub fn with_quota(quota: CatalogQuota) -> Self {
        Self::with_config(RegistryConfig {
            registry_addr: "registry.local:5000".into(),
            quota,
            ..Default::default()
        })
    }

    pub fn path(&self) -> RepositoryPath {
        RepositoryPath::new(NAMESPACE, NAME).unwrap()
    }

    fn repository(&self) -> Repository {
        Repository::new(
            self.path(),
            self.config.registry_addr.clone(),
            self.store.clone(),
            self.catalog.clone(),
            self.cache.clone(),
        )
    }

    /// Service with a user catalog client able to provision collections.
    pub fn service(&self) -> ManifestService {
        ManifestService::new(self.repository().with_user_catalog(self.user.clone()), &self.config)
    }

    /// Service whose request carries no user catalog client.
    pub fn service_without_user(&self) -> ManifestService {
        ManifestService::new(self.repository(), &self.config)
    }

    pub async fn create_collection(&self) {
        self.backing.create_collection(NAMESPACE, NAME).await.unwrap();
    }

    /// Link a blob into the repository.
    pub async fn blob(&self, data: &[u8]) -> Digest {
        self.store.inner().put_blob(&self.path(), data).await.unwrap()
    }

    /// Seed a config blob and layers, and return a schema2 manifest over them.
    pub async fn schema2(&self, layers: &[&[u8]]) -> Vec<u8> {
        let config = self.blob(CONFIG).await;
        let mut descriptors = Vec::new();
        for layer in layers {
            let digest = self.blob(layer).await;
            descriptors.push(format!(
                r#"{{"mediaType":"application/vnd.docker.image.rootfs.diff.tar.gzip","size":{},"digest":"{digest}"}}"#,
                layer.len()
            ));
        }
        format!(
            r#"{{"schemaVersion":2,"mediaType":"application/vnd.docker.distribution.manifest.v2+json","config":{{"mediaType":"application/vnd.docker.container.image.v1+json","size":{},"digest":"{config}"}},"layers":[{}]}}"#,
            CONFIG.len(),
            descriptors.join(",")
        )
        .into_bytes()
    }

    /// Seed layers and return an OCI manifest over them.
    pub async fn oci(&self, layers: &[&[u8]]) -> Vec<u8> {
        let raw = String::from_utf8(self.schema2(layers).await).unwrap();
        raw.replace(
            "application/vnd.docker.distribution.manifest.v2+json",
            "application/vnd.oci.image.manifest.v1+json",
        )
        .into_bytes()
    }

    /// Seed layers and return the unsigned body of a schema1 manifest.
    pub async fn schema1_body(&self, layers: &[&[u8]]) -> String {
        let mut fs_layers = Vec::new();
        let mut history = Vec::new();
        for layer in layers.iter().rev() {
            let digest = self.blob(layer).await;
            fs_layers.push(format!(r#"{{"blobSum": "{digest}"}}"#));
            history.push(r#"{"v1Compatibility": "{\"id\":\"v1\",\"os\":\"linux\"}"}"#.to_string());
        }
        format!(
            "{{\n   \"schemaVersion\": 1,\n   \"name\": \"team/app\",\n   \"tag\": \"latest\",\n   \"architecture\": \"amd64\",\n   \"fsLayers\": [{}],\n   \"history\": [{}]\n}}",
            fs_layers.join(", "),
            history.join(", ")
        )
    }
}

pub const CONFIG: &[u8] =
    br#"{"architecture":"amd64","os":"linux","config":{"Labels":{"tier":"web"}}}"#;

/// Wrap a schema1 body in a JWS envelope.
pub fn sign_schema1(body: &str) -> Vec<u8> {
    let cut = body.rfind("\n}").unwrap();
    let (head, tail) = body.split_at(cut);
    let protected = URL_SAFE_NO_PAD.encode(
        serde_json::json!({
            "formatLength": head.len(),
            "formatTail": URL_SAFE_NO_PAD.encode(tail),
            "time": "2016-01-01T00:00:00Z",
        })
        .to_string(),
    );
    format!(
        "{head},\n   \"signatures\": [{{\"header\": {{\"alg\": \"ES256\"}}, \"signature\": \"c2ln\", \"protected\": \"{protected}\"}}]{tail}"
    )
    .into_bytes()
}
