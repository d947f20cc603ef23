//! The manifest service: Exists, Get, Put and Delete over the content store
//! and the metadata catalog.
//!
//! Put writes the content store first and the catalog second. The two
//! writes are not atomic: a failed or interrupted Put can leave a manifest in
//! the content store with no catalog record, never the reverse. Reads gate on
//! the catalog record, so such orphans are invisible to Get.

use keel_catalog::{CatalogError, CollectionMapping, ImageRecord, ResourceKind};
use keel_codec::{fill_image_metadata, Manifest};
use keel_store::{StoreError, StoredManifest};
use keel_types::{Digest, MediaType};
use tracing::{debug, error, warn};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::repository::Repository;

/// Per-call options for Get and Put.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManifestOption {
    /// Tag to publish the manifest under.
    Tag(String),
}

impl ManifestOption {
    /// The first tag among `options`.
    pub fn tag(options: &[ManifestOption]) -> Option<&str> {
        options.iter().find_map(|o| match o {
            ManifestOption::Tag(t) => Some(t.as_str()),
        })
    }
}

/// Stage of a catalog publication.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PublishStage {
    Initial,
    Provisioning,
    Retried,
}

impl PublishStage {
    fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Provisioning => "provisioning",
            Self::Retried => "retried",
        }
    }
}

/// Coordinates manifest reads and writes for one repository.
#[derive(Debug, Clone)]
pub struct ManifestService {
    repo: Repository,
    accept_schema2: bool,
}

impl ManifestService {
    pub fn new(repo: Repository, config: &RegistryConfig) -> Self {
        Self {
            repo,
            accept_schema2: config.accept_schema2,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Returns `true` if the catalog holds a record of `digest` in this
    /// repository. The content store is not consulted.
    ///
    /// Catalog errors, not-found included, are returned unchanged.
    pub async fn exists(&self, digest: &Digest) -> RegistryResult<bool> {
        debug!(repository = %self.repo.path(), %digest, "manifest exists");
        match self
            .repo
            .catalog()
            .get_collection_image(self.repo.namespace(), self.repo.name(), digest)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                error!(repository = %self.repo.path(), %digest, error = %e, "catalog lookup failed");
                Err(e.into())
            }
        }
    }

    /// Read the manifest `digest`.
    ///
    /// The catalog record is required. When the content store no longer has
    /// the manifest, it is rebuilt from a payload embedded in the record.
    pub async fn get(&self, digest: &Digest, options: &[ManifestOption]) -> RegistryResult<Manifest> {
        debug!(
            repository = %self.repo.path(),
            %digest,
            tag = ManifestOption::tag(options).unwrap_or(""),
            "manifest get"
        );

        let image = self.repo.get_image(digest).await.map_err(|e| {
            error!(repository = %self.repo.path(), %digest, error = %e, "image record lookup failed");
            e
        })?;
        let cache_name = self.repo.reference_for(&image).exact();

        match self.repo.store().get_manifest(self.repo.path(), digest).await {
            Ok(stored) => {
                let manifest = Manifest::decode_with_media_type(&stored.payload, Some(&stored.media_type))?;
                if manifest.digest() != *digest {
                    error!(
                        repository = %self.repo.path(),
                        %digest,
                        computed = %manifest.digest(),
                        "stored manifest does not match its digest"
                    );
                    return Err(self.unknown_revision(digest));
                }
                self.repo.remember_layers_of_manifest(*digest, &manifest, &cache_name);
                return Ok(manifest);
            }
            Err(StoreError::ManifestUnknownRevision { .. }) => {}
            Err(e) => {
                error!(repository = %self.repo.path(), %digest, error = %e, "unable to get manifest from storage");
                return Err(e.into());
            }
        }

        if !image.has_embedded_manifest() {
            return Err(self.unknown_revision(digest));
        }
        warn!(
            repository = %self.repo.path(),
            %digest,
            "manifest missing from storage; rebuilding from image record"
        );
        self.repo.manifest_from_image_with_cached_layers(&image, &cache_name)
    }

    /// Store a manifest and publish it into the repository.
    ///
    /// Returns the digest of the manifest's canonical bytes.
    pub async fn put(
        &self,
        media_type: Option<&MediaType>,
        payload: &[u8],
        options: &[ManifestOption],
    ) -> RegistryResult<Digest> {
        debug!(repository = %self.repo.path(), "manifest put");

        let manifest = Manifest::decode_with_media_type(payload, media_type)
            .map_err(|e| RegistryError::ManifestInvalid(e.to_string()))?;

        if !self.accept_schema2 && *manifest.media_type() == MediaType::Schema2 {
            return Err(RegistryError::ManifestInvalid(
                "manifest V2 schema 2 not allowed".into(),
            ));
        }

        let sizes = self.repo.verify_references(&manifest).await?;

        let stored = StoredManifest::new(
            manifest.digest(),
            manifest.media_type().clone(),
            manifest.payload().to_vec(),
        );
        self.repo
            .store()
            .put_manifest(self.repo.path(), &stored)
            .await
            .map_err(|e| {
                error!(repository = %self.repo.path(), error = %e, "unable to put manifest into storage");
                e
            })?;

        let digest = Digest::from_bytes(manifest.canonical());

        let mut image = ImageRecord::new(
            digest,
            self.repo.pull_spec(&digest),
            manifest.media_type().clone(),
        )
        .managed()
        .with_manifest(manifest.canonical().to_vec());

        let config = match manifest.config() {
            Some(c) => Some(
                self.repo
                    .store()
                    .get_blob(self.repo.path(), &c.digest)
                    .await
                    .map_err(|e| {
                        error!(repository = %self.repo.path(), config = %c.digest, error = %e, "unable to read image config");
                        e
                    })?,
            ),
            None => None,
        };
        fill_image_metadata(&manifest, &mut image, config.as_deref(), &sizes).map_err(|e| {
            error!(repository = %self.repo.path(), %digest, error = %e, "unable to fill image metadata");
            e
        })?;

        // The catalog keeps derived fields only.
        image.strip_payload();

        let mut mapping = CollectionMapping::new(self.repo.namespace(), self.repo.name(), image);
        mapping.tag = ManifestOption::tag(options).map(str::to_string);
        self.publish(&mapping).await?;

        Ok(digest)
    }

    /// Remove the manifest from the content store. The catalog record is
    /// left in place.
    pub async fn delete(&self, digest: &Digest) -> RegistryResult<()> {
        debug!(repository = %self.repo.path(), %digest, "manifest delete");
        self.repo
            .store()
            .delete_manifest(self.repo.path(), digest)
            .await
            .map_err(|e| {
                error!(repository = %self.repo.path(), %digest, error = %e, "unable to delete manifest from storage");
                e
            })?;
        self.repo
            .cache()
            .forget(digest, &self.repo.local_reference().exact());
        Ok(())
    }

    /// Create the mapping, provisioning the collection and retrying once if
    /// it is missing.
    async fn publish(&self, mapping: &CollectionMapping) -> RegistryResult<()> {
        let not_found = match self.repo.catalog().create_mapping(mapping).await {
            Ok(()) => return Ok(()),
            Err(e) => self.classify(PublishStage::Initial, e)?,
        };

        let Some(user) = self.repo.user_catalog() else {
            error!(
                repository = %self.repo.path(),
                "user catalog client unavailable; cannot provision collection"
            );
            return Err(not_found.into());
        };

        warn!(repository = %self.repo.path(), "collection missing; provisioning");
        if let Err(e) = user
            .create_collection(self.repo.namespace(), self.repo.name())
            .await
        {
            if e.is_quota_exceeded() {
                return Err(self.denied(PublishStage::Provisioning, e));
            }
            error!(
                repository = %self.repo.path(),
                stage = PublishStage::Provisioning.as_str(),
                error = %e,
                "collection provisioning failed"
            );
            return Err(not_found.into());
        }

        match self.repo.catalog().create_mapping(mapping).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_quota_exceeded() => Err(self.denied(PublishStage::Retried, e)),
            Err(e) => {
                error!(
                    repository = %self.repo.path(),
                    stage = PublishStage::Retried.as_str(),
                    error = %e,
                    "mapping creation failed"
                );
                Err(e.into())
            }
        }
    }

    /// Classify a failed initial mapping attempt. Returns the error back
    /// only when it reports this repository's collection as missing.
    fn classify(&self, stage: PublishStage, err: CatalogError) -> RegistryResult<CatalogError> {
        if err.is_quota_exceeded() {
            return Err(self.denied(stage, err));
        }
        if err.is_not_found_for(ResourceKind::Collection, self.repo.name()) {
            return Ok(err);
        }
        error!(
            repository = %self.repo.path(),
            stage = stage.as_str(),
            error = %err,
            "mapping creation failed"
        );
        Err(err.into())
    }

    fn denied(&self, stage: PublishStage, err: CatalogError) -> RegistryError {
        error!(
            repository = %self.repo.path(),
            stage = stage.as_str(),
            error = %err,
            "catalog write denied"
        );
        RegistryError::AccessDenied(err.to_string())
    }

    fn unknown_revision(&self, digest: &Digest) -> RegistryError {
        RegistryError::ManifestUnknownRevision {
            repository: self.repo.path().to_string(),
            revision: *digest,
        }
    }
}
