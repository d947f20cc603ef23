//! Manifest consistency coordinator for Keel.
//!
//! A manifest lives in two independent places: the content store, keyed by
//! digest, and the metadata catalog, which records that the manifest is
//! published in a repository. [`ManifestService`] keeps the two in an
//! acceptable agreement without a transaction spanning both:
//!
//! - **Exists** asks the catalog only.
//! - **Get** requires a catalog record, then reads the content store, and
//!   rebuilds the manifest from the record's embedded payload when the
//!   content store has lost it.
//! - **Put** writes the content store first, then publishes a catalog
//!   mapping, provisioning a missing collection and retrying exactly once.
//!   Quota failures surface as [`RegistryError::AccessDenied`].
//! - **Delete** removes content-store state only.
//!
//! # Modules
//!
//! - [`service`] -- [`ManifestService`] and [`ManifestOption`]
//! - [`repository`] -- [`Repository`] request context and reference resolution
//! - [`cache`] -- [`LayerCache`] blob-to-repository hint
//! - [`config`] -- [`RegistryConfig`] loaded from TOML
//! - [`error`] -- [`RegistryError`] taxonomy

pub mod cache;
pub mod config;
pub mod error;
pub mod repository;
pub mod service;

pub use cache::LayerCache;
pub use config::RegistryConfig;
pub use error::{RegistryError, RegistryResult};
pub use repository::Repository;
pub use service::{ManifestOption, ManifestService};
