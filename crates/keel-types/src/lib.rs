//! Foundation types for Keel.
//!
//! Every other Keel crate depends on `keel-types`.
//!
//! # Key Types
//!
//! - [`Digest`] -- SHA-256 content address of a manifest or blob
//! - [`MediaType`] -- manifest schema variant
//! - [`RepositoryPath`] -- validated `namespace/name`
//! - [`ImageReference`] -- `[registry/][namespace/]name[:tag][@id]`

pub mod digest;
pub mod error;
pub mod media_type;
pub mod names;
pub mod reference;

pub use digest::Digest;
pub use error::TypeError;
pub use media_type::MediaType;
pub use names::{validate_namespace, validate_repository_name, validate_tag, RepositoryPath};
pub use reference::ImageReference;
