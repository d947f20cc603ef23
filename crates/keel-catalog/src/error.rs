//! Error types for catalog operations.
//!
//! Catalog failures are structured so callers can branch on the kind of
//! failure (quota, missing parent, ...) without parsing messages.

use std::fmt;

use thiserror::Error;

/// The kind of catalog resource an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A global image record keyed by digest.
    Image,
    /// A repository-level collection of images and tags.
    Collection,
    /// An image as seen through a collection (the authorization view).
    CollectionImage,
    /// A collection-to-image mapping.
    Mapping,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "images"),
            Self::Collection => write!(f, "collections"),
            Self::CollectionImage => write!(f, "collectionimages"),
            Self::Mapping => write!(f, "collectionmappings"),
        }
    }
}

/// The quota-limited resource that was exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuotaResource {
    Collections,
    Images,
}

impl fmt::Display for QuotaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collections => write!(f, "collections"),
            Self::Images => write!(f, "images"),
        }
    }
}

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The resource does not exist.
    #[error("{kind} {name:?} not found")]
    NotFound { kind: ResourceKind, name: String },

    /// The resource already exists.
    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    /// A namespace quota would be exceeded by the write.
    #[error("exceeded quota in {namespace}: {resource} used {used}, limited to {limit}")]
    QuotaExceeded {
        namespace: String,
        resource: QuotaResource,
        used: usize,
        limit: usize,
    },

    /// The caller is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The request was rejected as malformed.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// The catalog could not be reached or is in a bad state.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

impl CatalogError {
    /// Shorthand for a not-found error.
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Returns `true` if the write was refused because of quota.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Returns `true` for any not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a not-found error for exactly `kind`/`name`.
    pub fn is_not_found_for(&self, kind: ResourceKind, name: &str) -> bool {
        matches!(self, Self::NotFound { kind: k, name: n } if *k == kind && n == name)
    }
}

/// Convenience type alias for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
