//! Content store client for Keel.
//!
//! The content store holds manifest and blob bytes keyed by digest, linked
//! into repositories. Keel treats it as an external service reached through
//! the [`ContentStore`] trait.
//!
//! # Storage Backends
//!
//! - [`InMemoryContentStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Content is immutable once written; writes are idempotent.
//! 2. Every read and write is scoped to a repository.
//! 3. The store never interprets manifest or blob contents.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryContentStore;
pub use object::{BlobDescriptor, StoredManifest};
pub use traits::ContentStore;
