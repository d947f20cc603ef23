use serde::{Deserialize, Serialize};

/// Per-namespace limits enforced by the catalog on writes.
///
/// `None` means unlimited.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuota {
    /// Maximum number of collections in a namespace.
    #[serde(default)]
    pub max_collections: Option<usize>,
    /// Maximum number of distinct image digests published in a namespace.
    #[serde(default)]
    pub max_images: Option<usize>,
}

impl CatalogQuota {
    /// No limits.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Returns `true` if neither limit is set.
    pub fn is_unlimited(&self) -> bool {
        self.max_collections.is_none() && self.max_images.is_none()
    }
}
