//! Layer cache hint.
//!
//! Records which blobs were recently confirmed to belong to which repository
//! so repeated verification can skip the content store. Entries expire after
//! a TTL and are pruned lazily; nothing here is authoritative.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use keel_codec::{Descriptor, Manifest};
use keel_types::Digest;

/// Writes between two sweeps of expired entries.
pub const PRUNE_INTERVAL: usize = 256;

#[derive(Debug, Default)]
struct Entry {
    descriptor: Option<Descriptor>,
    repositories: HashMap<String, Instant>,
}

impl Entry {
    fn live(&self, repository: &str, now: Instant) -> bool {
        self.repositories
            .get(repository)
            .is_some_and(|expiry| *expiry > now)
    }
}

/// Digest to repository association with expiry.
///
/// Every [`PRUNE_INTERVAL`] writes the cache sweeps expired associations.
#[derive(Debug)]
pub struct LayerCache {
    ttl: Duration,
    entries: RwLock<HashMap<Digest, Entry>>,
    writes: AtomicUsize,
}

fn prune_expired(entries: &mut HashMap<Digest, Entry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, e| {
        e.repositories.retain(|_, expiry| *expiry > now);
        !e.repositories.is_empty()
    });
    before - entries.len()
}

impl LayerCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Associate `digest` with `repository`, keeping any known descriptor.
    pub fn remember_digest(&self, digest: Digest, repository: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(digest)
            .or_default()
            .repositories
            .insert(repository.to_string(), Instant::now() + self.ttl);
        self.wrote(&mut entries);
    }

    /// Associate a described blob with `repository`.
    pub fn remember(&self, descriptor: Descriptor, repository: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(descriptor.digest).or_default();
        entry
            .repositories
            .insert(repository.to_string(), Instant::now() + self.ttl);
        entry.descriptor = Some(descriptor);
        self.wrote(&mut entries);
    }

    /// Associate a manifest and every blob it references with `repository`.
    ///
    /// Schema1 layers carry no size, so only their association is refreshed.
    pub fn remember_manifest(&self, digest: Digest, manifest: &Manifest, repository: &str) {
        self.remember_digest(digest, repository);
        for descriptor in manifest.blob_descriptors() {
            if manifest.is_schema1() {
                self.remember_digest(descriptor.digest, repository);
            } else {
                self.remember(descriptor, repository);
            }
        }
    }

    /// Returns `true` if `digest` is confirmed for `repository` and not expired.
    pub fn contains(&self, digest: &Digest, repository: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(digest)
            .is_some_and(|e| e.live(repository, Instant::now()))
    }

    /// The descriptor of a blob confirmed for `repository`, if its size is known.
    pub fn descriptor(&self, digest: &Digest, repository: &str) -> Option<Descriptor> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(digest)
            .filter(|e| e.live(repository, Instant::now()))
            .and_then(|e| e.descriptor.clone())
    }

    /// Drop the association of `digest` with `repository`.
    pub fn forget(&self, digest: &Digest, repository: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(digest) {
            entry.repositories.remove(repository);
            if entry.repositories.is_empty() {
                entries.remove(digest);
            }
        }
    }

    /// Remove expired associations and entries left without any.
    pub fn prune(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        prune_expired(&mut entries, Instant::now())
    }

    fn wrote(&self, entries: &mut HashMap<Digest, Entry>) {
        let n = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if n % PRUNE_INTERVAL == 0 {
            prune_expired(entries, Instant::now());
        }
    }

    /// Number of cached digests, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LayerCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(seed: &[u8], size: u64) -> Descriptor {
        Descriptor::new("application/octet-stream", Digest::from_bytes(seed), size)
    }

    #[test]
    fn remember_is_per_repository() {
        let cache = LayerCache::default();
        let d = desc(b"layer", 5);
        cache.remember(d.clone(), "team/app");

        assert!(cache.contains(&d.digest, "team/app"));
        assert!(!cache.contains(&d.digest, "team/web"));
        assert_eq!(cache.descriptor(&d.digest, "team/app"), Some(d.clone()));
        assert_eq!(cache.descriptor(&d.digest, "team/web"), None);
    }

    #[test]
    fn expired_entries_are_ignored_and_pruned() {
        let cache = LayerCache::new(Duration::ZERO);
        let d = desc(b"layer", 5);
        cache.remember(d.clone(), "team/app");

        assert!(!cache.contains(&d.digest, "team/app"));
        assert!(cache.descriptor(&d.digest, "team/app").is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.prune(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn writes_sweep_expired_entries() {
        let cache = LayerCache::new(Duration::ZERO);
        for i in 0..1000u32 {
            cache.remember_digest(Digest::from_bytes(&i.to_be_bytes()), "team/app");
        }
        assert!(cache.len() < PRUNE_INTERVAL);

        for i in 0..1000u32 {
            cache.remember(desc(&i.to_be_bytes(), 1), "team/web");
        }
        assert!(cache.len() < PRUNE_INTERVAL);
    }

    #[test]
    fn writes_keep_live_entries() {
        let cache = LayerCache::default();
        for i in 0..1000u32 {
            cache.remember_digest(Digest::from_bytes(&i.to_be_bytes()), "team/app");
        }
        assert_eq!(cache.len(), 1000);
        assert!(cache.contains(&Digest::from_bytes(&0u32.to_be_bytes()), "team/app"));
    }

    #[test]
    fn remember_digest_keeps_descriptor() {
        let cache = LayerCache::default();
        let d = desc(b"layer", 5);
        cache.remember(d.clone(), "team/app");
        cache.remember_digest(d.digest, "team/web");
        assert_eq!(cache.descriptor(&d.digest, "team/web"), Some(d));
    }

    #[test]
    fn forget_drops_one_association() {
        let cache = LayerCache::default();
        let d = desc(b"m", 1);
        cache.remember(d.clone(), "team/app");
        cache.remember(d.clone(), "team/web");

        cache.forget(&d.digest, "team/app");
        assert!(!cache.contains(&d.digest, "team/app"));
        assert!(cache.contains(&d.digest, "team/web"));

        cache.forget(&d.digest, "team/web");
        assert!(cache.is_empty());
    }

    #[test]
    fn remember_manifest_covers_references() {
        let config = Digest::from_bytes(b"config");
        let layer = Digest::from_bytes(b"layer");
        let raw = format!(
            r#"{{"schemaVersion":2,"config":{{"mediaType":"c","size":6,"digest":"{config}"}},"layers":[{{"mediaType":"l","size":5,"digest":"{layer}"}}]}}"#
        );
        let manifest = Manifest::decode(raw.as_bytes()).unwrap();
        let cache = LayerCache::default();
        cache.remember_manifest(manifest.digest(), &manifest, "team/app");

        assert!(cache.contains(&manifest.digest(), "team/app"));
        assert_eq!(cache.descriptor(&layer, "team/app").unwrap().size, 5);
        assert_eq!(cache.descriptor(&config, "team/app").unwrap().size, 6);
        // The manifest itself has no blob descriptor.
        assert!(cache.descriptor(&manifest.digest(), "team/app").is_none());
    }
}
