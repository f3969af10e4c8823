//! File-handle / attribute cache: a concurrent `path -> {
//! handle, attributes, expires_at }` map sitting next to the v3/v4 engines
//! to short-circuit path-to-handle walks. Built on [`moka::sync::Cache`],
//! the same concurrent-map crate the dependency stack reserves for this
//! purpose; entry expiry is tracked explicitly rather than through moka's
//! uniform cache-wide TTL policy, since `put`/`touch` allow a per-call `ttl`
//! override.

use moka::sync::Cache as MokaCache;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default entry lifetime, applied when `put`/`touch` are called without an
/// explicit `ttl`.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
/// Default interval between [`HandleCache::sweep`] calls, driven by the
/// façade's maintenance timer.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Coarse file kind, shared between the v3 and v4 engines so the cache does
/// not need to know which protocol populated an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    Other,
}

/// A version-agnostic attribute record, minus the file handle — the cache stores that
/// separately since it is also the map's payload on its own (a lookup that
/// only needs the handle, not fresh attributes, still hits the cache).
#[derive(Debug, Clone)]
pub struct CachedAttributes {
    pub file_type: FileKind,
    pub permission: (u8, u8, u8),
    pub size: u64,
    pub atime_secs: u64,
    pub mtime_secs: u64,
    pub ctime_secs: u64,
}

#[derive(Clone)]
struct Entry {
    handle: Vec<u8>,
    attributes: CachedAttributes,
    expires_at: Instant,
}

/// One instance lives per connected
/// client and is dropped (never persisted) on mount change or disconnect.
#[derive(Clone)]
pub struct HandleCache {
    inner: MokaCache<String, Arc<Entry>>,
}

impl HandleCache {
    pub fn new() -> Self {
        HandleCache { inner: MokaCache::builder().max_capacity(65_536).build() }
    }

    /// Returns `(handle, attributes)` if a live entry exists for `path`.
    /// An expired entry is treated as absent and evicted eagerly, matching
    /// the "fresh, expired, or absent" path-state invariant.
    pub fn get(&self, path: &str) -> Option<(Vec<u8>, CachedAttributes)> {
        let entry = self.inner.get(path)?;
        if entry.expires_at <= Instant::now() {
            self.inner.invalidate(path);
            return None;
        }
        Some((entry.handle.clone(), entry.attributes.clone()))
    }

    /// Overwrites any prior entry for `path`.
    pub fn put(&self, path: &str, handle: Vec<u8>, attributes: CachedAttributes, ttl: Option<Duration>) {
        let expires_at = Instant::now() + ttl.unwrap_or(DEFAULT_TTL);
        self.inner.insert(path.to_string(), Arc::new(Entry { handle, attributes, expires_at }));
    }

    /// Removes the exact key, if present.
    pub fn invalidate(&self, path: &str) {
        self.inner.invalidate(path);
    }

    /// Removes every key starting with `prefix` — used after a directory
    /// rename or remove, whose children's cached paths are now stale too.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.retain_out(|key| key.starts_with(prefix));
    }

    /// Removes every key containing `substring` — used for cross-directory
    /// moves, where the moved subtree's old path appears mid-string under
    /// the new parent's cached listing.
    pub fn invalidate_containing(&self, substring: &str) {
        self.retain_out(|key| key.contains(substring));
    }

    fn retain_out(&self, matches: impl Fn(&str) -> bool) {
        let keys: Vec<Arc<String>> =
            self.inner.iter().map(|(k, _)| k).filter(|k| matches(k)).collect();
        for key in keys {
            self.inner.invalidate(key.as_str());
        }
    }

    /// Extends a present entry's expiry; returns whether it existed.
    pub fn touch(&self, path: &str, ttl: Option<Duration>) -> bool {
        let Some(entry) = self.inner.get(path) else { return false };
        let refreshed = Entry {
            handle: entry.handle.clone(),
            attributes: entry.attributes.clone(),
            expires_at: Instant::now() + ttl.unwrap_or(DEFAULT_TTL),
        };
        self.inner.insert(path.to_string(), Arc::new(refreshed));
        true
    }

    /// Removes every entry whose `expires_at` has passed. Called on
    /// [`SWEEP_INTERVAL`] by the façade's maintenance task; `get` also
    /// evicts lazily so a missed sweep cannot surface stale data.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.retain_out_by(|entry| entry.expires_at <= now);
    }

    fn retain_out_by(&self, matches: impl Fn(&Entry) -> bool) {
        let keys: Vec<Arc<String>> =
            self.inner.iter().filter(|(_, v)| matches(v)).map(|(k, _)| k).collect();
        for key in keys {
            self.inner.invalidate(key.as_str());
        }
    }

    /// Drops every entry — called on mount change or disconnect, per the
    /// cache's lifecycle invariant that it never survives either.
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for HandleCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> CachedAttributes {
        CachedAttributes {
            file_type: FileKind::Regular,
            permission: (6, 4, 4),
            size: 10,
            atime_secs: 0,
            mtime_secs: 0,
            ctime_secs: 0,
        }
    }

    #[test]
    fn get_after_put_returns_handle_and_attrs() {
        let cache = HandleCache::new();
        cache.put("/a", vec![1, 2], attrs(), None);
        let (handle, a) = cache.get("/a").unwrap();
        assert_eq!(handle, vec![1, 2]);
        assert_eq!(a.size, 10);
    }

    #[test]
    fn expired_entry_reads_as_absent() {
        let cache = HandleCache::new();
        cache.put("/a", vec![1], attrs(), Some(Duration::from_secs(0)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("/a").is_none());
    }

    #[test]
    fn invalidate_prefix_removes_children() {
        let cache = HandleCache::new();
        cache.put("/dir", vec![0], attrs(), None);
        cache.put("/dir/a", vec![1], attrs(), None);
        cache.put("/dir/b", vec![2], attrs(), None);
        cache.put("/other", vec![3], attrs(), None);
        cache.invalidate_prefix("/dir");
        assert!(cache.get("/dir").is_none());
        assert!(cache.get("/dir/a").is_none());
        assert!(cache.get("/dir/b").is_none());
        assert!(cache.get("/other").is_some());
    }

    #[test]
    fn invalidate_containing_removes_cross_directory_matches() {
        let cache = HandleCache::new();
        cache.put("/a/moved", vec![1], attrs(), None);
        cache.put("/b/moved", vec![2], attrs(), None);
        cache.put("/c/untouched", vec![3], attrs(), None);
        cache.invalidate_containing("moved");
        assert!(cache.get("/a/moved").is_none());
        assert!(cache.get("/b/moved").is_none());
        assert!(cache.get("/c/untouched").is_some());
    }

    #[test]
    fn touch_extends_expiry_for_present_entry_only() {
        let cache = HandleCache::new();
        cache.put("/a", vec![1], attrs(), Some(Duration::from_millis(5)));
        assert!(cache.touch("/a", Some(Duration::from_secs(30))));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("/a").is_some());
        assert!(!cache.touch("/missing", None));
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let cache = HandleCache::new();
        cache.put("/expired", vec![1], attrs(), Some(Duration::from_secs(0)));
        cache.put("/fresh", vec![2], attrs(), None);
        std::thread::sleep(Duration::from_millis(5));
        cache.sweep();
        assert!(cache.inner.get("/expired").is_none());
        assert!(cache.inner.get("/fresh").is_some());
    }
}
