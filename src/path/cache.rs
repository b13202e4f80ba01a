//! Compiled-path cache
//!
//! Compiling the same expression for every lookup wastes work when an
//! application probes many documents with a fixed set of paths. The cache
//! keys on the expression together with the bindings it was compiled
//! under, since the same expression compiles differently under different
//! prefix mappings.

use std::num::NonZeroUsize;

use log::debug;
use lru::LruCache;

use crate::error::Result;
use crate::path::compiler::{CompiledPath, Namespaces};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    expression: String,
    default_prefix: String,
    bindings: Vec<(String, String)>,
}

impl CacheKey {
    fn new(expression: &str, namespaces: &Namespaces) -> CacheKey {
        CacheKey {
            expression: expression.to_string(),
            default_prefix: namespaces.default_prefix().to_string(),
            bindings: namespaces.bindings().to_vec(),
        }
    }
}

/// LRU cache of compiled path expressions
pub struct PathCache {
    inner: LruCache<CacheKey, CompiledPath>,
}

impl PathCache {
    /// Cache holding at most `capacity` compiled paths (at least one)
    pub fn new(capacity: usize) -> PathCache {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        PathCache {
            inner: LruCache::new(capacity),
        }
    }

    /// Return the cached compilation or compile and remember it.
    /// Compile errors are returned and never cached.
    pub fn get_or_compile(
        &mut self,
        expression: &str,
        namespaces: &Namespaces,
    ) -> Result<CompiledPath> {
        let key = CacheKey::new(expression, namespaces);
        if let Some(path) = self.inner.get(&key) {
            return Ok(path.clone());
        }
        let path = CompiledPath::compile(expression, namespaces)?;
        debug!("caching compiled path '{expression}'");
        self.inner.put(key, path.clone());
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl Default for PathCache {
    fn default() -> PathCache {
        PathCache::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_returns_same_compilation() {
        let mut cache = PathCache::default();
        let ns = Namespaces::new();
        let first = cache.get_or_compile("/a/b", &ns).unwrap();
        let second = cache.get_or_compile("/a/b", &ns).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_different_bindings_are_distinct_entries() {
        let mut cache = PathCache::default();
        let plain = Namespaces::new();
        let bound = Namespaces::new().bind("ns", "uri:x");
        let a = cache.get_or_compile("/ns:a", &plain).unwrap();
        let b = cache.get_or_compile("/ns:a", &bound).unwrap();
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let mut cache = PathCache::default();
        let ns = Namespaces::new();
        assert!(cache.get_or_compile("", &ns).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let mut cache = PathCache::new(2);
        let ns = Namespaces::new();
        cache.get_or_compile("/a", &ns).unwrap();
        cache.get_or_compile("/b", &ns).unwrap();
        cache.get_or_compile("/a", &ns).unwrap();
        cache.get_or_compile("/c", &ns).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_clamps_to_one() {
        let mut cache = PathCache::new(0);
        let ns = Namespaces::new();
        cache.get_or_compile("/a", &ns).unwrap();
        assert_eq!(cache.len(), 1);
    }
}
