//! String interning pool
//!
//! Deduplicated storage for element and attribute names, namespace URIs and
//! text content. Interned strings are addressed by a compact `u32` id; id 0
//! is reserved for the empty string.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Interned string id. Id 0 is always the empty string.
pub type StringId = u32;

/// String interning pool
///
/// Memory layout:
/// - `spans`: (offset, len) into `data` for each interned id
/// - `data`: concatenated string bytes
/// - `hash_index`: content hash -> ids with that hash (handles collisions)
#[derive(Debug)]
pub struct StringPool {
    spans: Vec<(u32, u32)>,
    data: String,
    hash_index: HashMap<u64, Vec<StringId>>,
}

impl StringPool {
    /// Create a new pool with id 0 bound to the empty string
    pub fn new() -> Self {
        StringPool {
            spans: vec![(0, 0)],
            data: String::with_capacity(1024),
            hash_index: HashMap::new(),
        }
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning the id of the existing entry when the
    /// content was seen before
    pub fn intern(&mut self, s: &str) -> StringId {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);
        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get(id) == s {
                    return id;
                }
            }
        }

        let offset = self.data.len() as u32;
        self.data.push_str(s);
        let id = self.spans.len() as StringId;
        self.spans.push((offset, s.len() as u32));
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    /// Get the string for an id. Unknown ids resolve to the empty string.
    pub fn get(&self, id: StringId) -> &str {
        match self.spans.get(id as usize) {
            Some(&(offset, len)) => &self.data[offset as usize..(offset + len) as usize],
            None => "",
        }
    }

    /// Number of interned strings (including the reserved empty entry)
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.len() <= 1
    }
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_get() {
        let mut pool = StringPool::new();
        let id = pool.intern("hello");
        assert!(id > 0);
        assert_eq!(pool.get(id), "hello");
    }

    #[test]
    fn test_intern_deduplicates() {
        let mut pool = StringPool::new();
        let id1 = pool.intern("hello");
        let id2 = pool.intern("hello");
        assert_eq!(id1, id2);
        assert_ne!(pool.intern("world"), id1);
    }

    #[test]
    fn test_empty_string_is_id_zero() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern(""), 0);
        assert_eq!(pool.get(0), "");
    }

    #[test]
    fn test_unknown_id_is_empty() {
        let pool = StringPool::new();
        assert_eq!(pool.get(999), "");
    }
}
