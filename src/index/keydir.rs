//! KeyDir implementation
//!
//! HashMap-based index from key to record offset.

use std::collections::hash_map;
use std::collections::HashMap;

/// In-memory index: key → offset of the start of its latest record
///
/// Holds at most one offset per key. Keys that are absent were either never
/// written or have been deleted.
#[derive(Debug, Default, Clone)]
pub struct KeyDir {
    entries: HashMap<Vec<u8>, u64>,
}

impl KeyDir {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index with room for `capacity` keys
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Offset of the latest record for `key`
    pub fn lookup(&self, key: &[u8]) -> Option<u64> {
        self.entries.get(key).copied()
    }

    /// Point `key` at `offset`, replacing any previous mapping
    ///
    /// Returns the offset it replaced, if any.
    pub fn update(&mut self, key: Vec<u8>, offset: u64) -> Option<u64> {
        self.entries.insert(key, offset)
    }

    /// Drop `key` from the index. Nothing is written to the log.
    pub fn remove(&mut self, key: &[u8]) -> Option<u64> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over (key, offset) pairs in unspecified order
    pub fn iter(&self) -> KeyDirIter<'_> {
        KeyDirIter {
            inner: self.entries.iter(),
        }
    }
}

/// Iterator over KeyDir entries
pub struct KeyDirIter<'a> {
    inner: hash_map::Iter<'a, Vec<u8>, u64>,
}

impl<'a> Iterator for KeyDirIter<'a> {
    type Item = (&'a [u8], u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, &off)| (k.as_slice(), off))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a KeyDir {
    type Item = (&'a [u8], u64);
    type IntoIter = KeyDirIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
