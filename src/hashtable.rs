//! Generic chained hash table backing both the auth table (C4) and the
//! storage table (C5): a fixed bucket array of `Vec<(key, value)>` chains,
//! distributed by an externally supplied hash function — matching
//! `original_source`'s `hash_table_t`, which both `auth_users` and the
//! storage map are built from in the C server.
//!
//! A single mutex guards the whole table (rather than one per bucket) so the
//! deadlock discipline in `SPEC_FULL.md` §5 holds: a thread never holds more
//! than one of {handoff-lock, registry-lock, auth-lock, storage-lock} at a
//! time.

use std::sync::Mutex;

use crate::crypt::Hasher64;

const BUCKET_COUNT: usize = 64;

struct Inner<V> {
    buckets: Vec<Vec<(Vec<u8>, V)>>,
}

/// A mutex-guarded chained hash table keyed by byte slices.
pub struct ChainedHashTable<V> {
    inner: Mutex<Inner<V>>,
    hash_fn: Box<Hasher64>,
}

impl<V: Clone> ChainedHashTable<V> {
    /// Creates an empty table, bucketing keys with `hash_fn`.
    pub fn new(hash_fn: Box<Hasher64>) -> Self {
        let mut buckets = Vec::with_capacity(BUCKET_COUNT);
        buckets.resize_with(BUCKET_COUNT, Vec::new);
        Self {
            inner: Mutex::new(Inner { buckets }),
            hash_fn,
        }
    }

    fn bucket_index(&self, key: &[u8]) -> usize {
        ((self.hash_fn)(key) % BUCKET_COUNT as u64) as usize
    }

    /// Inserts or replaces the entry for `key`.
    pub fn put(&self, key: &[u8], value: V) {
        let idx = self.bucket_index(key);
        let mut inner = self.inner.lock().unwrap();
        let chain = &mut inner.buckets[idx];
        if let Some(slot) = chain.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            chain.push((key.to_vec(), value));
        }
    }

    /// Returns a clone of the value stored for `key`, if any.
    pub fn get(&self, key: &[u8]) -> Option<V> {
        let idx = self.bucket_index(key);
        let inner = self.inner.lock().unwrap();
        inner.buckets[idx]
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Removes the entry for `key`. Returns `true` if an entry was removed.
    pub fn remove(&self, key: &[u8]) -> bool {
        let idx = self.bucket_index(key);
        let mut inner = self.inner.lock().unwrap();
        let chain = &mut inner.buckets[idx];
        let before = chain.len();
        chain.retain(|(k, _)| k != key);
        chain.len() != before
    }

    /// Empties every bucket.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        for chain in inner.buckets.iter_mut() {
            chain.clear();
        }
    }

    /// Total number of entries across all buckets.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every `(key, value)` pair, for dump/iteration use. Order
    /// is unspecified — callers that need determinism (e.g. `auth::dump`)
    /// sort the snapshot themselves.
    pub fn entries(&self) -> Vec<(Vec<u8>, V)> {
        let inner = self.inner.lock().unwrap();
        inner.buckets.iter().flatten().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypt::hash64;

    fn table() -> ChainedHashTable<u32> {
        ChainedHashTable::new(Box::new(hash64))
    }

    #[test]
    fn put_get_roundtrip() {
        let t = table();
        t.put(b"alice", 1);
        t.put(b"bob", 2);
        assert_eq!(t.get(b"alice"), Some(1));
        assert_eq!(t.get(b"bob"), Some(2));
        assert_eq!(t.get(b"carol"), None);
    }

    #[test]
    fn put_replaces_existing() {
        let t = table();
        t.put(b"alice", 1);
        t.put(b"alice", 42);
        assert_eq!(t.get(b"alice"), Some(42));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn remove_deletes_entry() {
        let t = table();
        t.put(b"alice", 1);
        assert!(t.remove(b"alice"));
        assert!(!t.remove(b"alice"));
        assert_eq!(t.get(b"alice"), None);
    }

    #[test]
    fn clear_empties_table() {
        let t = table();
        t.put(b"a", 1);
        t.put(b"b", 2);
        t.clear();
        assert!(t.is_empty());
    }

    #[test]
    fn many_keys_survive_bucket_collisions() {
        let t = table();
        for i in 0..500u32 {
            t.put(format!("key{i}").as_bytes(), i);
        }
        assert_eq!(t.len(), 500);
        for i in 0..500u32 {
            assert_eq!(t.get(format!("key{i}").as_bytes()), Some(i));
        }
    }
}
