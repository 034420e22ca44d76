//! Storage table (C5): opaque key/value mapping for client-visible storage
//! operations. The wire protocol that exposes `get`/`put`/`delete` to
//! authenticated clients is out of scope here (`SPEC_FULL.md` §1) — this is
//! just the table those operations would be built on.

use crate::crypt::Hasher64;
use crate::error::{CoreError, CoreResult};
use crate::hashtable::ChainedHashTable;

/// Byte-keyed, byte-valued table shared by every authenticated connection.
pub struct StorageTable {
    table: ChainedHashTable<Vec<u8>>,
}

impl StorageTable {
    pub fn new(hash_fn: Box<Hasher64>) -> Self {
        Self {
            table: ChainedHashTable::new(hash_fn),
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.table.get(key)
    }

    pub fn put(&self, key: &[u8], value: Vec<u8>) {
        self.table.put(key, value);
    }

    pub fn delete(&self, key: &[u8]) -> CoreResult<()> {
        if self.table.remove(key) {
            Ok(())
        } else {
            Err(CoreError::NotFound)
        }
    }

    pub fn clear(&self) {
        self.table.clear();
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
