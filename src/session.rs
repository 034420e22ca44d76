//! Session registry (replaces `sessions.c`): mints, looks up, and retires
//! session records keyed by a 32-bit ID.
//!
//! The C original drew IDs from a process-wide `atomic_int session_number`
//! and checked uniqueness with `check_queue`, which compared the *address*
//! of the caller's local `&session_number` against each node's payload
//! pointer — never the `session_id` field — so the "skip IDs already in
//! use" loop never actually fired (see `original_source/structs/sessions.c`
//! and the Design Notes in `SPEC_FULL.md`). Here uniqueness is checked by
//! value against `session_id`, so the loop does what its comments always
//! claimed it did.

use rand::Rng;

use crate::error::{CoreError, CoreResult};
use crate::queue::BoundedQueue;

/// Session IDs are drawn modulo this bound; at most this many sessions are
/// live simultaneously.
pub const MAX_SESSIONS: u32 = 100_000;

/// Longest username a session record will own a copy of.
pub const MAX_USERNAME_LEN: usize = 64;

/// `permissions == 0` is reserved for "not authenticated / not found".
pub const NO_PERMISSIONS: u8 = 0;

/// One authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: u32,
    pub permissions: u8,
    pub username: String,
}

impl SessionRecord {
    /// Length of the owned username, mirroring the C struct's separate
    /// `username_len` field (redundant in Rust, where `String::len` always
    /// agrees — kept as a method for parity with the data model in
    /// `SPEC_FULL.md`).
    pub fn username_len(&self) -> u32 {
        self.username.len() as u32
    }
}

struct Registry {
    records: BoundedQueue<SessionRecord>,
    next_id: u32,
    id_space: u32,
}

/// Thread-safe session registry, backed by a bounded FIFO of records plus a
/// next-ID search hint.
pub struct SessionRegistry {
    inner: std::sync::Mutex<Registry>,
}

impl SessionRegistry {
    /// Creates an empty registry with the standard [`MAX_SESSIONS`] ID space.
    /// `next_id` is seeded randomly, matching the C original's
    /// `random() % MAX_SESSIONS` seed.
    pub fn new() -> Self {
        Self::with_id_space(MAX_SESSIONS)
    }

    /// Creates an empty registry whose ID space is `id_space` instead of the
    /// standard [`MAX_SESSIONS`]. Exposed for tests that need to exhaust the
    /// ID space without performing `O(MAX_SESSIONS)` scans `MAX_SESSIONS`
    /// times over.
    pub fn with_id_space(id_space: u32) -> Self {
        let seed = rand::rng().random_range(0..id_space);
        Self {
            inner: std::sync::Mutex::new(Registry {
                records: BoundedQueue::create(id_space as usize),
                next_id: seed,
                id_space,
            }),
        }
    }

    /// Authenticates a new session: selects a free ID starting from the
    /// registry's hint, owns a copy of `username`, and enqueues the record.
    ///
    /// Fails with [`CoreError::BadInput`] if `username` is empty or exceeds
    /// [`MAX_USERNAME_LEN`], or [`CoreError::Full`] if a full sweep of the ID
    /// space finds no free slot.
    pub fn add(&self, permissions: u8, username: &str) -> CoreResult<u32> {
        if username.is_empty() || username.len() > MAX_USERNAME_LEN {
            return Err(CoreError::BadInput(format!(
                "username length {} outside 1..={MAX_USERNAME_LEN}",
                username.len()
            )));
        }

        let mut registry = self.inner.lock().unwrap();
        let id_space = registry.id_space;

        let mut candidate = registry.next_id % id_space;
        let mut swept = 0u32;
        while registry.records.contains(|r| r.session_id == candidate) {
            candidate = (candidate + 1) % id_space;
            swept += 1;
            if swept >= id_space {
                return Err(CoreError::Full);
            }
        }

        let record = SessionRecord {
            session_id: candidate,
            permissions,
            username: username.to_string(),
        };
        registry.records.push(record)?;
        registry.next_id = (candidate + 1) % id_space;

        tracing::debug!(session_id = candidate, "[session] created");
        Ok(candidate)
    }

    /// Returns a clone of the record with `session_id`, or `None`.
    pub fn find(&self, session_id: u32) -> Option<SessionRecord> {
        let registry = self.inner.lock().unwrap();
        registry
            .records
            .iter()
            .find(|r| r.session_id == session_id)
            .cloned()
    }

    /// Returns the permission byte for `session_id`, or [`NO_PERMISSIONS`]
    /// when absent.
    pub fn check(&self, session_id: u32) -> u8 {
        let registry = self.inner.lock().unwrap();
        registry
            .records
            .iter()
            .find(|r| r.session_id == session_id)
            .map(|r| r.permissions)
            .unwrap_or(NO_PERMISSIONS)
    }

    /// Explicit logout: removes and drops the record with `session_id`,
    /// wherever it sits in the queue. Supplements the distilled spec's
    /// `expire_oldest`/`destroy`-only operation set — see `SPEC_FULL.md`
    /// §4.3.
    pub fn remove(&self, session_id: u32) -> CoreResult<()> {
        let mut registry = self.inner.lock().unwrap();
        match registry.records.remove_where(|r| r.session_id == session_id) {
            Some(_) => {
                tracing::debug!(session_id, "[session] removed");
                Ok(())
            }
            None => Err(CoreError::NotFound),
        }
    }

    /// Pops and drops the oldest (head) session record.
    pub fn expire_oldest(&self) -> CoreResult<()> {
        let mut registry = self.inner.lock().unwrap();
        match registry.records.pop() {
            Some(record) => {
                tracing::debug!(session_id = record.session_id, "[session] expired");
                Ok(())
            }
            None => Err(CoreError::NotFound),
        }
    }

    /// Current number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases every session record.
    pub fn destroy(&self) {
        self.inner.lock().unwrap().records.clear();
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// S3
    #[test]
    fn add_find_check() {
        let registry = SessionRegistry::new();
        let a = registry.add(7, "alice").unwrap();
        let b = registry.add(3, "bob").unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.check(a), 7);
        assert_eq!(registry.check(b), 3);
        assert_eq!(registry.check(0xFFFF_FFFF), NO_PERMISSIONS);
    }

    #[test]
    fn rejects_empty_username() {
        let registry = SessionRegistry::new();
        assert!(matches!(registry.add(1, ""), Err(CoreError::BadInput(_))));
    }

    #[test]
    fn rejects_oversized_username() {
        let registry = SessionRegistry::new();
        let long = "x".repeat(MAX_USERNAME_LEN + 1);
        assert!(matches!(
            registry.add(1, &long),
            Err(CoreError::BadInput(_))
        ));
    }

    #[test]
    fn remove_logs_out_arbitrary_session() {
        let registry = SessionRegistry::new();
        let a = registry.add(1, "alice").unwrap();
        let b = registry.add(2, "bob").unwrap();
        registry.remove(a).unwrap();
        assert_eq!(registry.check(a), NO_PERMISSIONS);
        assert_eq!(registry.check(b), 2);
        assert!(matches!(registry.remove(a), Err(CoreError::NotFound)));
    }

    #[test]
    fn expire_oldest_pops_head() {
        let registry = SessionRegistry::new();
        let a = registry.add(1, "first").unwrap();
        let _b = registry.add(2, "second").unwrap();
        registry.expire_oldest().unwrap();
        assert_eq!(registry.check(a), NO_PERMISSIONS);
        assert_eq!(registry.len(), 1);
    }

    /// S4: filling the registry exhausts the ID space and leaves size
    /// unchanged on the next `add`. Uses a small ID space so the `O(n)`
    /// uniqueness scan in `add` doesn't make the test `O(n^2)` over the full
    /// 100,000-entry `MAX_SESSIONS` space; the capacity/Full behavior being
    /// tested does not depend on the space's size.
    #[test]
    fn full_registry_rejects_further_adds() {
        const SMALL_ID_SPACE: u32 = 200;
        let registry = SessionRegistry::with_id_space(SMALL_ID_SPACE);
        for i in 0..SMALL_ID_SPACE {
            registry.add(1, &format!("user{i}")).unwrap();
        }
        assert_eq!(registry.len(), SMALL_ID_SPACE as usize);
        assert!(matches!(
            registry.add(1, "one_too_many"),
            Err(CoreError::Full)
        ));
        assert_eq!(registry.len(), SMALL_ID_SPACE as usize);
    }

    #[test]
    fn ids_are_pairwise_distinct_under_concurrent_adds() {
        use std::collections::HashSet;
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(SessionRegistry::new());
        let mut handles = Vec::new();
        for t in 0..8 {
            let registry = registry.clone();
            handles.push(thread::spawn(move || {
                let mut ids = Vec::new();
                for i in 0..50 {
                    ids.push(registry.add(1, &format!("t{t}-{i}")).unwrap());
                }
                ids
            }));
        }
        let mut all_ids = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(all_ids.insert(id), "duplicate session id {id}");
            }
        }
        assert_eq!(all_ids.len(), 400);
    }

    #[test]
    fn destroy_clears_registry() {
        let registry = SessionRegistry::new();
        registry.add(1, "alice").unwrap();
        registry.destroy();
        assert!(registry.is_empty());
    }
}
