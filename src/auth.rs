//! Auth table (C4): username → (password-hash, permissions), persistable to
//! the `auth_users` file under the server root.
//!
//! Backed by [`ChainedHashTable`], hashed by whatever `hash64`-shaped
//! function the caller supplies (see `crypt::hash64` for the default).
//! Password hashing itself is out of scope for this core (`SPEC_FULL.md`
//! §1) — `AuthTable` only ever stores and compares already-hashed values.

use std::fs;
use std::path::Path;

use crate::crypt::Hasher64;
use crate::error::{CoreError, CoreResult};
use crate::hashtable::ChainedHashTable;

/// One stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthEntry {
    pub password_hash: u64,
    pub permissions: u8,
}

/// Username-keyed, persistable credential table.
pub struct AuthTable {
    table: ChainedHashTable<AuthEntry>,
}

impl AuthTable {
    pub fn new(hash_fn: Box<Hasher64>) -> Self {
        Self {
            table: ChainedHashTable::new(hash_fn),
        }
    }

    /// Inserts or replaces the credential for `username`.
    pub fn put(&self, username: &str, password_hash: u64, permissions: u8) {
        self.table.put(
            username.as_bytes(),
            AuthEntry {
                password_hash,
                permissions,
            },
        );
    }

    /// Returns `(password_hash, permissions)` for `username`, if present.
    pub fn lookup(&self, username: &str) -> Option<(u64, u8)> {
        self.table
            .get(username.as_bytes())
            .map(|e| (e.password_hash, e.permissions))
    }

    /// Removes `username`'s credential.
    pub fn remove(&self, username: &str) -> CoreResult<()> {
        if self.table.remove(username.as_bytes()) {
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

    /// Persists every entry to `path` as `username password_hash permissions`
    /// lines, one per record, sorted by username so the output is
    /// byte-stable across runs (round-trip is the property of interest —
    /// `SPEC_FULL.md` §4.4 — not wire compatibility with any particular
    /// legacy format).
    ///
    /// Writes to a sibling temp file then renames over `path`, so a crash
    /// mid-write never leaves a truncated `auth_users` behind.
    pub fn dump(&self, path: impl AsRef<Path>, create_if_missing: bool) -> CoreResult<()> {
        let path = path.as_ref();
        if !create_if_missing && !path.exists() {
            return Err(CoreError::NotFound);
        }

        let mut rows: Vec<(String, AuthEntry)> = self
            .table
            .entries()
            .into_iter()
            .map(|(k, v)| (String::from_utf8_lossy(&k).into_owned(), v))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = String::new();
        for (username, entry) in &rows {
            out.push_str(username);
            out.push(' ');
            out.push_str(&entry.password_hash.to_string());
            out.push(' ');
            out.push_str(&entry.permissions.to_string());
            out.push('\n');
        }

        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, out)?;
        fs::rename(&tmp_path, path)?;
        tracing::info!(path = %path.display(), entries = rows.len(), "[auth] dumped");
        Ok(())
    }

    /// Loads entries from `path`, replacing the table's current contents.
    /// Tolerant of blank lines and a trailing newline; a malformed line is an
    /// error (not silently skipped — a truncated credential file should not
    /// look like an empty one).
    pub fn load(&self, path: impl AsRef<Path>) -> CoreResult<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        self.clear();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let username = fields.next().ok_or_else(|| {
                CoreError::BadInput(format!("{}:{}: missing username", path.display(), lineno + 1))
            })?;
            let hash_str = fields.next().ok_or_else(|| {
                CoreError::BadInput(format!("{}:{}: missing password hash", path.display(), lineno + 1))
            })?;
            let perms_str = fields.next().ok_or_else(|| {
                CoreError::BadInput(format!("{}:{}: missing permissions", path.display(), lineno + 1))
            })?;
            let password_hash: u64 = hash_str.parse().map_err(|_| {
                CoreError::BadInput(format!("{}:{}: bad password hash", path.display(), lineno + 1))
            })?;
            let permissions: u8 = perms_str.parse().map_err(|_| {
                CoreError::BadInput(format!("{}:{}: bad permissions", path.display(), lineno + 1))
            })?;
            self.put(username, password_hash, permissions);
        }
        tracing::info!(path = %path.display(), entries = self.len(), "[auth] loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypt::hash64;

    fn table() -> AuthTable {
        AuthTable::new(Box::new(hash64))
    }

    #[test]
    fn put_lookup_roundtrip() {
        let t = table();
        t.put("root", 0xdead_beef, 255);
        assert_eq!(t.lookup("root"), Some((0xdead_beef, 255)));
        assert_eq!(t.lookup("nobody"), None);
    }

    #[test]
    fn remove_missing_is_not_found() {
        let t = table();
        assert!(matches!(t.remove("ghost"), Err(CoreError::NotFound)));
    }

    /// S6
    #[test]
    fn dump_load_roundtrip() {
        let t = table();
        t.put("root", 0xdead_beef, 255);
        t.put("guest", 1, 1);

        let dir = std::env::temp_dir().join(format!("vaultd-auth-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("auth_users");

        t.dump(&path, true).unwrap();
        t.clear();
        assert!(t.is_empty());

        t.load(&path).unwrap();
        assert_eq!(t.lookup("root"), Some((0xdead_beef, 255)));
        assert_eq!(t.lookup("guest"), Some((1, 1)));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn dump_output_is_sorted_and_stable() {
        let t = table();
        t.put("zeta", 1, 1);
        t.put("alpha", 2, 2);

        let dir = std::env::temp_dir().join(format!("vaultd-auth-sort-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("auth_users");
        t.dump(&path, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].starts_with("alpha "));
        assert!(lines[1].starts_with("zeta "));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn dump_without_create_fails_when_path_absent() {
        let t = table();
        let missing = std::env::temp_dir().join("vaultd-auth-definitely-absent/auth_users");
        assert!(matches!(
            t.dump(&missing, false),
            Err(CoreError::NotFound)
        ));
    }
}
