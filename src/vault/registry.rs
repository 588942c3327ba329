//! Registry of per-session vault instances.
//!
//! A keyed-singleton lifecycle: the first request for a session id
//! constructs its `KeyVault`, later requests share it, and logout tears
//! it down after scrubbing the session cache.  The registry is an
//! injected value rather than a process global so tests can construct
//! isolated registries.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::cipher::KeyCipher;
use crate::config::Settings;
use crate::errors::Result;
use crate::testsvc::KeyTester;

use super::KeyVault;

pub struct VaultRegistry {
    db_path: PathBuf,
    cache_ttl: chrono::Duration,
    cipher: Arc<KeyCipher>,
    tester: Arc<dyn KeyTester>,
    vaults: Mutex<HashMap<String, Arc<KeyVault>>>,
}

impl VaultRegistry {
    /// Build a registry sharing one cipher and tester across sessions.
    pub fn new(settings: &Settings, cipher: KeyCipher, tester: Arc<dyn KeyTester>) -> Self {
        Self {
            db_path: PathBuf::from(&settings.db_path),
            cache_ttl: settings.cache_ttl(),
            cipher: Arc::new(cipher),
            tester,
            vaults: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<KeyVault>>> {
        self.vaults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the vault for a session, constructing it on first use.
    ///
    /// Request threads may race to first-use a session; the registry
    /// lock makes construction happen exactly once.
    pub fn get_or_create(&self, session_id: &str, user_id: i64) -> Result<Arc<KeyVault>> {
        let mut vaults = self.lock();

        if let Some(vault) = vaults.get(session_id) {
            return Ok(Arc::clone(vault));
        }

        let vault = Arc::new(KeyVault::new(
            session_id,
            user_id,
            &self.db_path,
            self.cache_ttl,
            Arc::clone(&self.cipher),
            Arc::clone(&self.tester),
        )?);
        vaults.insert(session_id.to_string(), Arc::clone(&vault));

        Ok(vault)
    }

    /// Tear down a session's vault (called on logout).
    ///
    /// Scrubs the session cache before dropping the instance.  A later
    /// lookup for the same session id constructs a fresh vault with an
    /// empty cache.
    pub fn clear_session(&self, session_id: &str) -> bool {
        let removed = self.lock().remove(session_id);
        match removed {
            Some(vault) => {
                vault.clear_cache();
                tracing::info!(session = %session_id, "session vault cleared");
                true
            }
            None => false,
        }
    }

    /// Number of live session vaults.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsvc::FormatTester;
    use tempfile::TempDir;

    fn registry() -> (TempDir, VaultRegistry) {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            db_path: dir
                .path()
                .join("vault.db")
                .to_string_lossy()
                .into_owned(),
            ..Settings::default()
        };
        let cipher = KeyCipher::new(
            Some("registry-test-master-secret-0123456789"),
            100_000,
        )
        .unwrap();
        let reg = VaultRegistry::new(&settings, cipher, Arc::new(FormatTester));
        (dir, reg)
    }

    #[test]
    fn same_session_returns_same_instance() {
        let (_dir, reg) = registry();
        let a = reg.get_or_create("sess-1", 1).unwrap();
        let b = reg.get_or_create("sess-1", 1).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn different_sessions_get_distinct_vaults() {
        let (_dir, reg) = registry();
        let a = reg.get_or_create("sess-1", 1).unwrap();
        let b = reg.get_or_create("sess-2", 2).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn clear_session_removes_instance() {
        let (_dir, reg) = registry();
        let first = reg.get_or_create("sess-1", 1).unwrap();
        assert!(reg.clear_session("sess-1"));
        assert!(reg.is_empty());
        assert!(!reg.clear_session("sess-1"));

        // A fresh lookup builds a new instance.
        let second = reg.get_or_create("sess-1", 1).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
