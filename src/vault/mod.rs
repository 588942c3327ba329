//! Key vault service — the sole read/write path to the key store.
//!
//! A `KeyVault` is bound to one session + user pair at construction and
//! owns that session's decrypted-key cache.  Every public operation
//! appends exactly one audit row before returning, success or failure;
//! an audit-write failure is logged operationally but never overrides
//! the primary result.

pub mod cache;
pub mod registry;

use std::path::Path;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::cipher::{mask_key, validate_format, KeyCipher};
use crate::errors::{Result, VaultError};
use crate::store::models::{AuditEntry, ClientInfo, KeyInfo, Operation, ServiceType};
use crate::store::KeyStore;
use crate::testsvc::{KeyTester, TestOutcome};

pub use cache::{CacheStats, KeyCache};
pub use registry::VaultRegistry;

/// Placeholder shown in listings when a row fails to decrypt.
const MASK_ERROR_PLACEHOLDER: &str = "****ERROR****";

/// Trailing characters revealed by listing masks.
const MASK_SHOW_CHARS: usize = 4;

/// Scoped access to one decrypted credential.
///
/// The plaintext lives in a `Zeroizing` buffer that is overwritten when
/// the handle drops, so keep the handle's scope as tight as possible.
/// This is defense in depth, not a hard memory guarantee.
pub struct KeyHandle {
    key_name: String,
    service_type: ServiceType,
    value: Zeroizing<String>,
}

impl KeyHandle {
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    /// Borrow the decrypted value.  Do not copy it out of the handle's
    /// scope.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Session- and user-scoped vault over the shared key store.
pub struct KeyVault {
    session_id: String,
    user_id: i64,
    store: KeyStore,
    cipher: Arc<KeyCipher>,
    tester: Arc<dyn KeyTester>,
    cache: KeyCache,
}

impl KeyVault {
    pub fn new(
        session_id: impl Into<String>,
        user_id: i64,
        db_path: &Path,
        cache_ttl: chrono::Duration,
        cipher: Arc<KeyCipher>,
        tester: Arc<dyn KeyTester>,
    ) -> Result<Self> {
        let session_id = session_id.into();
        let store = KeyStore::open(db_path)?;

        tracing::info!(
            session = %session_prefix(&session_id),
            user_id,
            "key vault initialized"
        );

        Ok(Self {
            session_id,
            user_id,
            store,
            cipher,
            tester,
            cache: KeyCache::new(cache_ttl),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    // ------------------------------------------------------------------
    // Key operations
    // ------------------------------------------------------------------

    /// Encrypt and store a new key.
    ///
    /// Fails with `KeyAlreadyExists` when an active record with that
    /// name exists.  Any stale cache entry for the name is dropped on
    /// every outcome — a prior soft-deleted record must not leave a
    /// dangling cache hit.
    pub fn store_key(
        &self,
        key_name: &str,
        api_key: &str,
        service_type: ServiceType,
        description: Option<&str>,
        client: &ClientInfo,
    ) -> Result<String> {
        let result = self.store_key_inner(key_name, api_key, service_type, description);
        self.cache.invalidate(key_name);

        match &result {
            Ok(_) => {
                self.audit(Operation::Store, Some(key_name), true, None, client);
                tracing::info!(key_name, %service_type, "API key stored in vault");
            }
            Err(e) => {
                self.audit(Operation::Store, Some(key_name), false, Some(&e.to_string()), client);
                tracing::warn!(key_name, error = %e, "failed to store API key");
            }
        }
        result
    }

    fn store_key_inner(
        &self,
        key_name: &str,
        api_key: &str,
        service_type: ServiceType,
        description: Option<&str>,
    ) -> Result<String> {
        let (ok, reason) = validate_format(api_key, service_type);
        if !ok {
            return Err(VaultError::InvalidKeyFormat(reason));
        }

        let encrypted = self.cipher.encrypt(api_key)?;
        self.store
            .insert_key(key_name, &encrypted, service_type, self.user_id, description)?;

        Ok(format!("API key '{key_name}' stored successfully in vault"))
    }

    /// Retrieve a decrypted key as a scoped handle.
    ///
    /// Read path: live cache entry first (audited as a cached
    /// retrieval), then the store.  `Ok(None)` means no active record —
    /// no cache entry is created and no decrypt runs.
    pub fn retrieve_key(&self, key_name: &str, client: &ClientInfo) -> Result<Option<KeyHandle>> {
        if let Some((value, service_type)) = self.cache.get(key_name) {
            self.audit(Operation::RetrieveCached, Some(key_name), true, None, client);
            return Ok(Some(KeyHandle {
                key_name: key_name.to_string(),
                service_type,
                value,
            }));
        }

        let record = match self.store.get_active(key_name) {
            Ok(r) => r,
            Err(e) => {
                self.audit(Operation::Retrieve, Some(key_name), false, Some(&e.to_string()), client);
                return Err(e);
            }
        };

        let Some(record) = record else {
            self.audit(
                Operation::Retrieve,
                Some(key_name),
                false,
                Some("Key not found"),
                client,
            );
            return Ok(None);
        };

        let value = match self.cipher.decrypt(&record.encrypted_value) {
            Ok(v) => v,
            Err(e) => {
                self.audit(Operation::Retrieve, Some(key_name), false, Some(&e.to_string()), client);
                tracing::error!(key_name, "stored ciphertext failed to decrypt");
                return Err(e);
            }
        };

        self.cache.insert(key_name, value.clone(), record.service_type);
        self.audit(Operation::Retrieve, Some(key_name), true, None, client);

        Ok(Some(KeyHandle {
            key_name: key_name.to_string(),
            service_type: record.service_type,
            value,
        }))
    }

    /// Re-encrypt and/or re-describe an existing key.
    ///
    /// `last_modified` is bumped even when only the description changes.
    /// The cache entry is evicted so the next read re-decrypts the new
    /// ciphertext.
    pub fn update_key(
        &self,
        key_name: &str,
        new_api_key: Option<&str>,
        new_description: Option<&str>,
        client: &ClientInfo,
    ) -> Result<String> {
        let result = self.update_key_inner(key_name, new_api_key, new_description);

        match &result {
            Ok(_) => {
                self.cache.invalidate(key_name);
                self.audit(Operation::Update, Some(key_name), true, None, client);
                tracing::info!(key_name, "API key updated in vault");
            }
            Err(e) => {
                self.audit(Operation::Update, Some(key_name), false, Some(&e.to_string()), client);
                tracing::warn!(key_name, error = %e, "failed to update API key");
            }
        }
        result
    }

    fn update_key_inner(
        &self,
        key_name: &str,
        new_api_key: Option<&str>,
        new_description: Option<&str>,
    ) -> Result<String> {
        // Resolve the active record first: we need its service type to
        // validate a replacement value, and a clean "not found" before
        // any encryption work.
        let record = self
            .store
            .get_active(key_name)?
            .ok_or_else(|| VaultError::KeyNotFound(key_name.to_string()))?;

        let new_ciphertext = match new_api_key {
            Some(value) => {
                let (ok, reason) = validate_format(value, record.service_type);
                if !ok {
                    return Err(VaultError::InvalidKeyFormat(reason));
                }
                Some(self.cipher.encrypt(value)?)
            }
            None => None,
        };

        let changed = self
            .store
            .update_key(key_name, new_ciphertext.as_deref(), new_description)?;
        if !changed {
            // Row vanished between the lookup and the update.
            return Err(VaultError::KeyNotFound(key_name.to_string()));
        }

        Ok(format!("API key '{key_name}' updated successfully in vault"))
    }

    /// Soft-delete a key.  The row stays; only `is_active` flips.
    pub fn delete_key(&self, key_name: &str, client: &ClientInfo) -> Result<String> {
        let result = match self.store.soft_delete(key_name) {
            Ok(true) => Ok(format!("API key '{key_name}' deleted successfully from vault")),
            Ok(false) => Err(VaultError::KeyNotFound(key_name.to_string())),
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => {
                self.cache.invalidate(key_name);
                self.audit(Operation::Delete, Some(key_name), true, None, client);
                tracing::info!(key_name, "API key soft-deleted from vault");
            }
            Err(e) => {
                self.audit(Operation::Delete, Some(key_name), false, Some(&e.to_string()), client);
            }
        }
        result
    }

    /// List keys with masked values, newest-created first.
    ///
    /// A row whose ciphertext fails to decrypt renders an error
    /// placeholder instead of aborting the whole listing.
    pub fn list_keys(
        &self,
        service_type: Option<ServiceType>,
        include_inactive: bool,
    ) -> Result<Vec<KeyInfo>> {
        let records = self.store.list_keys(service_type, include_inactive)?;

        Ok(records
            .into_iter()
            .map(|r| {
                let masked_value = match self.cipher.decrypt(&r.encrypted_value) {
                    Ok(plaintext) => mask_key(&plaintext, MASK_SHOW_CHARS),
                    Err(_) => {
                        tracing::warn!(key_name = %r.key_name, "listing row failed to decrypt");
                        MASK_ERROR_PLACEHOLDER.to_string()
                    }
                };
                KeyInfo {
                    id: r.id,
                    key_name: r.key_name,
                    masked_value,
                    service_type: r.service_type,
                    added_by_user: r.added_by_user,
                    created_at: r.created_at,
                    last_modified: r.last_modified,
                    is_active: r.is_active,
                    description: r.description,
                }
            })
            .collect())
    }

    /// Test a key against its service via the injected tester.
    ///
    /// A missing key short-circuits with a failed `test_key` audit —
    /// the collaborator is never called without a credential.
    pub fn test_key(&self, key_name: &str, client: &ClientInfo) -> Result<TestOutcome> {
        let handle = match self.retrieve_key(key_name, client) {
            Ok(Some(h)) => h,
            Ok(None) => {
                let error_msg = format!("API key '{key_name}' not found");
                self.audit(Operation::Test, Some(key_name), false, Some(&error_msg), client);
                return Err(VaultError::KeyNotFound(key_name.to_string()));
            }
            Err(e) => {
                self.audit(Operation::Test, Some(key_name), false, Some(&e.to_string()), client);
                return Err(e);
            }
        };

        let outcome = self.tester.test(handle.value(), handle.service_type());

        let error_msg = (!outcome.success).then(|| outcome.message.clone());
        self.audit(
            Operation::Test,
            Some(key_name),
            outcome.success,
            error_msg.as_deref(),
            client,
        );

        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Cache maintenance
    // ------------------------------------------------------------------

    /// Scrub and empty the whole session cache (used on logout).
    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!(session = %session_prefix(&self.session_id), "vault cache cleared");
    }

    /// Evict only entries past the TTL (periodic housekeeping).
    pub fn cleanup_expired_cache(&self) -> usize {
        let evicted = self.cache.cleanup_expired();
        if evicted > 0 {
            tracing::info!(evicted, "expired cache entries cleaned up");
        }
        evicted
    }

    /// Cache metadata snapshot; contains no decrypted values.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------

    /// Most recent audit entries for the bound user, newest first.
    pub fn get_audit_logs(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        self.store.recent_audit(self.user_id, limit)
    }

    /// Append one audit row.  Failures are logged and swallowed so they
    /// never mask the primary operation's result.
    fn audit(
        &self,
        operation: Operation,
        key_name: Option<&str>,
        success: bool,
        error_message: Option<&str>,
        client: &ClientInfo,
    ) {
        if let Err(e) = self.store.append_audit(
            operation,
            key_name,
            self.user_id,
            success,
            error_message,
            client,
        ) {
            tracing::error!(operation = %operation, error = %e, "failed to write audit entry");
        }
    }
}

/// First eight characters of a session id, for log lines.
fn session_prefix(session_id: &str) -> &str {
    let end = session_id
        .char_indices()
        .nth(8)
        .map_or(session_id.len(), |(i, _)| i);
    &session_id[..end]
}
