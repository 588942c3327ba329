//! SQLite-backed key store and audit log.
//!
//! `KeyStore` holds only the database path; every operation opens a
//! short-lived connection and closes it on return, so no transaction
//! ever spans two vault calls.  Deletion is a soft flip of `is_active`
//! — rows are never removed, preserving the audit trail.  Uniqueness of
//! `key_name` is enforced only among active rows via a partial unique
//! index, so a soft-deleted name can be reused.

pub mod models;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::{Result, VaultError};

use models::{AuditEntry, ClientInfo, KeyRecord, Operation, ServiceType};

/// Handle to the vault database.
pub struct KeyStore {
    db_path: PathBuf,
}

impl KeyStore {
    /// Open (or create) the vault database at `db_path`.
    ///
    /// Creates the key and audit tables on first use and tightens file
    /// permissions to owner-only.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;
        drop(conn);

        // Restrict the database file to the owner (contains ciphertext
        // and audit history).
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(db_path, perms);
        }

        Ok(Self {
            db_path: db_path.to_path_buf(),
        })
    }

    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS api_keys (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                key_name        TEXT NOT NULL,
                encrypted_value TEXT NOT NULL,
                service_type    TEXT NOT NULL,
                added_by_user   INTEGER NOT NULL,
                created_at      TEXT NOT NULL,
                last_modified   TEXT NOT NULL,
                is_active       INTEGER NOT NULL DEFAULT 1,
                description     TEXT
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_api_keys_active_name
                ON api_keys(key_name) WHERE is_active = 1;
            CREATE INDEX IF NOT EXISTS idx_api_keys_service_type
                ON api_keys(service_type);
            CREATE INDEX IF NOT EXISTS idx_api_keys_is_active
                ON api_keys(is_active);
            CREATE TABLE IF NOT EXISTS audit_logs (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                operation     TEXT NOT NULL,
                key_name      TEXT,
                user_id       INTEGER NOT NULL,
                timestamp     TEXT NOT NULL,
                success       INTEGER NOT NULL,
                error_message TEXT,
                ip_address    TEXT,
                user_agent    TEXT
            );",
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Key rows
    // ------------------------------------------------------------------

    /// Insert a new key row.
    ///
    /// A second active row with the same name trips the partial unique
    /// index; the constraint violation is surfaced as `KeyAlreadyExists`.
    pub fn insert_key(
        &self,
        key_name: &str,
        encrypted_value: &str,
        service_type: ServiceType,
        added_by_user: i64,
        description: Option<&str>,
    ) -> Result<i64> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();

        let result = conn.execute(
            "INSERT INTO api_keys
             (key_name, encrypted_value, service_type, added_by_user,
              created_at, last_modified, is_active, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5, 1, ?6)",
            params![key_name, encrypted_value, service_type.as_str(), added_by_user, now, description],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(e) if is_constraint_violation(&e) => {
                Err(VaultError::KeyAlreadyExists(key_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch the active row for `key_name`, if any.
    pub fn get_active(&self, key_name: &str) -> Result<Option<KeyRecord>> {
        let conn = self.connect()?;
        let record = conn
            .query_row(
                "SELECT id, key_name, encrypted_value, service_type, added_by_user,
                        created_at, last_modified, is_active, description
                 FROM api_keys
                 WHERE key_name = ?1 AND is_active = 1",
                params![key_name],
                key_record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Update the active row for `key_name`.
    ///
    /// Re-encrypted value and/or description are applied when given;
    /// `last_modified` is bumped regardless.  Returns `false` when no
    /// active row matched.
    pub fn update_key(
        &self,
        key_name: &str,
        new_ciphertext: Option<&str>,
        new_description: Option<&str>,
    ) -> Result<bool> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();

        let changed = match (new_ciphertext, new_description) {
            (Some(ct), Some(desc)) => conn.execute(
                "UPDATE api_keys
                 SET encrypted_value = ?1, description = ?2, last_modified = ?3
                 WHERE key_name = ?4 AND is_active = 1",
                params![ct, desc, now, key_name],
            )?,
            (Some(ct), None) => conn.execute(
                "UPDATE api_keys
                 SET encrypted_value = ?1, last_modified = ?2
                 WHERE key_name = ?3 AND is_active = 1",
                params![ct, now, key_name],
            )?,
            (None, Some(desc)) => conn.execute(
                "UPDATE api_keys
                 SET description = ?1, last_modified = ?2
                 WHERE key_name = ?3 AND is_active = 1",
                params![desc, now, key_name],
            )?,
            (None, None) => conn.execute(
                "UPDATE api_keys
                 SET last_modified = ?1
                 WHERE key_name = ?2 AND is_active = 1",
                params![now, key_name],
            )?,
        };

        Ok(changed > 0)
    }

    /// Soft-delete the active row for `key_name`.
    ///
    /// Flips `is_active` to 0 and bumps `last_modified`; the row stays.
    /// Returns `false` when no active row matched (including already
    /// inactive names).
    pub fn soft_delete(&self, key_name: &str) -> Result<bool> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();

        let changed = conn.execute(
            "UPDATE api_keys
             SET is_active = 0, last_modified = ?1
             WHERE key_name = ?2 AND is_active = 1",
            params![now, key_name],
        )?;

        Ok(changed > 0)
    }

    /// List key rows, newest-created first.
    pub fn list_keys(
        &self,
        service_type: Option<ServiceType>,
        include_inactive: bool,
    ) -> Result<Vec<KeyRecord>> {
        let conn = self.connect()?;

        let mut sql = String::from(
            "SELECT id, key_name, encrypted_value, service_type, added_by_user,
                    created_at, last_modified, is_active, description
             FROM api_keys
             WHERE 1=1",
        );
        let mut sql_params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if !include_inactive {
            sql.push_str(" AND is_active = 1");
        }
        if let Some(st) = service_type {
            sql.push_str(" AND service_type = ?1");
            sql_params.push(Box::new(st.as_str().to_string()));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            sql_params.iter().map(|p| &**p).collect();

        let rows = stmt.query_map(params_refs.as_slice(), key_record_from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Audit log
    // ------------------------------------------------------------------

    /// Append one audit row.  Rows are never updated or deleted.
    pub fn append_audit(
        &self,
        operation: Operation,
        key_name: Option<&str>,
        user_id: i64,
        success: bool,
        error_message: Option<&str>,
        client: &ClientInfo,
    ) -> Result<()> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO audit_logs
             (operation, key_name, user_id, timestamp, success,
              error_message, ip_address, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                operation.as_str(),
                key_name,
                user_id,
                now,
                success,
                error_message,
                client.ip_address.as_deref(),
                client.user_agent.as_deref(),
            ],
        )
        .map_err(|e| VaultError::AuditError(format!("insert: {e}")))?;

        Ok(())
    }

    /// Most recent audit entries for one user, newest first.
    pub fn recent_audit(&self, user_id: i64, limit: usize) -> Result<Vec<AuditEntry>> {
        let conn = self.connect()?;
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = conn
            .prepare(
                "SELECT id, operation, key_name, user_id, timestamp, success,
                        error_message, ip_address, user_agent
                 FROM audit_logs
                 WHERE user_id = ?1
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?2",
            )
            .map_err(|e| VaultError::AuditError(format!("query prepare: {e}")))?;

        let rows = stmt
            .query_map(params![user_id, limit_i64], |row| {
                let ts_str: String = row.get(4)?;
                Ok(AuditEntry {
                    id: row.get(0)?,
                    operation: row.get(1)?,
                    key_name: row.get(2)?,
                    user_id: row.get(3)?,
                    timestamp: parse_timestamp(&ts_str),
                    success: row.get(5)?,
                    error_message: row.get(6)?,
                    ip_address: row.get(7)?,
                    user_agent: row.get(8)?,
                })
            })
            .map_err(|e| VaultError::AuditError(format!("query exec: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| VaultError::AuditError(format!("row parse: {e}")))?);
        }
        Ok(entries)
    }

    /// Path to the database file (for display/testing).
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

// ------------------------------------------------------------------
// Row mapping helpers
// ------------------------------------------------------------------

fn key_record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<KeyRecord> {
    let service_str: String = row.get(3)?;
    let created_str: String = row.get(5)?;
    let modified_str: String = row.get(6)?;

    Ok(KeyRecord {
        id: row.get(0)?,
        key_name: row.get(1)?,
        encrypted_value: row.get(2)?,
        // Rows are written by this crate; an unknown tag would mean a
        // hand-edited database.  Keep the listing path resilient.
        service_type: service_str.parse().unwrap_or(ServiceType::Other),
        added_by_user: row.get(4)?,
        created_at: parse_timestamp(&created_str),
        last_modified: parse_timestamp(&modified_str),
        is_active: row.get(7)?,
        description: row.get(8)?,
    })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, KeyStore) {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::open(&dir.path().join("vault.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let (_dir, store) = store();
        let id = store
            .insert_key("stripe_main", "ciphertext", ServiceType::Stripe, 1, Some("prod"))
            .unwrap();
        assert!(id > 0);

        let record = store.get_active("stripe_main").unwrap().unwrap();
        assert_eq!(record.key_name, "stripe_main");
        assert_eq!(record.encrypted_value, "ciphertext");
        assert_eq!(record.service_type, ServiceType::Stripe);
        assert_eq!(record.added_by_user, 1);
        assert!(record.is_active);
        assert_eq!(record.description.as_deref(), Some("prod"));
    }

    #[test]
    fn duplicate_active_name_is_rejected() {
        let (_dir, store) = store();
        store
            .insert_key("k", "ct1", ServiceType::Other, 1, None)
            .unwrap();
        let err = store
            .insert_key("k", "ct2", ServiceType::Other, 1, None)
            .unwrap_err();
        assert!(matches!(err, VaultError::KeyAlreadyExists(ref n) if n == "k"));
    }

    #[test]
    fn soft_deleted_name_can_be_reused() {
        let (_dir, store) = store();
        store
            .insert_key("k", "ct1", ServiceType::Other, 1, None)
            .unwrap();
        assert!(store.soft_delete("k").unwrap());

        // Same name is free again; a brand-new active row is created.
        store
            .insert_key("k", "ct2", ServiceType::Other, 1, None)
            .unwrap();

        let record = store.get_active("k").unwrap().unwrap();
        assert_eq!(record.encrypted_value, "ct2");

        let all = store.list_keys(None, true).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn soft_delete_keeps_row() {
        let (_dir, store) = store();
        store
            .insert_key("k", "ct", ServiceType::Aws, 1, None)
            .unwrap();
        assert!(store.soft_delete("k").unwrap());

        assert!(store.get_active("k").unwrap().is_none());

        let all = store.list_keys(None, true).unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].is_active);

        let active_only = store.list_keys(None, false).unwrap();
        assert!(active_only.is_empty());
    }

    #[test]
    fn soft_delete_twice_reports_not_found() {
        let (_dir, store) = store();
        store
            .insert_key("k", "ct", ServiceType::Other, 1, None)
            .unwrap();
        assert!(store.soft_delete("k").unwrap());
        assert!(!store.soft_delete("k").unwrap());
    }

    #[test]
    fn update_bumps_last_modified() {
        let (_dir, store) = store();
        store
            .insert_key("k", "ct1", ServiceType::Other, 1, None)
            .unwrap();
        let before = store.get_active("k").unwrap().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(store.update_key("k", Some("ct2"), None).unwrap());

        let after = store.get_active("k").unwrap().unwrap();
        assert_eq!(after.encrypted_value, "ct2");
        assert!(after.last_modified > before.last_modified);
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn update_missing_key_returns_false() {
        let (_dir, store) = store();
        assert!(!store.update_key("missing", Some("ct"), None).unwrap());
    }

    #[test]
    fn list_filters_by_service_type() {
        let (_dir, store) = store();
        store
            .insert_key("a", "ct", ServiceType::Stripe, 1, None)
            .unwrap();
        store
            .insert_key("b", "ct", ServiceType::Openai, 1, None)
            .unwrap();

        let stripe_only = store.list_keys(Some(ServiceType::Stripe), false).unwrap();
        assert_eq!(stripe_only.len(), 1);
        assert_eq!(stripe_only[0].key_name, "a");
    }

    #[test]
    fn list_is_newest_first() {
        let (_dir, store) = store();
        for name in ["first", "second", "third"] {
            store
                .insert_key(name, "ct", ServiceType::Other, 1, None)
                .unwrap();
        }
        let keys = store.list_keys(None, false).unwrap();
        assert_eq!(keys[0].key_name, "third");
        assert_eq!(keys[2].key_name, "first");
    }

    #[test]
    fn audit_append_and_query() {
        let (_dir, store) = store();
        let client = ClientInfo {
            ip_address: Some("10.0.0.1".into()),
            user_agent: Some("test-agent".into()),
        };

        store
            .append_audit(Operation::Store, Some("k"), 7, true, None, &client)
            .unwrap();
        store
            .append_audit(
                Operation::Retrieve,
                Some("k"),
                7,
                false,
                Some("Key not found"),
                &client,
            )
            .unwrap();
        // A different user's entry must not show up.
        store
            .append_audit(Operation::Delete, Some("x"), 8, true, None, &ClientInfo::default())
            .unwrap();

        let entries = store.recent_audit(7, 50).unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first.
        assert_eq!(entries[0].operation, "retrieve_key");
        assert!(!entries[0].success);
        assert_eq!(entries[0].error_message.as_deref(), Some("Key not found"));
        assert_eq!(entries[1].operation, "store_key");
        assert_eq!(entries[1].ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(entries[1].user_agent.as_deref(), Some("test-agent"));
    }

    #[test]
    fn audit_respects_limit() {
        let (_dir, store) = store();
        for i in 0..10 {
            store
                .append_audit(
                    Operation::Store,
                    Some(&format!("k{i}")),
                    1,
                    true,
                    None,
                    &ClientInfo::default(),
                )
                .unwrap();
        }
        let entries = store.recent_audit(1, 3).unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn db_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let _store = KeyStore::open(&path).unwrap();

        let perms = std::fs::metadata(&path).unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o600);
    }
}
