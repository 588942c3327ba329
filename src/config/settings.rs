use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// Project-level configuration, loaded from `apivault.toml`.
///
/// Every field has a sensible default so the vault works out-of-the-box
/// without any config file at all.  The master secret is deliberately
/// NOT configurable here — it comes from the `APIVAULT_MASTER_KEY`
/// environment variable (or an explicit parameter) and its absence is a
/// hard startup failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the SQLite database holding key and audit tables.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// How long a decrypted key may be served from the session cache.
    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: u64,

    /// PBKDF2-HMAC-SHA256 iteration count (minimum 100 000).
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_db_path() -> String {
    "apivault.db".to_string()
}

fn default_cache_ttl_minutes() -> u64 {
    30
}

fn default_pbkdf2_iterations() -> u32 {
    100_000
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_ttl_minutes: default_cache_ttl_minutes(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = "apivault.toml";

    /// Load settings from `<project_dir>/apivault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Cache TTL as a chrono duration.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache_ttl_minutes as i64)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
