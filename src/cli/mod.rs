//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::sync::Arc;

use clap::Parser;

use crate::cipher::KeyCipher;
use crate::config::Settings;
use crate::errors::Result;
use crate::store::models::ClientInfo;
use crate::testsvc::KeyTester;
use crate::vault::{KeyVault, VaultRegistry};

/// apivault CLI: encrypted API key vault with audit logging.
#[derive(Parser)]
#[command(
    name = "apivault",
    about = "Encrypted API key vault with session caching and audit logging",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the vault database (overrides apivault.toml)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Session identifier binding this invocation's cache
    #[arg(long, default_value = "cli-session", global = true)]
    pub session: String,

    /// Numeric user id recorded in audit entries
    #[arg(long, default_value_t = 0, global = true)]
    pub user: i64,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Store a new API key (encrypted at rest)
    Store {
        /// Unique name for the key (e.g. stripe_main)
        name: String,
        /// Key value (omit for interactive prompt)
        value: Option<String>,
        /// Service type: stripe, openai, airtable, twilio, sendgrid, aws, google_cloud, azure, other
        #[arg(short, long, default_value = "other")]
        service: String,
        /// Optional free-text description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Decrypt and print a key's value
    Get {
        /// Key name
        name: String,
    },

    /// List keys with masked values
    List {
        /// Filter by service type
        #[arg(long)]
        service: Option<String>,
        /// Include soft-deleted keys
        #[arg(long)]
        include_inactive: bool,
    },

    /// Update a key's value and/or description
    Update {
        /// Key name
        name: String,
        /// New key value (omit to keep the current one)
        #[arg(long)]
        value: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
    },

    /// Soft-delete a key (row is kept for the audit trail)
    Delete {
        /// Key name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Test a key against its service
    Test {
        /// Key name
        name: String,
    },

    /// Display the audit log
    Audit {
        /// Number of entries to show
        #[arg(long, default_value_t = 50)]
        last: usize,
    },

    /// Session cache housekeeping
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(clap::Subcommand)]
pub enum CacheAction {
    /// Show cache entry metadata (never plaintext)
    Stats,
    /// Scrub and empty the session cache
    Clear,
    /// Evict only entries past the TTL
    Sweep,
}

/// Build a registry from `apivault.toml` plus CLI overrides.
pub fn build_registry(cli: &Cli) -> Result<VaultRegistry> {
    let cwd = std::env::current_dir()?;
    let mut settings = Settings::load(&cwd)?;
    if let Some(db) = &cli.db {
        settings.db_path = db.clone();
    }

    let cipher = KeyCipher::new(None, settings.pbkdf2_iterations)?;
    Ok(VaultRegistry::new(&settings, cipher, default_tester()))
}

/// Resolve the vault for this invocation's session + user.
pub fn open_vault(cli: &Cli) -> Result<Arc<KeyVault>> {
    let registry = build_registry(cli)?;
    registry.get_or_create(&cli.session, cli.user)
}

/// Audit context for CLI-originated operations.
pub fn client_info() -> ClientInfo {
    ClientInfo {
        ip_address: None,
        user_agent: Some(format!("apivault-cli/{}", env!("CARGO_PKG_VERSION"))),
    }
}

#[cfg(feature = "live-test")]
fn default_tester() -> Arc<dyn KeyTester> {
    Arc::new(crate::testsvc::HttpTester::new())
}

#[cfg(not(feature = "live-test"))]
fn default_tester() -> Arc<dyn KeyTester> {
    Arc::new(crate::testsvc::FormatTester)
}
