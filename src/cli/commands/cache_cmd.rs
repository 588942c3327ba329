//! `apivault cache` — session cache housekeeping.
//!
//! Note: each CLI invocation is its own process, so `stats` here mostly
//! matters for long-lived embedders; the subcommands exist to exercise
//! the same maintenance paths a host application calls.

use crate::cli::{open_vault, output, CacheAction, Cli};
use crate::errors::Result;

/// Execute the `cache` command.
pub fn execute(cli: &Cli, action: &CacheAction) -> Result<()> {
    let vault = open_vault(cli)?;

    match action {
        CacheAction::Stats => {
            let stats = vault.cache_stats();
            let json = serde_json::to_string_pretty(&stats)
                .unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
        CacheAction::Clear => {
            vault.clear_cache();
            output::success("Session cache cleared.");
        }
        CacheAction::Sweep => {
            let evicted = vault.cleanup_expired_cache();
            output::success(&format!("Evicted {evicted} expired cache entries."));
        }
    }

    Ok(())
}
