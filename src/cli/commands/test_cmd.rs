//! `apivault test` — check a key against its service.

use serde_json::Value;

use crate::cli::{client_info, open_vault, output, Cli};
use crate::errors::Result;

/// Execute the `test` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let vault = open_vault(cli)?;
    let outcome = vault.test_key(name, &client_info())?;

    if outcome.success {
        output::success(&outcome.message);
    } else {
        output::error(&outcome.message);
    }

    if !outcome.details.is_empty() {
        let details = serde_json::to_string_pretty(&Value::Object(outcome.details))
            .unwrap_or_else(|_| "{}".to_string());
        output::tip(&details);
    }

    Ok(())
}
