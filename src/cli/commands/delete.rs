//! `apivault delete` — soft-delete a key.

use crate::cli::{client_info, open_vault, output, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    if !force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Delete API key '{name}'?"))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;
        if !confirmed {
            return Err(VaultError::UserCancelled);
        }
    }

    let vault = open_vault(cli)?;
    let message = vault.delete_key(name, &client_info())?;

    output::success(&message);
    output::tip("The row is kept inactive for the audit trail; the name is free for reuse.");

    Ok(())
}
