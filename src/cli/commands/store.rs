//! `apivault store` — encrypt and store a new API key.

use std::io::{self, IsTerminal, Read};

use crate::cli::{client_info, open_vault, output, Cli};
use crate::errors::{Result, VaultError};
use crate::store::models::ServiceType;

/// Execute the `store` command.
pub fn execute(
    cli: &Cli,
    name: &str,
    value: Option<&str>,
    service: &str,
    description: Option<&str>,
) -> Result<()> {
    let service_type: ServiceType = service.parse()?;

    // Determine the key value from one of three sources.
    let key_value = if let Some(v) = value {
        // Source 1: Inline value on the command line.
        output::warning("Value provided on command line — it may appear in shell history.");
        v.to_string()
    } else if !io::stdin().is_terminal() {
        // Source 2: Piped input (stdin is not a terminal).
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf.trim_end().to_string()
    } else {
        // Source 3: Interactive secure prompt (default).
        dialoguer::Password::new()
            .with_prompt(format!("Enter value for {name}"))
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))?
    };

    let vault = open_vault(cli)?;
    let message = vault.store_key(name, &key_value, service_type, description, &client_info())?;

    output::success(&message);
    output::tip("Run `apivault test <name>` to check the key against its service.");

    Ok(())
}
