//! `apivault get` — retrieve and print a single key's value.

use crate::cli::{client_info, open_vault, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `get` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let vault = open_vault(cli)?;

    // The handle scrubs its plaintext when it drops at the end of this
    // scope; nothing is copied out except the printed line.
    let handle = vault
        .retrieve_key(name, &client_info())?
        .ok_or_else(|| VaultError::KeyNotFound(name.to_string()))?;

    println!("{}", handle.value());

    Ok(())
}
