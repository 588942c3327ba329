//! `apivault update` — replace a key's value and/or description.

use crate::cli::{client_info, open_vault, output, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `update` command.
pub fn execute(
    cli: &Cli,
    name: &str,
    value: Option<&str>,
    description: Option<&str>,
) -> Result<()> {
    if value.is_none() && description.is_none() {
        return Err(VaultError::CommandFailed(
            "nothing to update — pass --value and/or --description".into(),
        ));
    }

    let vault = open_vault(cli)?;
    let message = vault.update_key(name, value, description, &client_info())?;

    output::success(&message);

    Ok(())
}
