//! `apivault list` — list keys with masked values.

use crate::cli::{open_vault, output, Cli};
use crate::errors::Result;
use crate::store::models::ServiceType;

/// Execute the `list` command.
pub fn execute(cli: &Cli, service: Option<&str>, include_inactive: bool) -> Result<()> {
    let service_type: Option<ServiceType> = match service {
        Some(s) => Some(s.parse()?),
        None => None,
    };

    let vault = open_vault(cli)?;
    let keys = vault.list_keys(service_type, include_inactive)?;

    output::print_keys_table(&keys);

    Ok(())
}
