//! `apivault audit` — display the audit log for the bound user.

use crate::cli::{open_vault, output, Cli};
use crate::errors::Result;

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize) -> Result<()> {
    let vault = open_vault(cli)?;
    let entries = vault.get_audit_logs(last)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    output::print_audit_table(&entries);

    Ok(())
}
